//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use rangekeeper_execution::prelude::*;
//! ```

// Errors
pub use crate::error::ExecutionError;

// Lifecycle
pub use crate::lifecycle::{
    AggregateStats, EventData, LifecycleEvent, LifecycleEventType, LifecycleTracker,
    PositionClosedData, PositionOpenedData, PositionSummary, RebalanceData, RebalanceReason,
    SwapData,
};

// Strategy
pub use crate::strategy::{
    ControllerConfig, ControllerState, CycleOutcome, PositionLifecycleController,
    RebalanceConfig, RebalanceExecutor,
};

// Sync
pub use crate::sync::PositionScanner;

// Transaction
pub use crate::transaction::{TransactionConfig, TransactionManager};
