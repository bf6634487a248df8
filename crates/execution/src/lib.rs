//! Live execution of the rebalancing lifecycle.
//!
//! This crate drives a single concentrated liquidity position:
//! - Transaction submission and confirmation
//! - Position discovery from the owner's NFTs
//! - Burn, balance equalization and mint
//! - Position lifecycle tracking
//! - The lifecycle controller and its polling loop

/// Prelude module for convenient imports.
pub mod prelude;

/// Execution errors.
pub mod error;
/// Position lifecycle tracking.
pub mod lifecycle;
/// Rebalancing strategy and lifecycle controller.
pub mod strategy;
/// Chain state synchronization.
pub mod sync;
/// Transaction submission.
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use error::ExecutionError;
