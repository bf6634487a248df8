//! Rebalancing strategy.
//!
//! - [`RebalanceExecutor`]: approvals, burn, equalization swap and mint
//! - [`PositionLifecycleController`]: the per-cycle state machine and its
//!   polling loop

mod controller;
mod rebalance;

pub use controller::*;
pub use rebalance::*;
