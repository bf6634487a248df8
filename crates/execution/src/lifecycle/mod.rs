//! Position lifecycle tracking.
//!
//! Tracks the lifecycle of every position the controller manages:
//! - Position opening
//! - Balance equalization swaps
//! - Rebalancing events
//! - Position closing

mod events;
mod tracker;

pub use events::*;
pub use tracker::*;
