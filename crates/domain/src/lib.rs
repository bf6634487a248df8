//! Domain model and pure sizing logic for keeping a concentrated liquidity
//! position centered on the market price.
//!
//! - Exact rational prices and the tick/price primitive
//! - Price band calculation and tick alignment
//! - Balance equalization before opening a position
//! - History records written after every (re)open

/// Entities: tokens, pools and positions.
pub mod entities;
/// Balance equalization.
pub mod equalizer;
/// Shared enums.
pub mod enums;
/// Domain errors.
pub mod error;
/// Fee tiers.
pub mod fees;
/// History records.
pub mod history;
/// Tick, liquidity and rational math.
pub mod math;
/// Price band calculation.
pub mod range;
/// Value objects.
pub mod value_objects;

pub use error::DomainError;
