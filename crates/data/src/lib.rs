//! Persistence for position history records.
//!
//! The history is a JSON array of [`PositionHistoryEntry`] values, one per
//! position (re)open.
//!
//! [`PositionHistoryEntry`]: rangekeeper_domain::history::PositionHistoryEntry

/// History store errors.
pub mod error;
/// History store trait and implementations.
pub mod repositories;

pub use error::HistoryError;
pub use repositories::{HistoryStore, InMemoryHistoryStore, JsonFileHistoryStore};
