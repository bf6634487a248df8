//! History store implementations.
//!
//! - [`JsonFileHistoryStore`]: whole-file JSON array, rewritten on every append
//! - [`InMemoryHistoryStore`]: process-local, for tests and dry runs

mod json_file;
mod memory;

pub use json_file::JsonFileHistoryStore;
pub use memory::InMemoryHistoryStore;

use crate::error::HistoryError;
use async_trait::async_trait;
use rangekeeper_domain::history::PositionHistoryEntry;

/// Append-only history of opened positions.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one entry.
    async fn append(&self, entry: &PositionHistoryEntry) -> Result<(), HistoryError>;

    /// Every stored entry, oldest first.
    async fn load_all(&self) -> Result<Vec<PositionHistoryEntry>, HistoryError>;
}
