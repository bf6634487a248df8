use super::HistoryStore;
use crate::error::HistoryError;
use async_trait::async_trait;
use rangekeeper_domain::history::PositionHistoryEntry;
use tokio::sync::Mutex;

/// History held in memory.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<PositionHistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: &PositionHistoryEntry) -> Result<(), HistoryError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PositionHistoryEntry>, HistoryError> {
        Ok(self.entries.lock().await.clone())
    }
}
