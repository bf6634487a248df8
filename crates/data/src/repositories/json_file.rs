use super::HistoryStore;
use crate::error::HistoryError;
use async_trait::async_trait;
use rangekeeper_domain::history::PositionHistoryEntry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// History kept as one JSON array in a file.
///
/// Appending reads the whole array, pushes the entry and writes the result to
/// a sibling temporary file that is then renamed over the original.
pub struct JsonFileHistoryStore {
    /// Target file.
    path: PathBuf,
    /// Serializes read-modify-write cycles within the process.
    lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    /// Creates a new store backed by `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<PositionHistoryEntry>, HistoryError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, entry: &PositionHistoryEntry) -> Result<(), HistoryError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read().await?;
        entries.push(entry.clone());

        let bytes = serde_json::to_vec(&entries)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), entries = entries.len(), "History written");
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<PositionHistoryEntry>, HistoryError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(timestamp: i64) -> PositionHistoryEntry {
        PositionHistoryEntry {
            total_wallet_value_native: dec!(4.2),
            total_wallet_value_token: dec!(8400),
            lower_price: dec!(1960),
            upper_price: dec!(2040),
            timestamp,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileHistoryStore::new(dir.path().join("history.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_appends_accumulate_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let store = JsonFileHistoryStore::new(&path);
        store.append(&entry(1)).await.unwrap();
        store.append(&entry(2)).await.unwrap();

        let reopened = JsonFileHistoryStore::new(&path);
        reopened.append(&entry(3)).await.unwrap();

        let all = reopened.load_all().await.unwrap();
        assert_eq!(
            all.iter().map(|e| e.timestamp).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_is_camel_case_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = JsonFileHistoryStore::new(&path);
        store.append(&entry(7)).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.contains("\"totalWalletValueNative\""));
        assert!(raw.contains("\"timestamp\":7"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serde_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileHistoryStore::new(&path);
        assert!(matches!(
            store.append(&entry(1)).await,
            Err(HistoryError::Serde(_))
        ));
    }
}
