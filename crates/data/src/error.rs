use thiserror::Error;

/// Errors raised while reading or writing the history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Filesystem failure.
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    /// The history file is not a JSON array of entries.
    #[error("history format error: {0}")]
    Serde(#[from] serde_json::Error),
}
