//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Scheduler busy: {0}")]
    Busy(String),

    #[error("Queue error: {0}")]
    Queue(#[from] hunter_queue::QueueError),

    #[error("Storage error: {0}")]
    Storage(#[from] hunter_storage::StorageError),

    #[error("Moderation error: {0}")]
    Moderation(#[from] hunter_moderation::ModerationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Store failures stop the scheduler tick; everything else is item-local.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, WorkerError::Queue(_) | WorkerError::Storage(_))
    }
}
