//! Moderation error types.

use thiserror::Error;

pub type ModerationResult<T> = Result<T, ModerationError>;

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("Moderation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModerationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ModerationError::ServiceUnavailable(_) | ModerationError::Timeout(_) => true,
            ModerationError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
