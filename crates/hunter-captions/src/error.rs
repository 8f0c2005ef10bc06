//! Caption parsing error types.

use thiserror::Error;

pub type CaptionResult<T> = Result<T, CaptionError>;

/// Reasons a caption record is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("Invalid index line: {0:?}")]
    InvalidIndex(String),

    #[error("Invalid timing line: {0:?}")]
    InvalidTiming(String),

    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    #[error("Record {0} has no text")]
    EmptyText(u32),

    #[error("Truncated record: {0:?}")]
    Truncated(String),
}
