//! Caption blocks and merged time buckets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One parsed caption record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CaptionBlock {
    /// Index line of the record
    pub sequence_index: u32,
    /// Start time in fractional seconds
    pub start_seconds: f64,
    /// Cleaned single-line text
    pub text: String,
}

impl CaptionBlock {
    pub fn new(sequence_index: u32, start_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            sequence_index,
            start_seconds,
            text: text.into(),
        }
    }
}

/// Caption text merged over one time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MergedSegment {
    /// Whole seconds at which the bucket starts
    pub bucket_start_seconds: u64,
    /// Merged text with overlaps collapsed
    pub text: String,
}

impl MergedSegment {
    pub fn new(bucket_start_seconds: u64, text: impl Into<String>) -> Self {
        Self {
            bucket_start_seconds,
            text: text.into(),
        }
    }
}
