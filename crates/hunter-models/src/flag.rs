//! Flag records and fetched comments.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A discussion comment returned by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub author: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_thumbnail: Option<String>,
}

/// A caption segment judged policy-violating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubtitleFlag {
    pub collection: String,
    pub content_id: String,
    /// Bucket start in seconds
    pub timestamp_secs: u64,
    pub text: String,
    pub categories: BTreeSet<String>,
    pub external_link: String,
    pub created_at: DateTime<Utc>,
}

impl SubtitleFlag {
    /// Natural key used to deduplicate repeated inserts.
    pub fn natural_key(&self) -> (String, String, u64, String) {
        (
            self.collection.clone(),
            self.content_id.clone(),
            self.timestamp_secs,
            self.text.clone(),
        )
    }
}

/// A comment judged policy-violating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommentFlag {
    pub collection: String,
    pub content_id: String,
    pub comment_id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_thumbnail: Option<String>,
    pub text: String,
    pub categories: BTreeSet<String>,
    pub external_link: String,
    pub created_at: DateTime<Utc>,
}

impl CommentFlag {
    /// Natural key used to deduplicate repeated inserts.
    pub fn natural_key(&self) -> (String, String, String, String) {
        (
            self.collection.clone(),
            self.content_id.clone(),
            self.comment_id.clone(),
            self.text.clone(),
        )
    }
}
