//! Moderation service request/response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use hunter_models::ClassificationResult;

/// Request body for the moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub input: String,
    pub model: String,
}

/// One verdict in a moderation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationEntry {
    pub flagged: bool,
    #[serde(default)]
    pub categories: HashMap<String, bool>,
    #[serde(default)]
    pub category_scores: HashMap<String, f64>,
}

/// Response from the moderation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub results: Vec<ModerationEntry>,
}

impl ModerationResponse {
    /// Verdict of the first result, if any.
    pub fn first_verdict(&self) -> Option<ClassificationResult> {
        self.results
            .first()
            .map(|entry| ClassificationResult::from_category_map(entry.flagged, &entry.categories))
    }
}
