//! Moderation classification results.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Verdict for one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationResult {
    pub flagged: bool,
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

impl ClassificationResult {
    /// Result returned for empty input and for failed external calls.
    pub fn not_flagged() -> Self {
        Self::default()
    }

    /// Build from a classifier's category map, keeping the `true` entries.
    pub fn from_category_map(flagged: bool, categories: &HashMap<String, bool>) -> Self {
        Self {
            flagged,
            categories: categories
                .iter()
                .filter(|(_, hit)| **hit)
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }

    /// Comma separated category list for display.
    pub fn categories_label(&self) -> String {
        self.categories.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}
