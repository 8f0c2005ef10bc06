//! Structured work item logging.

use tracing::{error, info, warn, Span};

use hunter_models::WorkItem;

/// Logger carrying the identifying fields of one work item.
#[derive(Debug, Clone)]
pub struct ItemLogger {
    item_id: String,
    collection: String,
    content_id: String,
    kind: &'static str,
    attempt: u32,
}

impl ItemLogger {
    pub fn new(item: &WorkItem) -> Self {
        Self {
            item_id: item.id.to_string(),
            collection: item.collection().to_string(),
            content_id: item.content_id().to_string(),
            kind: item.kind.as_str(),
            attempt: item.attempt_count,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            item_id = %self.item_id,
            content_id = %self.content_id,
            attempt = self.attempt,
            "Item started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            item_id = %self.item_id,
            content_id = %self.content_id,
            "Item progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            item_id = %self.item_id,
            content_id = %self.content_id,
            "Item warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            item_id = %self.item_id,
            content_id = %self.content_id,
            attempt = self.attempt,
            "Item error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            item_id = %self.item_id,
            content_id = %self.content_id,
            "Item completed: {}", message
        );
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Span wrapping all processing of this item.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "item",
            item_id = %self.item_id,
            collection = %self.collection,
            content_id = %self.content_id,
            kind = self.kind,
            attempt = self.attempt
        )
    }
}
