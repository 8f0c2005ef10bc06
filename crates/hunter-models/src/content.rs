//! Content item (video) models.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{watch_link, DEFAULT_WATCH_BASE};
use crate::work_item::WorkStatus;

/// Processing status of a content item as shown to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    /// Known but never submitted for analysis
    #[default]
    Pending,
    /// Waiting in the queue
    Queued,
    /// Being analyzed
    Processing,
    /// Analysis finished
    Completed,
    /// Analysis failed
    Failed,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Pending => "pending",
            ContentStatus::Queued => "queued",
            ContentStatus::Processing => "processing",
            ContentStatus::Completed => "completed",
            ContentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<WorkStatus> for ContentStatus {
    fn from(status: WorkStatus) -> Self {
        match status {
            WorkStatus::Queued => ContentStatus::Queued,
            WorkStatus::Processing => ContentStatus::Processing,
            WorkStatus::Completed => ContentStatus::Completed,
            WorkStatus::Failed => ContentStatus::Failed,
        }
    }
}

/// Descriptive metadata fetched from the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentMetadata {
    pub title: String,
    #[serde(default)]
    pub uploader: String,
    /// Upload date as `YYYY-MM-DD`
    #[serde(default)]
    pub upload_date: String,
    /// Human duration, e.g. `1:02:03` or `4:05`
    #[serde(default)]
    pub duration: String,
    /// Abbreviated count, e.g. `1.2K`
    #[serde(default)]
    pub view_count: String,
    #[serde(default)]
    pub comment_count: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub webpage_url: String,
}

impl ContentMetadata {
    /// Metadata used when the platform cannot be reached.
    pub fn fallback(content_id: &str) -> Self {
        Self {
            title: format!("Video {}", content_id),
            thumbnail: format!("https://img.youtube.com/vi/{}/mqdefault.jpg", content_id),
            webpage_url: watch_link(DEFAULT_WATCH_BASE, content_id, None),
            ..Default::default()
        }
    }
}

/// Flag totals for one content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlagCounts {
    pub flagged_subtitles: u32,
    pub flagged_comments: u32,
}

impl FlagCounts {
    pub fn total(&self) -> u32 {
        self.flagged_subtitles + self.flagged_comments
    }
}

/// Content item record, unique per `(collection, content_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContentItem {
    /// Owning collection (project) name
    pub collection: String,

    /// Platform id
    pub content_id: String,

    #[serde(default)]
    pub metadata: ContentMetadata,

    #[serde(default)]
    pub status: ContentStatus,

    #[serde(default)]
    pub flagged_subtitles: u32,

    #[serde(default)]
    pub flagged_comments: u32,

    /// When the record was first created
    pub retrieved_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_completed_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
}

impl ContentItem {
    /// Create a pending content record.
    pub fn new(
        collection: impl Into<String>,
        content_id: impl Into<String>,
        metadata: ContentMetadata,
    ) -> Self {
        Self {
            collection: collection.into(),
            content_id: content_id.into(),
            metadata,
            status: ContentStatus::Pending,
            flagged_subtitles: 0,
            flagged_comments: 0,
            retrieved_at: Utc::now(),
            processing_started_at: None,
            processing_completed_at: None,
            processing_error: None,
        }
    }

    /// Apply a status transition, maintaining the processing timestamps.
    pub fn set_status(&mut self, status: ContentStatus, error: Option<String>) {
        match status {
            ContentStatus::Processing => {
                self.processing_started_at = Some(Utc::now());
                self.processing_error = None;
            }
            ContentStatus::Completed => {
                self.processing_completed_at = Some(Utc::now());
                self.processing_error = None;
            }
            ContentStatus::Failed => {
                self.processing_error = error;
            }
            ContentStatus::Pending | ContentStatus::Queued => {}
        }
        self.status = status;
    }

    pub fn flag_counts(&self) -> FlagCounts {
        FlagCounts {
            flagged_subtitles: self.flagged_subtitles,
            flagged_comments: self.flagged_comments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_track_timestamps() {
        let mut item = ContentItem::new("project", "abc", ContentMetadata::fallback("abc"));
        assert_eq!(item.status, ContentStatus::Pending);

        item.set_status(ContentStatus::Processing, None);
        assert!(item.processing_started_at.is_some());

        item.set_status(ContentStatus::Failed, Some("boom".into()));
        assert_eq!(item.processing_error.as_deref(), Some("boom"));

        item.set_status(ContentStatus::Processing, None);
        assert!(item.processing_error.is_none());

        item.set_status(ContentStatus::Completed, None);
        assert!(item.processing_completed_at.is_some());
    }

    #[test]
    fn test_fallback_metadata() {
        let meta = ContentMetadata::fallback("dQw4w9WgXcQ");
        assert_eq!(meta.title, "Video dQw4w9WgXcQ");
        assert_eq!(meta.webpage_url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_work_status_mapping() {
        assert_eq!(ContentStatus::from(WorkStatus::Failed), ContentStatus::Failed);
        assert_eq!(ContentStatus::from(WorkStatus::Queued).as_str(), "queued");
    }
}
