//! Notification event types.
//!
//! Events are emitted per collection so dashboards watching a project can
//! refresh the affected content card.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::{ContentStatus, FlagCounts};

/// Event type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Content item created by a batch submission
    ItemAdded,
    /// Content status transition
    StatusChanged,
    /// Analysis finished with flag totals
    AnalysisComplete,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ItemAdded => "item_added",
            EventType::StatusChanged => "status_changed",
            EventType::AnalysisComplete => "analysis_complete",
        }
    }
}

/// Event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    ItemAdded {
        #[serde(rename = "contentId")]
        content_id: String,
        title: String,
    },

    StatusChanged {
        #[serde(rename = "contentId")]
        content_id: String,
        #[serde(rename = "oldStatus")]
        old_status: ContentStatus,
        #[serde(rename = "newStatus")]
        new_status: ContentStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    AnalysisComplete {
        #[serde(rename = "contentId")]
        content_id: String,
        #[serde(rename = "flaggedSubtitles")]
        flagged_subtitles: u32,
        #[serde(rename = "flaggedComments")]
        flagged_comments: u32,
    },
}

/// Event envelope keyed by collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationEvent {
    pub collection: String,
    #[serde(flatten)]
    pub kind: NotificationKind,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    fn new(collection: impl Into<String>, kind: NotificationKind) -> Self {
        Self {
            collection: collection.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Create an item added event.
    pub fn item_added(
        collection: impl Into<String>,
        content_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self::new(
            collection,
            NotificationKind::ItemAdded {
                content_id: content_id.into(),
                title: title.into(),
            },
        )
    }

    /// Create a status changed event.
    pub fn status_changed(
        collection: impl Into<String>,
        content_id: impl Into<String>,
        old_status: ContentStatus,
        new_status: ContentStatus,
        error: Option<String>,
    ) -> Self {
        Self::new(
            collection,
            NotificationKind::StatusChanged {
                content_id: content_id.into(),
                old_status,
                new_status,
                error,
            },
        )
    }

    /// Create an analysis complete event.
    pub fn analysis_complete(
        collection: impl Into<String>,
        content_id: impl Into<String>,
        counts: FlagCounts,
    ) -> Self {
        Self::new(
            collection,
            NotificationKind::AnalysisComplete {
                content_id: content_id.into(),
                flagged_subtitles: counts.flagged_subtitles,
                flagged_comments: counts.flagged_comments,
            },
        )
    }

    pub fn event_type(&self) -> EventType {
        match self.kind {
            NotificationKind::ItemAdded { .. } => EventType::ItemAdded,
            NotificationKind::StatusChanged { .. } => EventType::StatusChanged,
            NotificationKind::AnalysisComplete { .. } => EventType::AnalysisComplete,
        }
    }

    pub fn content_id(&self) -> &str {
        match &self.kind {
            NotificationKind::ItemAdded { content_id, .. }
            | NotificationKind::StatusChanged { content_id, .. }
            | NotificationKind::AnalysisComplete { content_id, .. } => content_id,
        }
    }
}
