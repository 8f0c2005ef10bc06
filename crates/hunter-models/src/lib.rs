//! Shared data models for the HateHunter moderation pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Work items and their status state machine
//! - Content items (videos) and their fetched metadata
//! - Caption blocks and merged segments
//! - Classification results and persisted flags
//! - Notification events

pub mod caption;
pub mod classification;
pub mod content;
pub mod event;
pub mod flag;
pub mod utils;
pub mod work_item;

// Re-export common types
pub use caption::{CaptionBlock, MergedSegment};
pub use classification::ClassificationResult;
pub use content::{ContentItem, ContentMetadata, ContentStatus, FlagCounts};
pub use event::{EventType, NotificationEvent, NotificationKind};
pub use flag::{Comment, CommentFlag, SubtitleFlag};
pub use utils::{comment_link, extract_content_id, watch_link, ContentIdError, DEFAULT_WATCH_BASE};
pub use work_item::{AnalysisParams, WorkItem, WorkItemId, WorkKind, WorkPayload, WorkStatus};
