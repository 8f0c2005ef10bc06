//! Work item definitions for queue processing.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Default number of processing attempts before an item is terminally failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default caption bucket width in seconds.
pub const DEFAULT_BUCKET_THRESHOLD_SECS: i64 = 30;

/// Unique identifier for a work item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    /// Generate a new random work item ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for WorkItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What a work item analyzes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkKind {
    /// Caption analysis (plus comments when requested in the params)
    #[default]
    Caption,
    /// Comment analysis only
    Comment,
}

impl WorkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Caption => "caption",
            WorkKind::Comment => "comment",
        }
    }
}

impl fmt::Display for WorkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Work item processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Waiting in the durable queue
    #[default]
    Queued,
    /// Currently held by the scheduler's single in-flight slot
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error and no retries left
    Failed,
}

impl WorkStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkStatus::Queued => "queued",
            WorkStatus::Processing => "processing",
            WorkStatus::Completed => "completed",
            WorkStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (never re-entered automatically).
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkStatus::Completed | WorkStatus::Failed)
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_bucket_threshold() -> i64 {
    DEFAULT_BUCKET_THRESHOLD_SECS
}

/// Per-item analysis options supplied at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisParams {
    /// Caption language to request from the platform
    #[serde(default = "default_language")]
    pub language: String,
    /// Optional keyword filter; empty means every segment is screened
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Caption bucket width in seconds
    #[serde(default = "default_bucket_threshold")]
    pub bucket_threshold_secs: i64,
    /// Also screen discussion comments for caption items
    #[serde(default)]
    pub analyze_comments: bool,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            language: default_language(),
            keywords: Vec::new(),
            bucket_threshold_secs: DEFAULT_BUCKET_THRESHOLD_SECS,
            analyze_comments: false,
        }
    }
}

/// Reference to the content a work item operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkPayload {
    /// Named collection (project) the content belongs to
    pub collection: String,
    /// Platform id of the content item
    pub content_id: String,
    /// Analysis options
    #[serde(default)]
    pub params: AnalysisParams,
}

/// One queued unit of processing work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkItem {
    /// Unique item ID
    pub id: WorkItemId,

    /// What to analyze
    #[serde(default)]
    pub kind: WorkKind,

    /// Content reference and options
    pub payload: WorkPayload,

    /// Higher number is admitted first; ties are FIFO
    #[serde(default)]
    pub priority: i32,

    /// Number of processing invocations so far
    #[serde(default)]
    pub attempt_count: u32,

    /// Maximum number of invocations
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Current status
    #[serde(default)]
    pub status: WorkStatus,

    /// Last failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Started at timestamp of the latest attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    /// Retry backoff gate; the item is not admitted before this instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl WorkItem {
    /// Create a new queued work item.
    pub fn new(
        kind: WorkKind,
        collection: impl Into<String>,
        content_id: impl Into<String>,
    ) -> Self {
        Self {
            id: WorkItemId::new(),
            kind,
            payload: WorkPayload {
                collection: collection.into(),
                content_id: content_id.into(),
                params: AnalysisParams::default(),
            },
            priority: 0,
            attempt_count: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            status: WorkStatus::Queued,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            not_before: None,
        }
    }

    /// Set analysis params.
    pub fn with_params(mut self, params: AnalysisParams) -> Self {
        self.payload.params = params;
        self
    }

    /// Set admission priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the attempt limit (at least one attempt).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn collection(&self) -> &str {
        &self.payload.collection
    }

    pub fn content_id(&self) -> &str {
        &self.payload.content_id
    }

    /// Whether caption analysis runs for this item.
    pub fn wants_captions(&self) -> bool {
        self.kind == WorkKind::Caption
    }

    /// Whether comment analysis runs for this item.
    pub fn wants_comments(&self) -> bool {
        self.kind == WorkKind::Comment || self.payload.params.analyze_comments
    }

    /// Whether another attempt is allowed after a failure.
    pub fn can_retry(&self) -> bool {
        self.attempt_count < self.max_attempts
    }

    /// Whether the backoff gate has passed.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.not_before.map_or(true, |t| t <= now)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Enter the processing state; counts one attempt.
    pub fn start_attempt(&mut self) {
        self.status = WorkStatus::Processing;
        self.attempt_count += 1;
        self.started_at = Some(Utc::now());
        self.not_before = None;
    }

    /// Mark as completed.
    pub fn complete(&mut self) {
        self.status = WorkStatus::Completed;
        self.error_message = None;
        self.completed_at = Some(Utc::now());
    }

    /// Mark as terminally failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = WorkStatus::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Put back in the queued state for another attempt.
    pub fn requeue(&mut self, error: impl Into<String>, not_before: Option<DateTime<Utc>>) {
        self.status = WorkStatus::Queued;
        self.error_message = Some(error.into());
        self.not_before = not_before;
    }
}
