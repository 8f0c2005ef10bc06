//! Storage collaborator contract.

use async_trait::async_trait;

use hunter_models::{
    CommentFlag, ContentItem, ContentMetadata, ContentStatus, FlagCounts, SubtitleFlag, WorkItem,
    WorkItemId, WorkStatus,
};

use crate::error::StorageResult;

/// Persistent records used by the pipeline.
///
/// Content items are keyed by `(collection, content_id)`. Flag inserts are
/// idempotent on their natural key, so a retried item never double counts.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a content item or create it with `metadata`.
    ///
    /// Returns the record and whether it was created by this call.
    async fn get_or_create_content(
        &self,
        collection: &str,
        content_id: &str,
        metadata: ContentMetadata,
    ) -> StorageResult<(ContentItem, bool)>;

    async fn get_content(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Option<ContentItem>>;

    /// Content items of a collection, oldest first.
    async fn list_contents(&self, collection: &str) -> StorageResult<Vec<ContentItem>>;

    /// Apply a status transition. Returns the previous status.
    async fn update_content_status(
        &self,
        collection: &str,
        content_id: &str,
        status: ContentStatus,
        error: Option<String>,
    ) -> StorageResult<ContentStatus>;

    async fn update_content_metadata(
        &self,
        collection: &str,
        content_id: &str,
        metadata: ContentMetadata,
    ) -> StorageResult<()>;

    /// Store flag totals on the content item.
    async fn set_flag_summary(
        &self,
        collection: &str,
        content_id: &str,
        counts: FlagCounts,
    ) -> StorageResult<()>;

    /// Insert unless a flag with the same natural key exists. Returns whether inserted.
    async fn insert_subtitle_flag(&self, flag: SubtitleFlag) -> StorageResult<bool>;

    /// Insert unless a flag with the same natural key exists. Returns whether inserted.
    async fn insert_comment_flag(&self, flag: CommentFlag) -> StorageResult<bool>;

    async fn count_flags(&self, collection: &str, content_id: &str) -> StorageResult<FlagCounts>;

    /// Subtitle flags ordered by timestamp.
    async fn list_subtitle_flags(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Vec<SubtitleFlag>>;

    async fn list_comment_flags(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Vec<CommentFlag>>;

    /// Insert or replace a work item record.
    async fn put_work_item(&self, item: &WorkItem) -> StorageResult<()>;

    async fn get_work_item(&self, id: &WorkItemId) -> StorageResult<Option<WorkItem>>;

    /// Work items, optionally filtered by status, in creation order.
    async fn list_work_items(&self, status: Option<WorkStatus>) -> StorageResult<Vec<WorkItem>>;
}
