//! In-memory record store with optional JSON snapshot.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use hunter_models::{
    CommentFlag, ContentItem, ContentMetadata, ContentStatus, FlagCounts, SubtitleFlag, WorkItem,
    WorkItemId, WorkStatus,
};
use hunter_queue::fs_utils::write_atomic;

use crate::error::{StorageError, StorageResult};
use crate::store::RecordStore;

const FLAGS_INSERTED_TOTAL: &str = "hunter_storage_flags_inserted_total";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Records {
    #[serde(default)]
    contents: Vec<ContentItem>,
    #[serde(default)]
    subtitle_flags: Vec<SubtitleFlag>,
    #[serde(default)]
    comment_flags: Vec<CommentFlag>,
    #[serde(default)]
    work_items: Vec<WorkItem>,
}

impl Records {
    fn content_mut(
        &mut self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<&mut ContentItem> {
        self.contents
            .iter_mut()
            .find(|c| c.collection == collection && c.content_id == content_id)
            .ok_or_else(|| StorageError::content_not_found(collection, content_id))
    }

    fn content(&self, collection: &str, content_id: &str) -> Option<&ContentItem> {
        self.contents
            .iter()
            .find(|c| c.collection == collection && c.content_id == content_id)
    }
}

/// Record store kept in memory.
pub struct MemoryRecordStore {
    records: Mutex<Records>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    /// Create an empty store without persistence.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            snapshot_path: None,
        }
    }

    /// Create a store that loads from and snapshots to `path`.
    pub async fn with_snapshot(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str::<Records>(&contents)
                .map_err(|e| StorageError::Snapshot(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Records::default(),
            Err(e) => return Err(StorageError::Io(e)),
        };

        info!(
            path = %path.display(),
            contents = records.contents.len(),
            work_items = records.work_items.len(),
            "Loaded record snapshot"
        );

        Ok(Self {
            records: Mutex::new(records),
            snapshot_path: Some(path),
        })
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Apply `mutate` to a copy of the records, snapshot, then commit.
    async fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut Records) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.records.lock().await;
        let mut next = guard.clone();
        let value = mutate(&mut next)?;

        if let Some(path) = &self.snapshot_path {
            if next != *guard {
                let json = serde_json::to_vec_pretty(&next)?;
                write_atomic(path, &json)
                    .await
                    .map_err(|e| StorageError::Snapshot(format!("{}: {}", path.display(), e)))?;
                debug!(path = %path.display(), "Wrote record snapshot");
            }
        }

        *guard = next;
        Ok(value)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_or_create_content(
        &self,
        collection: &str,
        content_id: &str,
        metadata: ContentMetadata,
    ) -> StorageResult<(ContentItem, bool)> {
        if let Some(existing) = self.get_content(collection, content_id).await? {
            return Ok((existing, false));
        }

        self.mutate(|records| {
            if let Some(existing) = records.content(collection, content_id) {
                return Ok((existing.clone(), false));
            }
            let item = ContentItem::new(collection, content_id, metadata);
            records.contents.push(item.clone());
            info!(collection, content_id, "Created content record");
            Ok((item, true))
        })
        .await
    }

    async fn get_content(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Option<ContentItem>> {
        Ok(self.records.lock().await.content(collection, content_id).cloned())
    }

    async fn list_contents(&self, collection: &str) -> StorageResult<Vec<ContentItem>> {
        Ok(self
            .records
            .lock()
            .await
            .contents
            .iter()
            .filter(|c| c.collection == collection)
            .cloned()
            .collect())
    }

    async fn update_content_status(
        &self,
        collection: &str,
        content_id: &str,
        status: ContentStatus,
        error: Option<String>,
    ) -> StorageResult<ContentStatus> {
        self.mutate(|records| {
            let content = records.content_mut(collection, content_id)?;
            let previous = content.status;
            content.set_status(status, error);
            Ok(previous)
        })
        .await
    }

    async fn update_content_metadata(
        &self,
        collection: &str,
        content_id: &str,
        metadata: ContentMetadata,
    ) -> StorageResult<()> {
        self.mutate(|records| {
            records.content_mut(collection, content_id)?.metadata = metadata;
            Ok(())
        })
        .await
    }

    async fn set_flag_summary(
        &self,
        collection: &str,
        content_id: &str,
        counts: FlagCounts,
    ) -> StorageResult<()> {
        self.mutate(|records| {
            let content = records.content_mut(collection, content_id)?;
            content.flagged_subtitles = counts.flagged_subtitles;
            content.flagged_comments = counts.flagged_comments;
            Ok(())
        })
        .await
    }

    async fn insert_subtitle_flag(&self, flag: SubtitleFlag) -> StorageResult<bool> {
        let inserted = self
            .mutate(|records| {
                let key = flag.natural_key();
                if records.subtitle_flags.iter().any(|f| f.natural_key() == key) {
                    return Ok(false);
                }
                records.subtitle_flags.push(flag);
                Ok(true)
            })
            .await?;
        if inserted {
            counter!(FLAGS_INSERTED_TOTAL, "kind" => "subtitle").increment(1);
        }
        Ok(inserted)
    }

    async fn insert_comment_flag(&self, flag: CommentFlag) -> StorageResult<bool> {
        let inserted = self
            .mutate(|records| {
                let key = flag.natural_key();
                if records.comment_flags.iter().any(|f| f.natural_key() == key) {
                    return Ok(false);
                }
                records.comment_flags.push(flag);
                Ok(true)
            })
            .await?;
        if inserted {
            counter!(FLAGS_INSERTED_TOTAL, "kind" => "comment").increment(1);
        }
        Ok(inserted)
    }

    async fn count_flags(&self, collection: &str, content_id: &str) -> StorageResult<FlagCounts> {
        let records = self.records.lock().await;
        let subtitles = records
            .subtitle_flags
            .iter()
            .filter(|f| f.collection == collection && f.content_id == content_id)
            .count();
        let comments = records
            .comment_flags
            .iter()
            .filter(|f| f.collection == collection && f.content_id == content_id)
            .count();

        Ok(FlagCounts {
            flagged_subtitles: subtitles as u32,
            flagged_comments: comments as u32,
        })
    }

    async fn list_subtitle_flags(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Vec<SubtitleFlag>> {
        let mut flags: Vec<SubtitleFlag> = self
            .records
            .lock()
            .await
            .subtitle_flags
            .iter()
            .filter(|f| f.collection == collection && f.content_id == content_id)
            .cloned()
            .collect();
        flags.sort_by_key(|f| f.timestamp_secs);
        Ok(flags)
    }

    async fn list_comment_flags(
        &self,
        collection: &str,
        content_id: &str,
    ) -> StorageResult<Vec<CommentFlag>> {
        Ok(self
            .records
            .lock()
            .await
            .comment_flags
            .iter()
            .filter(|f| f.collection == collection && f.content_id == content_id)
            .cloned()
            .collect())
    }

    async fn put_work_item(&self, item: &WorkItem) -> StorageResult<()> {
        self.mutate(|records| {
            match records.work_items.iter_mut().find(|w| w.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => records.work_items.push(item.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn get_work_item(&self, id: &WorkItemId) -> StorageResult<Option<WorkItem>> {
        Ok(self
            .records
            .lock()
            .await
            .work_items
            .iter()
            .find(|w| &w.id == id)
            .cloned())
    }

    async fn list_work_items(&self, status: Option<WorkStatus>) -> StorageResult<Vec<WorkItem>> {
        Ok(self
            .records
            .lock()
            .await
            .work_items
            .iter()
            .filter(|w| status.map_or(true, |s| w.status == s))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hunter_models::WorkKind;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn subtitle_flag(ts: u64, text: &str) -> SubtitleFlag {
        SubtitleFlag {
            collection: "project".into(),
            content_id: "abc".into(),
            timestamp_secs: ts,
            text: text.into(),
            categories: BTreeSet::from(["hate".to_string()]),
            external_link: format!("https://www.youtube.com/watch?v=abc&t={}", ts),
            created_at: Utc::now(),
        }
    }

    fn comment_flag(comment_id: &str) -> CommentFlag {
        CommentFlag {
            collection: "project".into(),
            content_id: "abc".into(),
            comment_id: comment_id.into(),
            author: "someone".into(),
            author_thumbnail: None,
            text: "nasty".into(),
            categories: BTreeSet::from(["harassment".to_string()]),
            external_link: format!("https://www.youtube.com/watch?v=abc&lc={}", comment_id),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = MemoryRecordStore::new();

        let (first, created) = store
            .get_or_create_content("project", "abc", ContentMetadata::fallback("abc"))
            .await
            .unwrap();
        assert!(created);
        assert_eq!(first.status, ContentStatus::Pending);

        let (second, created) = store
            .get_or_create_content("project", "abc", ContentMetadata::default())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.metadata.title, "Video abc");
        assert_eq!(store.list_contents("project").await.unwrap().len(), 1);
        assert!(store.list_contents("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_updates_return_previous() {
        let store = MemoryRecordStore::new();
        store
            .get_or_create_content("project", "abc", ContentMetadata::default())
            .await
            .unwrap();

        let old = store
            .update_content_status("project", "abc", ContentStatus::Queued, None)
            .await
            .unwrap();
        assert_eq!(old, ContentStatus::Pending);

        let old = store
            .update_content_status("project", "abc", ContentStatus::Failed, Some("boom".into()))
            .await
            .unwrap();
        assert_eq!(old, ContentStatus::Queued);

        let content = store.get_content("project", "abc").await.unwrap().unwrap();
        assert_eq!(content.processing_error.as_deref(), Some("boom"));

        let missing = store
            .update_content_status("project", "nope", ContentStatus::Queued, None)
            .await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_flag_inserts_dedupe() {
        let store = MemoryRecordStore::new();

        assert!(store.insert_subtitle_flag(subtitle_flag(30, "bad")).await.unwrap());
        assert!(!store.insert_subtitle_flag(subtitle_flag(30, "bad")).await.unwrap());
        assert!(store.insert_subtitle_flag(subtitle_flag(0, "bad")).await.unwrap());
        assert!(store.insert_comment_flag(comment_flag("c1")).await.unwrap());
        assert!(!store.insert_comment_flag(comment_flag("c1")).await.unwrap());

        let counts = store.count_flags("project", "abc").await.unwrap();
        assert_eq!(
            counts,
            FlagCounts {
                flagged_subtitles: 2,
                flagged_comments: 1
            }
        );

        let listed = store.list_subtitle_flags("project", "abc").await.unwrap();
        assert_eq!(listed[0].timestamp_secs, 0);
        assert_eq!(store.list_comment_flags("project", "abc").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_work_item_records() {
        let store = MemoryRecordStore::new();
        let mut item = WorkItem::new(WorkKind::Caption, "project", "abc");
        store.put_work_item(&item).await.unwrap();

        item.start_attempt();
        store.put_work_item(&item).await.unwrap();

        let stored = store.get_work_item(&item.id).await.unwrap().unwrap();
        assert_eq!(stored.attempt_count, 1);
        assert_eq!(store.list_work_items(None).await.unwrap().len(), 1);
        assert_eq!(
            store.list_work_items(Some(WorkStatus::Processing)).await.unwrap().len(),
            1
        );
        assert!(store.list_work_items(Some(WorkStatus::Queued)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");

        {
            let store = MemoryRecordStore::with_snapshot(&path).await.unwrap();
            store
                .get_or_create_content("project", "abc", ContentMetadata::fallback("abc"))
                .await
                .unwrap();
            store.insert_subtitle_flag(subtitle_flag(30, "bad")).await.unwrap();
        }

        let reopened = MemoryRecordStore::with_snapshot(&path).await.unwrap();
        assert!(reopened.get_content("project", "abc").await.unwrap().is_some());
        assert_eq!(reopened.count_flags("project", "abc").await.unwrap().flagged_subtitles, 1);
        assert_eq!(reopened.snapshot_path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        fs::write(&path, "{oops").await.unwrap();

        assert!(matches!(
            MemoryRecordStore::with_snapshot(&path).await,
            Err(StorageError::Snapshot(_))
        ));
    }
}
