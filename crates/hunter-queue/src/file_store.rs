//! JSON-lines queue file.
//!
//! One line per entry: `{"state":"pending"|"processing","item":{...}}`.
//! Pending lines appear in queue order before processing lines. The whole
//! file is rewritten through [`write_atomic`] on each mutation, and an
//! unparsable line is dropped on load without affecting its neighbours.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use hunter_models::{WorkItem, WorkItemId};

use crate::error::{QueueError, QueueResult};
use crate::fs_utils::write_atomic;
use crate::store::{QueueState, QueueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EntryState {
    Pending,
    Processing,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueueEntry {
    state: EntryState,
    item: WorkItem,
}

#[derive(Serialize)]
struct QueueEntryRef<'a> {
    state: EntryState,
    item: &'a WorkItem,
}

fn encode(state: &QueueState) -> QueueResult<String> {
    let mut out = String::new();
    let entries = state
        .pending
        .iter()
        .map(|item| (EntryState::Pending, item))
        .chain(state.processing.iter().map(|item| (EntryState::Processing, item)));

    for (entry_state, item) in entries {
        out.push_str(&serde_json::to_string(&QueueEntryRef { state: entry_state, item })?);
        out.push('\n');
    }
    Ok(out)
}

/// Parse file contents, returning the state and the number of dropped lines.
fn decode(contents: &str) -> (QueueState, usize) {
    let mut state = QueueState::default();
    let mut seen: HashSet<WorkItemId> = HashSet::new();
    let mut dropped = 0;

    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let entry = match serde_json::from_str::<QueueEntry>(line) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Dropping malformed queue entry");
                dropped += 1;
                continue;
            }
        };

        if entry.item.is_terminal() {
            warn!(
                line = line_no + 1,
                item_id = %entry.item.id,
                status = %entry.item.status,
                "Dropping terminal item found in queue file"
            );
            dropped += 1;
            continue;
        }
        if !seen.insert(entry.item.id.clone()) {
            warn!(line = line_no + 1, item_id = %entry.item.id, "Dropping duplicate queue entry");
            dropped += 1;
            continue;
        }

        match entry.state {
            EntryState::Pending => state.pending.push(entry.item),
            EntryState::Processing => state.processing.push(entry.item),
        }
    }

    (state, dropped)
}

/// Queue store persisted to a JSON-lines file.
pub struct FileQueueStore {
    path: PathBuf,
    state: Mutex<QueueState>,
}

impl FileQueueStore {
    /// Open the queue file, creating an empty queue if it does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> QueueResult<Self> {
        let path = path.into();

        let (state, dropped) = match fs::read_to_string(&path).await {
            Ok(contents) => decode(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (QueueState::default(), 0),
            Err(e) => return Err(QueueError::Io(e)),
        };

        info!(
            path = %path.display(),
            pending = state.pending.len(),
            processing = state.processing.len(),
            dropped,
            "Opened queue file"
        );

        let store = Self {
            path,
            state: Mutex::new(QueueState::default()),
        };
        if dropped > 0 {
            store.persist(&state).await?;
        }
        *store.state.lock().await = state;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &QueueState) -> QueueResult<()> {
        let contents = encode(state)?;
        write_atomic(&self.path, contents.as_bytes())
            .await
            .map_err(|e| QueueError::Persistence(format!("{}: {}", self.path.display(), e)))?;
        debug!(
            pending = state.pending.len(),
            processing = state.processing.len(),
            "Persisted queue file"
        );
        Ok(())
    }

    /// Apply `mutate` to a copy of the state, persist it, then commit.
    ///
    /// The in-memory state only changes once the file write succeeded.
    async fn mutate<T>(
        &self,
        mutate: impl FnOnce(&mut QueueState) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let value = mutate(&mut next)?;
        if next != *guard {
            self.persist(&next).await?;
            *guard = next;
        }
        Ok(value)
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn enqueue(&self, item: WorkItem) -> QueueResult<()> {
        self.mutate(|state| state.push(item)).await
    }

    async fn dequeue_head(&self, now: DateTime<Utc>) -> QueueResult<Option<WorkItem>> {
        self.mutate(|state| Ok(state.pop_head(now))).await
    }

    async fn peek_all(&self) -> QueueResult<Vec<WorkItem>> {
        Ok(self.state.lock().await.pending.clone())
    }

    async fn in_flight(&self) -> QueueResult<Vec<WorkItem>> {
        Ok(self.state.lock().await.processing.clone())
    }

    async fn requeue(&self, item: WorkItem) -> QueueResult<()> {
        self.mutate(|state| state.requeue(item)).await
    }

    async fn release(&self, id: &WorkItemId) -> QueueResult<bool> {
        self.mutate(|state| Ok(state.release(id))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunter_models::{WorkKind, WorkStatus};
    use tempfile::TempDir;

    fn item(content_id: &str) -> WorkItem {
        WorkItem::new(WorkKind::Caption, "project", content_id)
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.jsonl");

        {
            let store = FileQueueStore::open(&path).await.unwrap();
            store.enqueue(item("a")).await.unwrap();
            store.enqueue(item("b")).await.unwrap();
            store.dequeue_head(Utc::now()).await.unwrap();
        }

        let store = FileQueueStore::open(&path).await.unwrap();
        let pending = store.peek_all().await.unwrap();
        let in_flight = store.in_flight().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content_id(), "b");
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].content_id(), "a");
        assert_eq!(in_flight[0].status, WorkStatus::Processing);
        assert_eq!(in_flight[0].attempt_count, 1);
    }

    #[tokio::test]
    async fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.jsonl");
        let store = FileQueueStore::open(&path).await.unwrap();
        store.enqueue(item("a")).await.unwrap();
        store.enqueue(item("b")).await.unwrap();
        store.dequeue_head(Utc::now()).await.unwrap();

        let contents = fs::read_to_string(&path).await.unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["state"], "pending");
        assert_eq!(lines[0]["item"]["payload"]["content_id"], "b");
        assert_eq!(lines[1]["state"], "processing");
    }

    #[tokio::test]
    async fn test_malformed_lines_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.jsonl");

        let good = serde_json::to_string(&QueueEntry {
            state: EntryState::Pending,
            item: item("good"),
        })
        .unwrap();
        let contents = format!("{{not json\n{}\n{{\"state\":\"pending\"}}\n", good);
        fs::write(&path, contents).await.unwrap();

        let store = FileQueueStore::open(&path).await.unwrap();
        let pending = store.peek_all().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content_id(), "good");

        let rewritten = fs::read_to_string(&path).await.unwrap();
        assert_eq!(rewritten.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_queue() {
        let dir = TempDir::new().unwrap();
        let store = FileQueueStore::open(dir.path().join("absent.jsonl")).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_failed_enqueue_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queue.jsonl");
        let store = FileQueueStore::open(&path).await.unwrap();

        let a = item("a");
        store.enqueue(a.clone()).await.unwrap();
        let before = fs::read_to_string(&path).await.unwrap();

        assert!(store.enqueue(a).await.is_err());
        assert_eq!(fs::read_to_string(&path).await.unwrap(), before);
    }
}
