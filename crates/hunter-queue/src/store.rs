//! Queue store contract and in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use hunter_models::{WorkItem, WorkItemId, WorkStatus};

use crate::error::{QueueError, QueueResult};

/// Durable sequence of pending work items plus processing markers.
///
/// Every non-terminal item is either pending or marked processing, never
/// both. Each method is a single atomic mutation.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append an item to the tail of the pending queue.
    async fn enqueue(&self, item: WorkItem) -> QueueResult<()>;

    /// Pop the next admissible item and mark it processing.
    ///
    /// Highest priority first, ties in FIFO order, items whose `not_before`
    /// lies after `now` skipped. The popped item has already started its
    /// attempt (`attempt_count` incremented) when the marker is written.
    async fn dequeue_head(&self, now: DateTime<Utc>) -> QueueResult<Option<WorkItem>>;

    /// Pending items in queue order.
    async fn peek_all(&self) -> QueueResult<Vec<WorkItem>>;

    /// Items carrying a processing marker.
    async fn in_flight(&self) -> QueueResult<Vec<WorkItem>>;

    /// Drop the processing marker of `item` and append it to the pending tail.
    async fn requeue(&self, item: WorkItem) -> QueueResult<()>;

    /// Drop a processing marker. Returns whether a marker existed.
    async fn release(&self, id: &WorkItemId) -> QueueResult<bool>;

    /// Number of pending items.
    async fn len(&self) -> QueueResult<usize> {
        Ok(self.peek_all().await?.len())
    }
}

/// Pending and processing sets shared by the store implementations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    pub pending: Vec<WorkItem>,
    pub processing: Vec<WorkItem>,
}

impl QueueState {
    fn contains(&self, id: &WorkItemId) -> bool {
        self.pending.iter().chain(self.processing.iter()).any(|i| &i.id == id)
    }

    pub fn push(&mut self, mut item: WorkItem) -> QueueResult<()> {
        if item.is_terminal() {
            return Err(QueueError::enqueue_failed(format!(
                "item {} is already {}",
                item.id, item.status
            )));
        }
        if self.contains(&item.id) {
            return Err(QueueError::enqueue_failed(format!("item {} is already queued", item.id)));
        }
        item.status = WorkStatus::Queued;
        self.pending.push(item);
        Ok(())
    }

    /// Index of the next admissible pending item.
    fn head_index(&self, now: DateTime<Utc>) -> Option<usize> {
        let mut best: Option<(usize, i32)> = None;
        for (index, item) in self.pending.iter().enumerate() {
            if !item.is_ready(now) {
                continue;
            }
            match best {
                Some((_, priority)) if item.priority <= priority => {}
                _ => best = Some((index, item.priority)),
            }
        }
        best.map(|(index, _)| index)
    }

    pub fn pop_head(&mut self, now: DateTime<Utc>) -> Option<WorkItem> {
        let index = self.head_index(now)?;
        let mut item = self.pending.remove(index);
        item.start_attempt();
        self.processing.push(item.clone());
        Some(item)
    }

    pub fn release(&mut self, id: &WorkItemId) -> bool {
        let before = self.processing.len();
        self.processing.retain(|i| &i.id != id);
        self.processing.len() != before
    }

    pub fn requeue(&mut self, item: WorkItem) -> QueueResult<()> {
        self.release(&item.id);
        self.push(item)
    }
}

/// Non-durable store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    state: Mutex<QueueState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(&self, item: WorkItem) -> QueueResult<()> {
        self.state.lock().await.push(item)
    }

    async fn dequeue_head(&self, now: DateTime<Utc>) -> QueueResult<Option<WorkItem>> {
        Ok(self.state.lock().await.pop_head(now))
    }

    async fn peek_all(&self) -> QueueResult<Vec<WorkItem>> {
        Ok(self.state.lock().await.pending.clone())
    }

    async fn in_flight(&self) -> QueueResult<Vec<WorkItem>> {
        Ok(self.state.lock().await.processing.clone())
    }

    async fn requeue(&self, item: WorkItem) -> QueueResult<()> {
        self.state.lock().await.requeue(item)
    }

    async fn release(&self, id: &WorkItemId) -> QueueResult<bool> {
        Ok(self.state.lock().await.release(id))
    }
}
