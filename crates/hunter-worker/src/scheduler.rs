//! Queue scheduler.
//!
//! Admits at most one work item at a time. The in-memory guard is a
//! one-permit semaphore; the durable guard is the processing marker the
//! queue store writes when an item is popped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, error, info, warn};

use hunter_models::{
    ContentMetadata, ContentStatus, NotificationEvent, WorkItem, WorkItemId, WorkStatus,
};
use hunter_queue::QueueStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::metrics;
use crate::processor::{ItemProcessor, ProcessOutcome};
use crate::retry::FailureTracker;

const INTERRUPTED: &str = "interrupted by restart";

/// Items touched by the startup recovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub requeued: Vec<WorkItemId>,
    pub failed: Vec<WorkItemId>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.requeued.is_empty() && self.failed.is_empty()
    }
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub pending: usize,
    pub in_flight: Option<WorkItemId>,
    pub running: bool,
    pub busy: bool,
}

/// State shared with the task processing the in-flight item.
struct SlotContext {
    config: WorkerConfig,
    queue: Arc<dyn QueueStore>,
    processor: Arc<ItemProcessor>,
    current: Mutex<Option<WorkItemId>>,
}

/// Single-slot scheduler over a durable queue.
pub struct QueueScheduler {
    ctx: Arc<SlotContext>,
    slot: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
    running: AtomicBool,
}

impl QueueScheduler {
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn QueueStore>,
        processor: Arc<ItemProcessor>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx: Arc::new(SlotContext {
                config,
                queue,
                processor,
                current: Mutex::new(None),
            }),
            slot: Arc::new(Semaphore::new(1)),
            shutdown,
            running: AtomicBool::new(false),
        }
    }

    /// Recover, then tick until shutdown.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            tick_ms = self.ctx.config.tick_interval.as_millis() as u64,
            queue = %self.ctx.config.queue_path.display(),
            "Starting queue scheduler"
        );

        let report = self.recover().await?;
        if !report.is_empty() {
            info!(
                requeued = report.requeued.len(),
                failed = report.failed.len(),
                "Recovered items interrupted by restart"
            );
        }

        self.running.store(true, Ordering::SeqCst);
        let mut shutdown_rx = self.shutdown.subscribe();
        let mut interval = tokio::time::interval(self.ctx.config.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut failures = FailureTracker::new(5);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => continue,
                _ = interval.tick() => {}
            }

            match self.tick().await {
                Ok(_) => failures.record_success(),
                Err(e) => {
                    metrics::record_scheduler_error();
                    if failures.record_failure() {
                        error!(
                            error = %e,
                            failures = failures.failure_count(),
                            "Scheduler tick failed"
                        );
                    }
                    tokio::select! {
                        _ = shutdown_rx.changed() => {}
                        _ = tokio::time::sleep(self.ctx.config.error_backoff) => {}
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Waiting for in-flight item to finish...");
        if tokio::time::timeout(self.ctx.config.shutdown_timeout, self.wait_idle())
            .await
            .is_err()
        {
            warn!("In-flight item still running at shutdown; it will be recovered on restart");
        }

        info!("Queue scheduler stopped");
        Ok(())
    }

    /// Admit the next item if the slot is free.
    ///
    /// Returns whether an item was started.
    pub async fn tick(&self) -> WorkerResult<bool> {
        let permit = match self.slot.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => return Ok(false),
            Err(TryAcquireError::Closed) => {
                return Err(WorkerError::invalid_input("scheduler slot closed"))
            }
        };

        let Some(item) = self.ctx.queue.dequeue_head(Utc::now()).await? else {
            return Ok(false);
        };
        metrics::set_queue_pending(self.ctx.queue.len().await?);

        if let Err(e) = self.ctx.processor.records().put_work_item(&item).await {
            warn!(item_id = %item.id, error = %e, "Failed to record item start");
        }
        *self.ctx.current.lock().await = Some(item.id.clone());

        debug!(item_id = %item.id, attempt = item.attempt_count, "Admitted item");
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            ctx.execute(item, permit).await;
        });

        Ok(true)
    }

    /// Requeue or fail everything a previous run left in processing.
    ///
    /// Holds the slot for the whole pass, so it refuses to run while an item
    /// is in flight.
    pub async fn recover(&self) -> WorkerResult<RecoveryReport> {
        let _permit = match self.slot.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::NoPermits) => {
                return Err(WorkerError::busy("cannot recover while an item is in flight"))
            }
            Err(TryAcquireError::Closed) => {
                return Err(WorkerError::invalid_input("scheduler slot closed"))
            }
        };

        let mut report = RecoveryReport::default();
        let queue = &self.ctx.queue;
        let records = self.ctx.processor.records();

        for marker in queue.in_flight().await? {
            let mut item = match records.get_work_item(&marker.id).await? {
                Some(stored) if stored.is_terminal() => {
                    // finished but the marker release did not land
                    queue.release(&marker.id).await?;
                    continue;
                }
                _ => marker,
            };
            item.status = WorkStatus::Processing;
            self.ctx.recover_item(item, &mut report).await?;
        }

        let pending: Vec<WorkItemId> =
            queue.peek_all().await?.into_iter().map(|i| i.id).collect();
        for stored in records.list_work_items(Some(WorkStatus::Processing)).await? {
            if pending.contains(&stored.id)
                || report.requeued.contains(&stored.id)
                || report.failed.contains(&stored.id)
            {
                continue;
            }
            self.ctx.recover_item(stored, &mut report).await?;
        }

        for id in &report.requeued {
            warn!(item_id = %id, "Re-queued item interrupted by restart");
            metrics::record_recovered("requeued");
        }
        for id in &report.failed {
            warn!(item_id = %id, "Failed item interrupted by restart with no attempts left");
            metrics::record_recovered("failed");
        }
        Ok(report)
    }

    /// Submit one item. See [`QueueScheduler::submit_batch`].
    pub async fn submit(&self, item: WorkItem) -> WorkerResult<WorkItemId> {
        let id = item.id.clone();
        self.ctx.admit(item).await?;
        Ok(id)
    }

    /// Register content and enqueue each item.
    ///
    /// Items that fail to enqueue are logged and skipped; the ids of the
    /// accepted items are returned in submission order.
    pub async fn submit_batch(&self, items: Vec<WorkItem>) -> WorkerResult<Vec<WorkItemId>> {
        let total = items.len();
        let mut accepted = Vec::with_capacity(total);

        for item in items {
            let id = item.id.clone();
            let content_id = item.content_id().to_string();
            match self.ctx.admit(item).await {
                Ok(()) => accepted.push(id),
                Err(e) => {
                    warn!(item_id = %id, content_id = %content_id, error = %e, "Skipping item")
                }
            }
        }

        info!(submitted = total, accepted = accepted.len(), "Batch submitted");
        metrics::set_queue_pending(self.ctx.queue.len().await?);
        Ok(accepted)
    }

    /// Stop admitting items.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        let _ = self.shutdown.send(true);
    }

    pub async fn status(&self) -> WorkerResult<SchedulerStatus> {
        let in_flight = self.ctx.current.lock().await.clone();
        Ok(SchedulerStatus {
            pending: self.ctx.queue.len().await?,
            busy: self.slot.available_permits() == 0,
            in_flight,
            running: self.running.load(Ordering::SeqCst),
        })
    }

    /// Wait until the slot is free.
    pub async fn wait_idle(&self) {
        // the permit is released on drop; a closed slot has nothing to wait for
        let _ = self.slot.acquire().await;
    }
}

impl SlotContext {
    async fn execute(&self, item: WorkItem, permit: OwnedSemaphorePermit) {
        let outcome = self.processor.process(&item).await;
        let item_id = item.id.clone();

        if let Err(e) = self.finish(item, outcome).await {
            error!(
                item_id = %item_id,
                error = %e,
                "Failed to settle item; it will be recovered on restart"
            );
        }

        *self.current.lock().await = None;
        drop(permit);
    }

    async fn finish(&self, mut item: WorkItem, outcome: ProcessOutcome) -> WorkerResult<()> {
        let kind = item.kind.as_str();

        match outcome {
            ProcessOutcome::Completed { .. } => {
                item.complete();
                self.record(&item).await;
                self.queue.release(&item.id).await?;
                metrics::record_completed(kind);
            }
            ProcessOutcome::Failed { reason } if item.can_retry() => {
                let delay = self.config.retry.delay_for_attempt(item.attempt_count);
                info!(
                    item_id = %item.id,
                    attempt = item.attempt_count,
                    max_attempts = item.max_attempts,
                    delay_secs = delay.as_secs(),
                    "Retrying item after failure"
                );
                item.requeue(reason, backoff_deadline(Utc::now(), delay));
                self.record(&item).await;
                self.queue.requeue(item.clone()).await?;
                self.set_content_status(&item, ContentStatus::Queued, None).await;
                metrics::record_retried(kind);
            }
            ProcessOutcome::Failed { reason } => {
                warn!(
                    item_id = %item.id,
                    attempts = item.attempt_count,
                    reason = %reason,
                    "Item failed with no attempts left"
                );
                item.fail(reason);
                self.record(&item).await;
                self.queue.release(&item.id).await?;
                metrics::record_failed(kind);
            }
        }

        Ok(())
    }

    async fn recover_item(
        &self,
        mut item: WorkItem,
        report: &mut RecoveryReport,
    ) -> WorkerResult<()> {
        if item.can_retry() {
            item.requeue(INTERRUPTED, None);
            self.queue.requeue(item.clone()).await?;
            self.record(&item).await;
            self.set_content_status(&item, ContentStatus::Queued, None).await;
            report.requeued.push(item.id);
        } else {
            item.fail(INTERRUPTED);
            self.record(&item).await;
            self.queue.release(&item.id).await?;
            self.set_content_status(&item, ContentStatus::Failed, Some(INTERRUPTED.to_string()))
                .await;
            report.failed.push(item.id);
        }
        Ok(())
    }

    async fn admit(&self, mut item: WorkItem) -> WorkerResult<()> {
        let records = self.processor.records();
        let collection = item.collection().to_string();
        let content_id = item.content_id().to_string();

        if item.max_attempts == 0 {
            item.max_attempts = self.config.max_attempts;
        }

        if records.get_content(&collection, &content_id).await?.is_none() {
            let metadata = match self.processor.fetcher().fetch_metadata(&content_id).await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => ContentMetadata::fallback(&content_id),
                Err(e) => {
                    warn!(
                        content_id = %content_id,
                        error = %e,
                        "Metadata fetch failed, using fallback"
                    );
                    ContentMetadata::fallback(&content_id)
                }
            };
            let (content, created) = records
                .get_or_create_content(&collection, &content_id, metadata)
                .await?;
            if created {
                self.processor.events().emit(NotificationEvent::item_added(
                    &collection,
                    &content_id,
                    content.metadata.title,
                ));
            }
        }

        item.status = WorkStatus::Queued;
        records.put_work_item(&item).await?;
        self.set_content_status(&item, ContentStatus::Queued, None).await;

        let kind = item.kind.as_str();
        self.queue.enqueue(item).await?;
        metrics::record_enqueued(kind);
        Ok(())
    }

    /// Mirror the item into the record store; the queue remains authoritative.
    async fn record(&self, item: &WorkItem) {
        if let Err(e) = self.processor.records().put_work_item(item).await {
            warn!(
                item_id = %item.id,
                status = %item.status,
                error = %e,
                "Failed to record item state"
            );
        }
    }

    async fn set_content_status(
        &self,
        item: &WorkItem,
        status: ContentStatus,
        error: Option<String>,
    ) {
        let records = self.processor.records();
        match records
            .update_content_status(item.collection(), item.content_id(), status, error.clone())
            .await
        {
            Ok(old) => self.processor.events().emit(NotificationEvent::status_changed(
                item.collection(),
                item.content_id(),
                old,
                status,
                error,
            )),
            Err(e) => warn!(
                item_id = %item.id,
                content_id = %item.content_id(),
                error = %e,
                "Failed to update content status"
            ),
        }
    }
}

/// Earliest time a retried item may run again.
fn backoff_deadline(now: DateTime<Utc>, delay: std::time::Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delay| now.checked_add_signed(delay))
}
