//! Item processor.
//!
//! Runs one work item end to end: mark processing, fetch, segment, screen,
//! record flags, summarize. Every failure is turned into a
//! [`ProcessOutcome::Failed`]; nothing escapes `process`.

use std::sync::Arc;

use chrono::Utc;
use tracing::Instrument;

use hunter_captions::segment;
use hunter_models::{
    comment_link, watch_link, Comment, CommentFlag, ContentMetadata, ContentStatus, FlagCounts,
    NotificationEvent, SubtitleFlag, WorkItem, DEFAULT_WATCH_BASE,
};
use hunter_moderation::ModerationGateway;
use hunter_queue::EventSink;
use hunter_storage::RecordStore;

use crate::error::WorkerResult;
use crate::fetch::Fetcher;
use crate::filter::KeywordFilter;
use crate::logging::ItemLogger;
use crate::metrics;

/// Result of processing one work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Completed { counts: FlagCounts },
    Failed { reason: String },
}

impl ProcessOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ProcessOutcome::Completed { .. })
    }
}

/// Processes work items against the shared collaborators.
pub struct ItemProcessor {
    records: Arc<dyn RecordStore>,
    fetcher: Arc<dyn Fetcher>,
    gateway: Arc<ModerationGateway>,
    events: Arc<dyn EventSink>,
    watch_base: String,
}

impl ItemProcessor {
    pub fn new(
        records: Arc<dyn RecordStore>,
        fetcher: Arc<dyn Fetcher>,
        gateway: Arc<ModerationGateway>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            records,
            fetcher,
            gateway,
            events,
            watch_base: DEFAULT_WATCH_BASE.to_string(),
        }
    }

    pub fn with_watch_base(mut self, watch_base: impl Into<String>) -> Self {
        self.watch_base = watch_base.into();
        self
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    /// Process one item. Never fails; failures come back as `Failed`.
    pub async fn process(&self, item: &WorkItem) -> ProcessOutcome {
        let logger = ItemLogger::new(item);
        let span = logger.create_span();

        async {
            logger.log_start(&format!("{} analysis", item.kind));

            match self.run(item, &logger).await {
                Ok(counts) => {
                    logger.log_completion(&format!(
                        "{} subtitle flags, {} comment flags",
                        counts.flagged_subtitles, counts.flagged_comments
                    ));
                    ProcessOutcome::Completed { counts }
                }
                Err(e) => {
                    let reason = e.to_string();
                    logger.log_error(&reason);
                    if let Err(status_err) = self
                        .transition(item, ContentStatus::Failed, Some(reason.clone()))
                        .await
                    {
                        logger.log_error(&format!("Failed to record failure: {}", status_err));
                    }
                    ProcessOutcome::Failed { reason }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, item: &WorkItem, logger: &ItemLogger) -> WorkerResult<FlagCounts> {
        let collection = item.collection();
        let content_id = item.content_id();
        let params = &item.payload.params;

        let (content, created) = self
            .records
            .get_or_create_content(collection, content_id, ContentMetadata::fallback(content_id))
            .await?;
        if created {
            logger.log_warning("Content record was missing and has been created");
            self.events.emit(NotificationEvent::item_added(
                collection,
                content_id,
                content.metadata.title,
            ));
        }
        self.transition(item, ContentStatus::Processing, None).await?;

        self.refresh_metadata(item, logger).await?;

        let filter = KeywordFilter::new(params.keywords.as_slice());

        if item.wants_captions() {
            match self.fetcher.fetch_captions(content_id, &params.language).await {
                Ok(Some(raw)) => self.screen_captions(item, &raw, &filter, logger).await?,
                Ok(None) => logger.log_progress("No captions available"),
                Err(e) => logger.log_warning(&format!(
                    "Caption fetch failed, continuing without captions: {}",
                    e
                )),
            }
        }

        if item.wants_comments() {
            match self.fetcher.fetch_comments(content_id).await {
                Ok(Some(comments)) => self.screen_comments(item, &comments, &filter, logger).await?,
                Ok(None) => logger.log_progress("No comments available"),
                Err(e) => logger.log_warning(&format!(
                    "Comment fetch failed, continuing without comments: {}",
                    e
                )),
            }
        }

        let counts = self.records.count_flags(collection, content_id).await?;
        self.records.set_flag_summary(collection, content_id, counts).await?;

        self.transition(item, ContentStatus::Completed, None).await?;
        self.events
            .emit(NotificationEvent::analysis_complete(collection, content_id, counts));

        Ok(counts)
    }

    async fn refresh_metadata(&self, item: &WorkItem, logger: &ItemLogger) -> WorkerResult<()> {
        match self.fetcher.fetch_metadata(item.content_id()).await {
            Ok(Some(metadata)) => {
                self.records
                    .update_content_metadata(item.collection(), item.content_id(), metadata)
                    .await?;
            }
            Ok(None) => {}
            Err(e) => logger.log_warning(&format!("Metadata fetch failed: {}", e)),
        }
        Ok(())
    }

    async fn screen_captions(
        &self,
        item: &WorkItem,
        raw: &str,
        filter: &KeywordFilter,
        logger: &ItemLogger,
    ) -> WorkerResult<()> {
        let segments = segment(raw, item.payload.params.bucket_threshold_secs);
        let mut screened = 0usize;
        let mut flagged = 0usize;

        for seg in segments.iter().filter(|s| filter.matches(&s.text)) {
            screened += 1;
            let verdict = self.gateway.classify(&seg.text).await;
            if !verdict.flagged {
                continue;
            }

            let flag = SubtitleFlag {
                collection: item.collection().to_string(),
                content_id: item.content_id().to_string(),
                timestamp_secs: seg.bucket_start_seconds,
                text: seg.text.clone(),
                categories: verdict.categories,
                external_link: watch_link(
                    &self.watch_base,
                    item.content_id(),
                    Some(seg.bucket_start_seconds),
                ),
                created_at: Utc::now(),
            };
            if self.records.insert_subtitle_flag(flag).await? {
                flagged += 1;
                metrics::record_flag("subtitle");
            }
        }

        logger.log_progress(&format!(
            "Captions: {} segments, {} screened, {} newly flagged",
            segments.len(),
            screened,
            flagged
        ));
        Ok(())
    }

    async fn screen_comments(
        &self,
        item: &WorkItem,
        comments: &[Comment],
        filter: &KeywordFilter,
        logger: &ItemLogger,
    ) -> WorkerResult<()> {
        let mut screened = 0usize;
        let mut flagged = 0usize;

        for comment in comments.iter().filter(|c| filter.matches(&c.text)) {
            screened += 1;
            let verdict = self.gateway.classify(&comment.text).await;
            if !verdict.flagged {
                continue;
            }

            let flag = CommentFlag {
                collection: item.collection().to_string(),
                content_id: item.content_id().to_string(),
                comment_id: comment.id.clone(),
                author: comment.author.clone(),
                author_thumbnail: comment.author_thumbnail.clone(),
                text: comment.text.clone(),
                categories: verdict.categories,
                external_link: comment_link(&self.watch_base, item.content_id(), &comment.id),
                created_at: Utc::now(),
            };
            if self.records.insert_comment_flag(flag).await? {
                flagged += 1;
                metrics::record_flag("comment");
            }
        }

        logger.log_progress(&format!(
            "Comments: {} fetched, {} screened, {} newly flagged",
            comments.len(),
            screened,
            flagged
        ));
        Ok(())
    }

    /// Persist a content status change and notify.
    async fn transition(
        &self,
        item: &WorkItem,
        status: ContentStatus,
        error: Option<String>,
    ) -> WorkerResult<()> {
        let old = self
            .records
            .update_content_status(item.collection(), item.content_id(), status, error.clone())
            .await?;
        self.events.emit(NotificationEvent::status_changed(
            item.collection(),
            item.content_id(),
            old,
            status,
            error,
        ));
        Ok(())
    }
}
