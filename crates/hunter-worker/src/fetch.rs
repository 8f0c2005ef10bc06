//! Fetch collaborator contract and an in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use hunter_models::{Comment, ContentMetadata};

use crate::error::{WorkerError, WorkerResult};

/// Retrieves captions, comments and metadata for a content item.
///
/// `Ok(None)` means the platform has nothing to offer (no captions, comments
/// disabled); `Err` means the retrieval itself failed. The processor treats
/// both as absent.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_metadata(&self, content_id: &str) -> WorkerResult<Option<ContentMetadata>>;

    /// Raw SRT caption text in `language`.
    async fn fetch_captions(
        &self,
        content_id: &str,
        language: &str,
    ) -> WorkerResult<Option<String>>;

    async fn fetch_comments(&self, content_id: &str) -> WorkerResult<Option<Vec<Comment>>>;
}

/// Fetcher serving fixed data.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    metadata: HashMap<String, ContentMetadata>,
    captions: HashMap<String, String>,
    comments: HashMap<String, Vec<Comment>>,
    failing: HashSet<String>,
    caption_calls: AtomicUsize,
    comment_calls: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, content_id: &str, metadata: ContentMetadata) -> Self {
        self.metadata.insert(content_id.to_string(), metadata);
        self
    }

    pub fn with_captions(mut self, content_id: &str, raw: impl Into<String>) -> Self {
        self.captions.insert(content_id.to_string(), raw.into());
        self
    }

    pub fn with_comments(mut self, content_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(content_id.to_string(), comments);
        self
    }

    /// Make every fetch for `content_id` fail.
    pub fn failing(mut self, content_id: &str) -> Self {
        self.failing.insert(content_id.to_string());
        self
    }

    pub fn caption_calls(&self) -> usize {
        self.caption_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    fn check(&self, content_id: &str) -> WorkerResult<()> {
        if self.failing.contains(content_id) {
            return Err(WorkerError::fetch_failed(format!("{} is unavailable", content_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_metadata(&self, content_id: &str) -> WorkerResult<Option<ContentMetadata>> {
        self.check(content_id)?;
        Ok(self.metadata.get(content_id).cloned())
    }

    async fn fetch_captions(
        &self,
        content_id: &str,
        _language: &str,
    ) -> WorkerResult<Option<String>> {
        self.caption_calls.fetch_add(1, Ordering::SeqCst);
        self.check(content_id)?;
        Ok(self.captions.get(content_id).cloned())
    }

    async fn fetch_comments(&self, content_id: &str) -> WorkerResult<Option<Vec<Comment>>> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        self.check(content_id)?;
        Ok(self.comments.get(content_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_fetcher() {
        let fetcher = MemoryFetcher::new()
            .with_captions("abc", "1\n00:00:00,000 --> 00:00:01,000\nhi\n")
            .failing("broken");

        assert!(fetcher.fetch_captions("abc", "en").await.unwrap().is_some());
        assert!(fetcher.fetch_captions("other", "en").await.unwrap().is_none());
        assert!(fetcher.fetch_captions("broken", "en").await.is_err());
        assert!(fetcher.fetch_comments("abc").await.unwrap().is_none());
        assert_eq!(fetcher.caption_calls(), 3);
        assert_eq!(fetcher.comment_calls(), 1);
    }
}
