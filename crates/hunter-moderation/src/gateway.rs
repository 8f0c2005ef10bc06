//! Rate-limited, cached access to the classifier.
//!
//! One gateway instance is shared by every caller of the process. Verdicts are
//! cached by the SHA-256 of the trimmed text, so repeated text never costs a
//! second external call. Misses pass through a single GCRA limiter with a
//! burst of one, which spaces granted calls at least `1 / max_rps` apart.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use metrics::counter;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use hunter_models::ClassificationResult;

use crate::client::{Classifier, ModerationClient};
use crate::config::ModerationConfig;
use crate::error::ModerationResult;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Metric names.
pub mod names {
    pub const EXTERNAL_CALLS_TOTAL: &str = "hunter_moderation_external_calls_total";
    pub const CACHE_HITS_TOTAL: &str = "hunter_moderation_cache_hits_total";
    pub const FAILURES_TOTAL: &str = "hunter_moderation_failures_total";
}

/// Cache key for a piece of text: hex SHA-256 of the trimmed text.
pub fn cache_key(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.trim().as_bytes()))
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    pub external_calls: u64,
    pub cache_hits: u64,
    pub failures: u64,
}

/// Shared moderation gateway.
pub struct ModerationGateway {
    classifier: Arc<dyn Classifier>,
    limiter: DirectLimiter,
    cache: Cache<String, ClassificationResult>,
    external_calls: AtomicU64,
    cache_hits: AtomicU64,
    failures: AtomicU64,
}

impl ModerationGateway {
    /// Create a gateway around an existing classifier.
    pub fn new(config: &ModerationConfig, classifier: Arc<dyn Classifier>) -> Self {
        let rps = config.max_requests_per_second.max(1);
        let quota = Quota::with_period(Duration::from_secs_f64(1.0 / f64::from(rps)))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
            .allow_burst(NonZeroU32::MIN);

        let cache = match config.cache_capacity {
            Some(capacity) => Cache::builder().max_capacity(capacity).build(),
            None => Cache::builder().build(),
        };

        info!(
            max_requests_per_second = rps,
            cache_capacity = ?config.cache_capacity,
            "Moderation gateway ready"
        );

        Self {
            classifier,
            limiter: RateLimiter::direct(quota),
            cache,
            external_calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Create a gateway backed by the HTTP moderation client.
    pub fn from_config(config: ModerationConfig) -> ModerationResult<Self> {
        let client = ModerationClient::new(config.clone())?;
        Ok(Self::new(&config, Arc::new(client)))
    }

    /// Classify text.
    ///
    /// Never fails: an external failure is logged and reported as not
    /// flagged, and the failed verdict is not cached. Concurrent callers with
    /// the same text share one external call.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let normalized = text.trim();
        if normalized.is_empty() {
            return ClassificationResult::not_flagged();
        }

        let key = cache_key(normalized);
        let lookup = self
            .cache
            .entry_by_ref(&key)
            .or_try_insert_with(self.call_classifier(normalized))
            .await;

        match lookup {
            Ok(entry) => {
                if !entry.is_fresh() {
                    self.cache_hits.fetch_add(1, Ordering::Relaxed);
                    counter!(names::CACHE_HITS_TOTAL).increment(1);
                    debug!(key = %key, "Moderation cache hit");
                }
                entry.into_value()
            }
            Err(_) => ClassificationResult::not_flagged(),
        }
    }

    /// Rate-limited external call; runs once per cache miss.
    async fn call_classifier(&self, text: &str) -> ModerationResult<ClassificationResult> {
        self.limiter.until_ready().await;

        self.external_calls.fetch_add(1, Ordering::Relaxed);
        counter!(names::EXTERNAL_CALLS_TOTAL).increment(1);

        self.classifier.classify(text).await.inspect_err(|e| {
            self.failures.fetch_add(1, Ordering::Relaxed);
            counter!(names::FAILURES_TOTAL).increment(1);
            warn!(
                error = %e,
                retryable = e.is_retryable(),
                "Moderation call failed, treating text as not flagged"
            );
        })
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            external_calls: self.external_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Number of cached verdicts after pending maintenance has run.
    pub async fn cached_entries(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModerationError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Flags any text containing "bad"; fails on text containing "boom".
    #[derive(Default)]
    struct FakeClassifier {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(&self, text: &str) -> ModerationResult<ClassificationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if text.contains("boom") {
                return Err(ModerationError::RequestFailed("500".into()));
            }
            let mut result = ClassificationResult::not_flagged();
            if text.contains("bad") {
                result.flagged = true;
                result.categories.insert("hate".into());
            }
            Ok(result)
        }
    }

    fn gateway(rps: u32) -> (ModerationGateway, Arc<FakeClassifier>) {
        let fake = Arc::new(FakeClassifier::default());
        let config = ModerationConfig::default().with_max_requests_per_second(rps);
        (ModerationGateway::new(&config, fake.clone()), fake)
    }

    fn slow_gateway(delay: Duration) -> (Arc<ModerationGateway>, Arc<FakeClassifier>) {
        let fake = Arc::new(FakeClassifier {
            delay,
            ..Default::default()
        });
        let config = ModerationConfig::default().with_max_requests_per_second(100);
        (Arc::new(ModerationGateway::new(&config, fake.clone())), fake)
    }

    #[test]
    fn test_cache_key_normalizes() {
        assert_eq!(cache_key("  hello "), cache_key("hello"));
        assert_ne!(cache_key("hello"), cache_key("Hello"));
        assert_eq!(cache_key("hello").len(), 64);
    }

    #[tokio::test]
    async fn test_identical_text_calls_once() {
        let (gateway, fake) = gateway(100);

        let first = gateway.classify("bad words").await;
        let second = gateway.classify("  bad words  ").await;

        assert!(first.flagged);
        assert_eq!(first, second);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.stats(),
            GatewayStats {
                external_calls: 1,
                cache_hits: 1,
                failures: 0
            }
        );
    }

    #[tokio::test]
    async fn test_empty_text_skips_everything() {
        let (gateway, fake) = gateway(100);

        let result = gateway.classify("   \n\t").await;

        assert!(!result.flagged);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.stats(), GatewayStats::default());
        assert_eq!(gateway.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_failure_defaults_and_is_not_cached() {
        let (gateway, fake) = gateway(100);

        assert!(!gateway.classify("boom").await.flagged);
        assert!(!gateway.classify("boom").await.flagged);

        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.stats().failures, 2);
        assert_eq!(gateway.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_misses_are_spaced_by_rate() {
        let (gateway, fake) = gateway(20);
        let gateway = Arc::new(gateway);

        let start = Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.classify(&format!("text {}", i)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // 4 misses at 20 rps: at least 3 intervals of 50ms.
        assert!(start.elapsed() >= Duration::from_millis(145));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cache_hits_are_not_throttled() {
        let (gateway, _fake) = gateway(1);
        gateway.classify("warm").await;

        let start = Instant::now();
        for _ in 0..5 {
            gateway.classify("warm").await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
        assert_eq!(gateway.stats().cache_hits, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_identical_text_calls_once() {
        let (gateway, fake) = slow_gateway(Duration::from_millis(100));

        let handles: Vec<_> = ["bad words", " bad words "]
            .into_iter()
            .map(|text| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.classify(text).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert!(results.iter().all(|r| r.flagged));
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway.stats(),
            GatewayStats {
                external_calls: 1,
                cache_hits: 1,
                failures: 0
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_failure_is_shared_and_not_cached() {
        let (gateway, fake) = slow_gateway(Duration::from_millis(100));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move { gateway.classify("boom").await })
            })
            .collect();
        for handle in handles {
            assert!(!handle.await.unwrap().flagged);
        }

        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.stats().failures, 1);
        assert_eq!(gateway.cached_entries().await, 0);
    }
}
