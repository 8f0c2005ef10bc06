//! Worker configuration.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hunter_models::{DEFAULT_WATCH_BASE, work_item::DEFAULT_MAX_ATTEMPTS};

use crate::retry::RetryPolicy;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Durable queue file
    pub queue_path: PathBuf,
    /// Record snapshot file; records stay in memory only when unset
    pub records_path: Option<PathBuf>,
    /// How often the scheduler looks for the next item
    pub tick_interval: Duration,
    /// Pause after a failed tick
    pub error_backoff: Duration,
    /// Backoff between attempts of a failed item
    pub retry: RetryPolicy,
    /// Attempt limit for submitted items
    pub max_attempts: u32,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
    /// Timeout for each yt-dlp invocation
    pub fetch_timeout: Duration,
    /// yt-dlp executable
    pub ytdlp_path: String,
    /// Watch page base used in flag links
    pub watch_base: String,
    /// Prometheus listener address; metrics are not exported when unset
    pub metrics_addr: Option<SocketAddr>,
}

/// Default queue file.
pub const DEFAULT_QUEUE_PATH: &str = "hatehunter.queue.jsonl";

/// File name of the record snapshot kept next to the queue file.
pub const DEFAULT_RECORDS_FILE: &str = "hatehunter.records.json";

/// Record snapshot path beside `queue_path`.
pub fn records_path_for(queue_path: &Path) -> PathBuf {
    queue_path.with_file_name(DEFAULT_RECORDS_FILE)
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let queue_path = PathBuf::from(DEFAULT_QUEUE_PATH);
        Self {
            records_path: Some(records_path_for(&queue_path)),
            queue_path,
            tick_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            shutdown_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(120),
            ytdlp_path: "yt-dlp".to_string(),
            watch_base: DEFAULT_WATCH_BASE.to_string(),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from a variable lookup, falling back to defaults.
    ///
    /// The record snapshot lives beside the queue file unless
    /// `WORKER_RECORDS_PATH` names another file; an empty value keeps records
    /// in memory only.
    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| -> u64 {
            var(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };

        let queue_path = var("WORKER_QUEUE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.queue_path);
        let records_path = match var("WORKER_RECORDS_PATH") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(records_path_for(&queue_path)),
        };

        Self {
            queue_path,
            records_path,
            tick_interval: Duration::from_millis(number("WORKER_TICK_MS", 2000)),
            error_backoff: Duration::from_secs(number("WORKER_ERROR_BACKOFF_SECS", 10)),
            retry: RetryPolicy::new(
                Duration::from_secs(number("WORKER_RETRY_BASE_SECS", 5)),
                Duration::from_secs(number("WORKER_RETRY_MAX_SECS", 300)),
            ),
            max_attempts: var("WORKER_MAX_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            shutdown_timeout: Duration::from_secs(number("WORKER_SHUTDOWN_TIMEOUT", 30)),
            fetch_timeout: Duration::from_secs(number("WORKER_FETCH_TIMEOUT", 120)),
            ytdlp_path: var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            watch_base: var("WATCH_BASE_URL").unwrap_or(defaults.watch_base),
            metrics_addr: var("METRICS_ADDR").and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> WorkerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(2));
        assert_eq!(config.error_backoff, Duration::from_secs(10));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.watch_base, "https://www.youtube.com/watch");
        assert_eq!(
            config.records_path.as_deref(),
            Some(Path::new("hatehunter.records.json"))
        );
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn test_records_snapshot_follows_queue_path() {
        let config = config_from(&[("WORKER_QUEUE_PATH", "/var/lib/hunter/queue.jsonl")]);
        assert_eq!(config.queue_path, PathBuf::from("/var/lib/hunter/queue.jsonl"));
        assert_eq!(
            config.records_path,
            Some(PathBuf::from("/var/lib/hunter/hatehunter.records.json"))
        );

        let unset = config_from(&[]);
        assert_eq!(unset.records_path, Some(PathBuf::from("hatehunter.records.json")));
    }

    #[test]
    fn test_records_path_override() {
        let custom = config_from(&[("WORKER_RECORDS_PATH", "/data/records.json")]);
        assert_eq!(custom.records_path, Some(PathBuf::from("/data/records.json")));

        let memory_only = config_from(&[("WORKER_RECORDS_PATH", "")]);
        assert!(memory_only.records_path.is_none());
    }

    #[test]
    fn test_numeric_vars() {
        let config = config_from(&[
            ("WORKER_TICK_MS", "250"),
            ("WORKER_MAX_ATTEMPTS", "5"),
            ("WORKER_RETRY_BASE_SECS", "not a number"),
            ("METRICS_ADDR", "127.0.0.1:9100"),
        ]);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }
}
