//! Moderation worker.
//!
//! This crate provides:
//! - Item processor: fetch, segment, screen and record flags for one content item
//! - Queue scheduler with a single in-flight slot, bounded retries and crash recovery
//! - Fetch collaborators (yt-dlp and in-memory)
//! - Structured item logging and metrics

pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod metrics;
pub mod processor;
pub mod retry;
pub mod scheduler;
pub mod ytdlp;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use fetch::{Fetcher, MemoryFetcher};
pub use filter::KeywordFilter;
pub use logging::ItemLogger;
pub use processor::{ItemProcessor, ProcessOutcome};
pub use retry::{FailureTracker, RetryPolicy};
pub use scheduler::{QueueScheduler, RecoveryReport, SchedulerStatus};
pub use ytdlp::YtDlpFetcher;
