//! Moderation worker binary.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hunter_models::work_item::DEFAULT_BUCKET_THRESHOLD_SECS;
use hunter_models::{extract_content_id, AnalysisParams, WorkItem, WorkKind};
use hunter_moderation::{ModerationConfig, ModerationGateway};
use hunter_queue::{FileQueueStore, TracingEventSink};
use hunter_storage::{MemoryRecordStore, RecordStore};
use hunter_worker::{ItemProcessor, QueueScheduler, WorkerConfig, YtDlpFetcher};

/// Caption and comment moderation worker.
#[derive(Parser, Debug)]
#[command(name = "hunter-worker")]
#[command(about = "Screens video captions and comments through a moderation endpoint")]
#[command(version)]
struct Cli {
    /// Collection the submitted videos belong to
    #[arg(long, env = "HUNTER_COLLECTION", default_value = "default")]
    collection: String,

    /// Video URL or id to enqueue before starting (repeatable)
    #[arg(long = "video", value_name = "URL_OR_ID")]
    videos: Vec<String>,

    /// What to analyze for the submitted videos
    #[arg(long, value_enum, default_value_t = Kind::Caption)]
    kind: Kind,

    /// Caption language to request
    #[arg(long, default_value = "en")]
    language: String,

    /// Only screen text containing one of these keywords (comma-separated)
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Caption bucket width in seconds
    #[arg(long, default_value_t = DEFAULT_BUCKET_THRESHOLD_SECS, allow_negative_numbers = true)]
    bucket_secs: i64,

    /// Also screen comments for caption items
    #[arg(long)]
    comments: bool,

    /// Queue priority of the submitted videos
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    priority: i32,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Caption,
    Comment,
}

impl From<Kind> for WorkKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Caption => WorkKind::Caption,
            Kind::Comment => WorkKind::Comment,
        }
    }
}

impl Cli {
    fn work_items(&self, max_attempts: u32) -> Result<Vec<WorkItem>> {
        let params = AnalysisParams {
            language: self.language.clone(),
            keywords: self.keywords.clone(),
            bucket_threshold_secs: self.bucket_secs,
            analyze_comments: self.comments,
        };

        self.videos
            .iter()
            .map(|video| {
                let content_id = extract_content_id(video)
                    .with_context(|| format!("invalid video reference: {}", video))?;
                Ok(WorkItem::new(self.kind.into(), &self.collection, content_id)
                    .with_params(params.clone())
                    .with_priority(self.priority)
                    .with_max_attempts(max_attempts))
            })
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("hunter=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true).with_thread_ids(false))
            .with(env_filter)
            .init();
    }

    let cli = Cli::parse();
    info!("Starting hunter-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        hunter_worker::metrics::init_metrics(addr)?;
        info!(%addr, "Prometheus metrics listener started");
    }

    let moderation = ModerationConfig::from_env();
    if moderation.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; moderation requests will be unauthenticated");
    }
    let gateway = Arc::new(
        ModerationGateway::from_config(moderation).context("failed to build moderation gateway")?,
    );

    let records: Arc<dyn RecordStore> = match &config.records_path {
        Some(path) => Arc::new(
            MemoryRecordStore::with_snapshot(path)
                .await
                .with_context(|| format!("failed to load records from {}", path.display()))?,
        ),
        None => Arc::new(MemoryRecordStore::new()),
    };

    let fetcher = Arc::new(
        YtDlpFetcher::new(config.ytdlp_path.clone(), config.fetch_timeout)
            .with_watch_base(config.watch_base.clone()),
    );
    let queue = Arc::new(
        FileQueueStore::open(&config.queue_path)
            .await
            .with_context(|| format!("failed to open queue at {}", config.queue_path.display()))?,
    );

    let processor = Arc::new(
        ItemProcessor::new(records, fetcher, gateway, Arc::new(TracingEventSink))
            .with_watch_base(config.watch_base.clone()),
    );

    let items = cli.work_items(config.max_attempts)?;
    let scheduler = Arc::new(QueueScheduler::new(config, queue, processor));

    if !items.is_empty() {
        let accepted = scheduler.submit_batch(items).await?;
        info!(accepted = accepted.len(), "Submitted videos from the command line");
    }

    let shutdown_handle = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Received shutdown signal");
            scheduler.shutdown();
        })
    };

    scheduler.run().await?;
    shutdown_handle.abort();

    info!("Worker shutdown complete");
    Ok(())
}
