//! Prometheus metrics for the worker.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const ITEMS_ENQUEUED_TOTAL: &str = "hunter_items_enqueued_total";
    pub const ITEMS_COMPLETED_TOTAL: &str = "hunter_items_completed_total";
    pub const ITEMS_FAILED_TOTAL: &str = "hunter_items_failed_total";
    pub const ITEMS_RETRIED_TOTAL: &str = "hunter_items_retried_total";
    pub const ITEMS_RECOVERED_TOTAL: &str = "hunter_items_recovered_total";
    pub const FLAGS_TOTAL: &str = "hunter_flags_total";
    pub const SCHEDULER_ERRORS_TOTAL: &str = "hunter_scheduler_errors_total";
    pub const QUEUE_PENDING: &str = "hunter_queue_pending";
}

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            WorkerError::config_error(format!("Failed to install metrics exporter: {}", e))
        })
}

pub fn record_enqueued(kind: &str) {
    counter!(names::ITEMS_ENQUEUED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_completed(kind: &str) {
    counter!(names::ITEMS_COMPLETED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_failed(kind: &str) {
    counter!(names::ITEMS_FAILED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_retried(kind: &str) {
    counter!(names::ITEMS_RETRIED_TOTAL, "kind" => kind.to_string()).increment(1);
}

pub fn record_recovered(outcome: &'static str) {
    counter!(names::ITEMS_RECOVERED_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_flag(source: &'static str) {
    counter!(names::FLAGS_TOTAL, "source" => source).increment(1);
}

pub fn record_scheduler_error() {
    counter!(names::SCHEDULER_ERRORS_TOTAL).increment(1);
}

pub fn set_queue_pending(pending: usize) {
    gauge!(names::QUEUE_PENDING).set(pending as f64);
}
