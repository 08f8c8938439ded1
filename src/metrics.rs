//! Observability metrics for interval ingestion
//!
//! Counters and histograms for fetch attempts, retries, exhausted tasks and
//! record volumes, exposed through an optional Prometheus scrape endpoint.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Prometheus exporter installed only when a listen address is configured
//! - Recording without an installed exporter is a no-op

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: later calls return `Ok(())` without rebinding.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "ingest_fetch_attempts_total",
        Unit::Count,
        "Total number of fetch attempts, retries included"
    );

    describe_counter!(
        "ingest_retries_total",
        Unit::Count,
        "Total number of retries scheduled after a failed attempt"
    );

    describe_histogram!(
        "ingest_retry_backoff_seconds",
        Unit::Seconds,
        "Wait before each retry in seconds"
    );

    describe_counter!(
        "ingest_tasks_exhausted_total",
        Unit::Count,
        "Intervals that failed permanently"
    );

    describe_counter!(
        "ingest_records_written_total",
        Unit::Count,
        "Records written to raw interval files"
    );

    describe_counter!(
        "ingest_records_compacted_total",
        Unit::Count,
        "Records appended to the consolidated dataset"
    );

    describe_counter!(
        "ingest_runs_total",
        Unit::Count,
        "Completed runs by outcome"
    );

    describe_histogram!(
        "ingest_run_duration_seconds",
        Unit::Seconds,
        "Duration of a whole run in seconds"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one fetch attempt (1-based)
pub fn record_fetch_attempt(attempt: u32) {
    let kind = if attempt <= 1 { "initial" } else { "retry" };
    counter!("ingest_fetch_attempts_total", "kind" => kind).increment(1);
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration) {
    counter!("ingest_retries_total").increment(1);
    histogram!("ingest_retry_backoff_seconds").record(duration.as_secs_f64());

    debug!(backoff_ms = duration.as_millis(), "Retry backoff recorded");
}

/// Record an interval whose retry budget ran out
pub fn record_task_exhausted() {
    counter!("ingest_tasks_exhausted_total").increment(1);
}

/// Record records written to a raw file
pub fn record_records_written(count: usize) {
    counter!("ingest_records_written_total").increment(count as u64);
}

/// Record records appended by compaction
pub fn record_records_compacted(count: usize) {
    counter!("ingest_records_compacted_total").increment(count as u64);
}

/// Whole-run metrics helper
pub struct RunMetrics {
    run_id: String,
    start_time: Instant,
}

impl RunMetrics {
    /// Start tracking a run
    pub fn start(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a run that produced an artifact
    pub fn record_success(&self, intervals_failed: usize) {
        let duration = self.start_time.elapsed();
        let outcome = if intervals_failed == 0 { "complete" } else { "partial" };

        counter!("ingest_runs_total", "outcome" => outcome).increment(1);
        histogram!("ingest_run_duration_seconds").record(duration.as_secs_f64());

        debug!(
            run_id = %self.run_id,
            outcome,
            duration_secs = duration.as_secs(),
            "Run metrics recorded"
        );
    }

    /// Record a run that stopped with an error
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!("ingest_runs_total", "outcome" => "error").increment(1);
        histogram!("ingest_run_duration_seconds").record(duration.as_secs_f64());

        error!(
            run_id = %self.run_id,
            error = %error,
            duration_secs = duration.as_secs(),
            "Run failed"
        );
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
