//! Ingestion orchestration over a planned date range
//!
//! Plans the intervals of one range, builds one [`DownloadTask`] per interval
//! and drives the [`FetchExecutor`] over them with bounded concurrency. A
//! failing interval never aborts the others; permanent failures come back in
//! the [`OrchestrationReport`] as values.

use super::executor::FetchExecutor;
use super::task::{DownloadTask, FailedTask, FetchOutcome};
use crate::output::path::raw_file_path;
use crate::planner::{plan_intervals, DateInterval, PlanError};
use crate::shutdown::{self, SharedShutdown};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Placeholder replaced by an interval's start date
pub const FROM_DATE_PLACEHOLDER: &str = "<fromdate>";

/// Placeholder replaced by an interval's end date
pub const TO_DATE_PLACEHOLDER: &str = "<todate>";

/// Substitute both date placeholders of a URL template
pub fn render_url(template: &str, interval: &DateInterval) -> String {
    template
        .replace(FROM_DATE_PLACEHOLDER, &interval.start.format("%Y-%m-%d").to_string())
        .replace(TO_DATE_PLACEHOLDER, &interval.end.format("%Y-%m-%d").to_string())
}

/// One orchestration pass
#[derive(Debug, Clone)]
pub struct IntervalRequest {
    /// Range start
    pub from_date: NaiveDate,
    /// Range end
    pub to_date: NaiveDate,
    /// Source URL with `<fromdate>`/`<todate>` placeholders
    pub url_template: String,
    /// Staging directory for raw interval files
    pub raw_dir: PathBuf,
    /// Dataset name used in raw file names
    pub file_name: String,
    /// Retry budget given to every task
    pub retries: u32,
}

/// Raw file produced for one interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenInterval {
    /// Interval covered
    pub interval: DateInterval,
    /// Raw file
    pub path: PathBuf,
    /// Records written
    pub records: usize,
    /// Attempts it took
    pub attempts: u32,
}

/// Outcome of one orchestration pass
#[derive(Debug, Clone, Default)]
pub struct OrchestrationReport {
    /// Number of intervals planned
    pub intervals_planned: usize,
    /// Raw files written, in interval order
    pub written: Vec<WrittenInterval>,
    /// Permanently failed tasks, in interval order
    pub failed_tasks: Vec<FailedTask>,
    /// Intervals skipped because shutdown was requested before they started
    pub cancelled: Vec<DateInterval>,
    /// End of the longest run of successful intervals starting at `from_date`
    pub completed_through: Option<NaiveDate>,
}

impl OrchestrationReport {
    /// Raw files inside `[from_date, completed_through]`, in interval order.
    ///
    /// Files written after a failed or cancelled interval are excluded; the
    /// next run starts at the gap and fetches them again.
    pub fn checkpointed_paths(&self) -> Vec<PathBuf> {
        let Some(through) = self.completed_through else {
            return Vec::new();
        };
        self.written
            .iter()
            .filter(|w| w.interval.end <= through)
            .map(|w| w.path.clone())
            .collect()
    }

    /// Whether every planned interval was written
    pub fn is_complete(&self) -> bool {
        self.failed_tasks.is_empty() && self.cancelled.is_empty()
    }
}

enum IntervalResult {
    Written(WrittenInterval),
    Failed(FailedTask),
    Cancelled(DateInterval),
}

/// Drives the fetch executor over every interval of a range
pub struct IngestionOrchestrator {
    executor: FetchExecutor,
    concurrency: usize,
    shutdown: Option<SharedShutdown>,
}

impl IngestionOrchestrator {
    /// Sequential orchestrator picking up the global shutdown handle if registered
    pub fn new(executor: FetchExecutor) -> Self {
        Self {
            executor,
            concurrency: super::config::DEFAULT_CONCURRENCY,
            shutdown: shutdown::get_global_shutdown(),
        }
    }

    /// Number of intervals fetched at once (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Attach a shared shutdown handle for graceful cancellation.
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|s| s.is_shutdown_requested())
            .unwrap_or(false)
    }

    /// Fetch every planned interval of `request`
    pub async fn run(&self, request: &IntervalRequest) -> Result<OrchestrationReport, PlanError> {
        let intervals = plan_intervals(request.from_date, request.to_date)?;
        let mut report = OrchestrationReport {
            intervals_planned: intervals.len(),
            ..OrchestrationReport::default()
        };

        if intervals.is_empty() {
            info!(from = %request.from_date, to = %request.to_date, "Empty range, nothing to fetch");
            report.completed_through = Some(request.to_date);
            return Ok(report);
        }

        info!(
            intervals = intervals.len(),
            concurrency = self.concurrency,
            from = %request.from_date,
            to = %request.to_date,
            "Processing intervals"
        );

        let mut results: Vec<(usize, IntervalResult)> = stream::iter(intervals.into_iter().enumerate())
            .map(|(index, interval)| {
                let task = DownloadTask::new(
                    render_url(&request.url_template, &interval),
                    raw_file_path(&request.raw_dir, &request.file_name, &interval),
                    request.retries,
                )
                .with_interval(interval);

                async move {
                    if self.shutdown_requested() {
                        return (index, IntervalResult::Cancelled(interval));
                    }
                    info!(interval = %interval, "Processing interval");
                    let result = match self.executor.fetch(task).await {
                        FetchOutcome::Written {
                            path,
                            records,
                            attempts,
                        } => IntervalResult::Written(WrittenInterval {
                            interval,
                            path,
                            records,
                            attempts,
                        }),
                        FetchOutcome::Failed(failed) => IntervalResult::Failed(failed),
                    };
                    (index, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);

        let mut prefix_intact = true;
        let mut completed_through = request.from_date;
        for (_, result) in results {
            match result {
                IntervalResult::Written(written) => {
                    if prefix_intact {
                        completed_through = written.interval.end;
                    }
                    report.written.push(written);
                }
                IntervalResult::Failed(failed) => {
                    prefix_intact = false;
                    report.failed_tasks.push(failed);
                }
                IntervalResult::Cancelled(interval) => {
                    prefix_intact = false;
                    report.cancelled.push(interval);
                }
            }
        }
        report.completed_through = Some(completed_through);

        if !report.cancelled.is_empty() {
            warn!(
                skipped = report.cancelled.len(),
                "Shutdown requested, remaining intervals skipped"
            );
        }
        if !report.failed_tasks.is_empty() {
            warn!(
                failed = report.failed_tasks.len(),
                "Some intervals failed permanently"
            );
        }
        info!(
            written = report.written.len(),
            failed = report.failed_tasks.len(),
            cancelled = report.cancelled.len(),
            completed_through = %completed_through,
            "Orchestration finished"
        );

        Ok(report)
    }
}
