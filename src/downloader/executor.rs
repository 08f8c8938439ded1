//! Fetch executor: one interval, bounded retries
//!
//! Each attempt is an explicit transition
//! `attempt(task) -> Success | Retry(task') | Exhausted(task)`; the loop in
//! [`FetchExecutor::fetch`] drives it with a strictly decreasing budget, so a
//! task with `retries_remaining = N` is attempted at most `N + 1` times.
//!
//! On failure, the raw body (when there is one) is archived under the
//! diagnostics directory, any partial output is removed, and the task waits
//! before retrying: the first integer in the body plus a small padding when
//! present, exponential backoff otherwise. Sleeps are per task, so one
//! throttled interval never blocks others running concurrently.

use super::rate_limit::{BackoffSource, RetryPolicy};
use super::task::{AttemptOutcome, DownloadTask, FailedTask, FetchOutcome};
use super::DownloadError;
use crate::fetcher::parser::unwrap_records;
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, RecordSource};
use crate::output::{diagnostics_path, raw};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default envelope field wrapping each record
pub const DEFAULT_ENVELOPE_FIELD: &str = "_source";

/// Failure of a single attempt, with the body kept for hints and diagnostics
#[derive(Debug)]
struct AttemptFailure {
    error: DownloadError,
    kind: RetryErrorType,
    body: Option<String>,
}

impl AttemptFailure {
    fn transport(err: FetcherError) -> Self {
        Self {
            kind: RetryErrorType::from_fetcher_error(&err),
            error: DownloadError::NetworkError(err.to_string()),
            body: None,
        }
    }
}

/// Performs fetch-and-persist for one task at a time
pub struct FetchExecutor {
    source: Arc<dyn RecordSource>,
    failed_dir: PathBuf,
    envelope_field: Option<String>,
    policy: RetryPolicy,
}

impl FetchExecutor {
    /// Create an executor archiving failing responses under `failed_dir`
    pub fn new(source: Arc<dyn RecordSource>, failed_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            failed_dir: failed_dir.into(),
            envelope_field: Some(DEFAULT_ENVELOPE_FIELD.to_string()),
            policy: RetryPolicy::default(),
        }
    }

    /// Set the envelope field; `None` keeps whole records
    pub fn with_envelope_field(mut self, envelope_field: Option<String>) -> Self {
        self.envelope_field = envelope_field;
        self
    }

    /// Override the retry delay policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Diagnostics directory
    pub fn failed_dir(&self) -> &Path {
        &self.failed_dir
    }

    /// Fetch a task to completion or exhaustion. Never returns an error:
    /// permanent failure is reported as [`FetchOutcome::Failed`].
    pub async fn fetch(&self, task: DownloadTask) -> FetchOutcome {
        let max_attempts = task.retries_remaining.saturating_add(1);
        let mut current = task;
        let mut attempts: u32 = 0;
        let mut waited = Duration::ZERO;

        info!(url = %current.source_url, output = %current.output_path.display(), "Starting download");

        loop {
            attempts += 1;
            crate::metrics::record_fetch_attempt(attempts);

            let failure = match self.try_once(&current).await {
                Ok(records) => {
                    if attempts > 1 {
                        info!(attempts, output = %current.output_path.display(), "Retry succeeded");
                    }
                    return FetchOutcome::Written {
                        path: current.output_path.clone(),
                        records,
                        attempts,
                    };
                }
                Err(failure) => failure,
            };

            let next = match self.after_failure(current, &failure) {
                Ok(next) => next,
                Err(last) => return self.exhausted(last, attempts, max_attempts, &failure),
            };

            let (delay, source) = self.policy.delay_for(attempts - 1, failure.body.as_deref());
            if !self.policy.within_deadline(waited, delay) {
                warn!(
                    waited_secs = waited.as_secs(),
                    next_delay_secs = delay.as_secs(),
                    "Retry deadline reached, giving up on interval"
                );
                return self.exhausted(next, attempts, max_attempts, &failure);
            }

            let ctx = RetryContext {
                attempt: attempts,
                max_attempts,
                error_type: failure.kind,
                backoff_duration: delay,
                interval: next.interval,
                error_message: failure.error.to_string(),
                url: next.source_url.clone(),
            };
            warn!(
                error = %failure.error,
                retries_remaining = next.retries_remaining,
                hinted = matches!(source, BackoffSource::Hint(_)),
                "{}",
                ctx.format_retry()
            );
            crate::metrics::record_retry_backoff(delay);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            waited = waited.saturating_add(delay);
            current = next;
        }
    }

    /// One attempt as an explicit state transition
    pub async fn attempt(&self, task: DownloadTask) -> AttemptOutcome {
        match self.try_once(&task).await {
            Ok(records) => AttemptOutcome::Success {
                path: task.output_path.clone(),
                records,
            },
            Err(failure) => match self.after_failure(task, &failure) {
                Ok(next) => AttemptOutcome::Retry(next),
                Err(last) => AttemptOutcome::Exhausted(last),
            },
        }
    }

    /// Archive the failing body, drop partial output, then derive the next
    /// task (`Ok`) or hand back the spent one (`Err`)
    fn after_failure(
        &self,
        task: DownloadTask,
        failure: &AttemptFailure,
    ) -> Result<DownloadTask, DownloadTask> {
        raw::remove_partial(&task.output_path);
        if let Some(body) = &failure.body {
            self.archive_response(&task, body);
        }
        task.retried().ok_or(task)
    }

    fn exhausted(
        &self,
        task: DownloadTask,
        attempts: u32,
        max_attempts: u32,
        failure: &AttemptFailure,
    ) -> FetchOutcome {
        let ctx = RetryContext {
            attempt: attempts,
            max_attempts,
            error_type: failure.kind,
            backoff_duration: Duration::ZERO,
            interval: task.interval,
            error_message: failure.error.to_string(),
            url: task.source_url.clone(),
        };
        error!("{}", ctx.format_failure());
        crate::metrics::record_task_exhausted();

        let exhausted = DownloadError::RetryExhausted {
            url: task.source_url.clone(),
            attempts,
        };
        debug!(error = %exhausted, "Recording permanently failed task");

        FetchOutcome::Failed(FailedTask {
            task,
            attempts,
            last_error: failure.error.to_string(),
        })
    }

    async fn try_once(&self, task: &DownloadTask) -> Result<usize, AttemptFailure> {
        let response = self
            .source
            .get(&task.source_url)
            .await
            .map_err(AttemptFailure::transport)?;

        if !response.is_success() {
            return Err(AttemptFailure {
                error: DownloadError::NetworkError(format!("HTTP status {}", response.status)),
                kind: RetryErrorType::from_status(response.status),
                body: Some(response.body),
            });
        }

        let records = match unwrap_records(&response.body, self.envelope_field.as_deref()) {
            Ok(records) => records,
            Err(e) => {
                return Err(AttemptFailure {
                    error: DownloadError::MalformedResponse(e.to_string()),
                    kind: RetryErrorType::MalformedResponse,
                    body: Some(response.body),
                })
            }
        };

        info!(
            output = %task.output_path.display(),
            records = records.len(),
            "Writing downloaded records"
        );

        let written = match raw::write_records(&task.output_path, &records) {
            Ok(written) => written,
            Err(e) => {
                return Err(AttemptFailure {
                    error: DownloadError::FilesystemError(e.to_string()),
                    kind: RetryErrorType::Filesystem,
                    body: Some(response.body),
                })
            }
        };
        crate::metrics::record_records_written(written);
        Ok(written)
    }

    fn archive_response(&self, task: &DownloadTask, body: &str) {
        let path = diagnostics_path(&self.failed_dir, task);
        let result = std::fs::create_dir_all(&self.failed_dir).and_then(|_| std::fs::write(&path, body));
        match result {
            Ok(()) => debug!(path = %path.display(), "Archived failing response"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to archive failing response"),
        }
    }
}
