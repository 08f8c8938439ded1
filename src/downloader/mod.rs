//! Interval fetching and orchestration
//!
//! This module provides the execution engine that turns a planned date range
//! into raw interval files, with bounded retries and rate-limit hint backoff.
//!
//! # Overview
//!
//! 1. **Tasks**: one [`task::DownloadTask`] per planned interval
//! 2. **Execution**: [`executor::FetchExecutor`] fetches, unwraps and persists a task,
//!    retrying on failure until the budget runs out
//! 3. **Backoff**: [`rate_limit::RetryPolicy`] honors wait hints found in
//!    failing bodies, exponential backoff otherwise
//! 4. **Orchestration**: [`orchestrator::IngestionOrchestrator`] runs the tasks of
//!    one range with bounded concurrency and collects the failures
//!
//! # Quick Start
//!
//! ```no_run
//! use finance_complaint_ingest::downloader::{FetchExecutor, IngestionOrchestrator, IntervalRequest};
//! use finance_complaint_ingest::fetcher::HttpSource;
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(HttpSource::new()?);
//! let executor = FetchExecutor::new(source, "./failed");
//! let orchestrator = IngestionOrchestrator::new(executor);
//!
//! let request = IntervalRequest {
//!     from_date: NaiveDate::from_ymd_opt(2011, 12, 1).unwrap(),
//!     to_date: NaiveDate::from_ymd_opt(2012, 6, 1).unwrap(),
//!     url_template: "https://example.test/api?min=<fromdate>&max=<todate>".to_string(),
//!     raw_dir: "./downloaded".into(),
//!     file_name: "finance_complaint".to_string(),
//!     retries: 5,
//! };
//! let report = orchestrator.run(&request).await?;
//! println!("{} intervals failed", report.failed_tasks.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! A failing interval never aborts its siblings. Permanent failures come back
//! as [`task::FailedTask`] values in the orchestration report; only an invalid
//! range is an error of the run itself.

pub mod config;
pub mod executor;
pub mod orchestrator;
pub mod rate_limit;
pub mod task;

pub use executor::FetchExecutor;
pub use orchestrator::{IngestionOrchestrator, IntervalRequest, OrchestrationReport};
pub use rate_limit::{BackoffSource, RetryPolicy};
pub use task::{AttemptOutcome, DownloadTask, FailedTask, FetchOutcome};

/// Failure of one fetch attempt, or of a task as a whole
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Transport failure or non-success status
    #[error("network error: {0}")]
    NetworkError(String),

    /// Body could not be unwrapped into records
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Raw file could not be written
    #[error("filesystem error: {0}")]
    FilesystemError(String),

    /// Retry budget spent
    #[error("retries exhausted for {url} after {attempts} attempts")]
    RetryExhausted {
        /// Source URL of the task
        url: String,
        /// Attempts made
        attempts: u32,
    },
}
