//! Download task values and fetch outcomes

use crate::planner::DateInterval;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One interval to fetch and persist
///
/// Immutable apart from the retry budget, which only ever shrinks: a retried
/// task is a new value produced by [`DownloadTask::retried`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Fully substituted source URL
    pub source_url: String,
    /// Raw output file for this interval
    pub output_path: PathBuf,
    /// Retries left after the current attempt
    pub retries_remaining: u32,
    /// Interval this task covers, when built by the orchestrator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<DateInterval>,
}

impl DownloadTask {
    /// Create a task with a full retry budget
    pub fn new(source_url: impl Into<String>, output_path: impl Into<PathBuf>, retries: u32) -> Self {
        Self {
            source_url: source_url.into(),
            output_path: output_path.into(),
            retries_remaining: retries,
            interval: None,
        }
    }

    /// Attach the interval this task covers
    pub fn with_interval(mut self, interval: DateInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Derive the next attempt, or `None` once the budget is spent
    pub fn retried(&self) -> Option<Self> {
        let retries_remaining = self.retries_remaining.checked_sub(1)?;
        Some(Self {
            retries_remaining,
            ..self.clone()
        })
    }

    /// File name of the output, used to key diagnostics
    pub fn output_file_name(&self) -> Option<&str> {
        self.output_path.file_name().and_then(|name| name.to_str())
    }

    /// Output path as a `Path`
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Task whose retry budget ran out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedTask {
    /// Task as it stood at the final attempt (`retries_remaining == 0` unless the deadline hit first)
    pub task: DownloadTask,
    /// Number of attempts made, initial one included
    pub attempts: u32,
    /// Message of the last failure
    pub last_error: String,
}

/// Result of one attempt
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Records written to the task's output path
    Success {
        /// Written file
        path: PathBuf,
        /// Records kept after envelope filtering
        records: usize,
    },
    /// Attempt failed; the carried task has a smaller budget
    Retry(DownloadTask),
    /// Attempt failed and no budget is left
    Exhausted(DownloadTask),
}

/// Final result of fetching one task, retries included
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Raw file written
    Written {
        /// Written file
        path: PathBuf,
        /// Records kept after envelope filtering
        records: usize,
        /// Attempts made, initial one included
        attempts: u32,
    },
    /// Task permanently failed
    Failed(FailedTask),
}

impl FetchOutcome {
    /// Whether the raw file was written
    pub fn is_written(&self) -> bool {
        matches!(self, FetchOutcome::Written { .. })
    }
}
