//! Ingestion runs end to end
//!
//! A run moves through `RESOLVE_RANGE -> FETCH -> COMPACT -> CHECKPOINT -> DONE`:
//!
//! - [`run::IngestionRun`] resolves the date range against the checkpoint and
//!   lays out the run's directories
//! - [`controller::RunController`] drives the orchestrator, the compactor and
//!   the metadata store, and returns an [`IngestionArtifact`]
//!
//! Any [`PipelineError`] aborts the run before the checkpoint is touched.

use crate::downloader::FailedTask;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;

pub mod controller;
pub mod run;

pub use controller::RunController;
pub use run::IngestionRun;

/// Run-level failure
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Configuration or requested range is unusable
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Checkpoint exists but cannot be read
    #[error("checkpoint corrupt: {0}")]
    CheckpointCorrupt(String),

    /// Compaction failed; the previous dataset is intact
    #[error("compaction failed: {0}")]
    Compaction(String),

    /// Directory, lock or checkpoint write failure
    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl From<crate::config::ConfigError> for PipelineError {
    fn from(err: crate::config::ConfigError) -> Self {
        PipelineError::ConfigInvalid(err.to_string())
    }
}

impl From<crate::planner::PlanError> for PipelineError {
    fn from(err: crate::planner::PlanError) -> Self {
        PipelineError::ConfigInvalid(err.to_string())
    }
}

impl From<crate::resume::ResumeError> for PipelineError {
    fn from(err: crate::resume::ResumeError) -> Self {
        match err {
            crate::resume::ResumeError::CheckpointCorrupt { .. } => {
                PipelineError::CheckpointCorrupt(err.to_string())
            }
            other => PipelineError::Filesystem(other.to_string()),
        }
    }
}

impl From<crate::output::OutputError> for PipelineError {
    fn from(err: crate::output::OutputError) -> Self {
        PipelineError::Compaction(err.to_string())
    }
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct IngestionArtifact {
    /// Run identifier
    pub run_id: String,
    /// Consolidated dataset
    pub dataset_path: PathBuf,
    /// This run's staging directory
    pub raw_dir: PathBuf,
    /// Checkpoint file
    pub checkpoint_path: PathBuf,
    /// Resolved range start
    pub from_date: NaiveDate,
    /// Resolved range end
    pub to_date: NaiveDate,
    /// Intervals planned for the range
    pub intervals_planned: usize,
    /// Intervals written to raw files
    pub intervals_written: usize,
    /// Number of permanently failed intervals
    pub failed_count: usize,
    /// Permanently failed intervals
    pub failed_tasks: Vec<FailedTask>,
    /// Intervals skipped because of shutdown
    pub cancelled: usize,
    /// Records appended to the dataset
    pub records_compacted: usize,
    /// Date the checkpoint now points at, when it was written
    pub checkpoint_to_date: Option<NaiveDate>,
}

impl IngestionArtifact {
    /// Whether every planned interval landed in the dataset
    pub fn is_complete(&self) -> bool {
        self.failed_count == 0 && self.cancelled == 0
    }
}
