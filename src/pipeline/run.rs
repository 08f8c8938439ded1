//! Range resolution and directory layout of one run
//!
//! ```text
//! {artifact_dir}/data_ingestion/meta_info.yaml
//! {artifact_dir}/data_ingestion/feature_store/{file_name}.jsonl
//! {artifact_dir}/data_ingestion/{run_id}/downloaded_files/
//! {artifact_dir}/data_ingestion/{run_id}/failed_downloaded_files/
//! ```

use super::PipelineError;
use crate::config::IngestionConfig;
use crate::output::dataset_file_name;
use crate::resume::CheckpointRecord;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory under the artifact root owned by ingestion
pub const DATA_INGESTION_DIR: &str = "data_ingestion";
/// Per-run staging directory name
pub const DOWNLOADED_DIR: &str = "downloaded_files";
/// Per-run diagnostics directory name
pub const FAILED_DIR: &str = "failed_downloaded_files";
/// Dataset directory name, shared across runs
pub const FEATURE_STORE_DIR: &str = "feature_store";
/// Checkpoint file name
pub const METADATA_FILE_NAME: &str = "meta_info.yaml";

/// New run identifier: UTC timestamp with milliseconds, safe in file names
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Checkpoint path for an artifact root
pub fn checkpoint_path(artifact_dir: &Path) -> PathBuf {
    artifact_dir.join(DATA_INGESTION_DIR).join(METADATA_FILE_NAME)
}

/// Configuration of one invocation, fixed for the run's lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionRun {
    /// Run identifier
    pub run_id: String,
    /// Resolved range start
    pub from_date: NaiveDate,
    /// Resolved range end
    pub to_date: NaiveDate,
    /// `{artifact_dir}/data_ingestion/{run_id}`
    pub working_dir: PathBuf,
    /// Diagnostics for failing responses
    pub failed_dir: PathBuf,
    /// Raw interval files of this run
    pub staging_dir: PathBuf,
    /// Consolidated dataset
    pub output_dataset_path: PathBuf,
    /// Checkpoint file
    pub checkpoint_path: PathBuf,
}

impl IngestionRun {
    /// Resolve the range to ingest and lay out the run's paths.
    ///
    /// The start is the checkpoint's `to_date` when one exists, otherwise the
    /// requested start, otherwise `min_start_date`, and never earlier than
    /// `min_start_date`. The end is the requested end or today (UTC). A start
    /// already at or past the end collapses to the empty range `[to, to]`.
    pub fn resolve(
        config: &IngestionConfig,
        requested_from: Option<NaiveDate>,
        requested_to: Option<NaiveDate>,
        checkpoint: Option<&CheckpointRecord>,
        run_id: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        if let (Some(from), Some(to)) = (requested_from, requested_to) {
            if from > to {
                return Err(PipelineError::ConfigInvalid(format!(
                    "from date {from} is after to date {to}"
                )));
            }
        }

        let to_date = requested_to.unwrap_or_else(|| Utc::now().date_naive());
        let mut from_date = checkpoint
            .map(|record| record.to_date)
            .or(requested_from)
            .unwrap_or(config.min_start_date)
            .max(config.min_start_date);

        if from_date > to_date {
            info!(from = %from_date, to = %to_date, "Nothing left to ingest in requested range");
            from_date = to_date;
        }

        let run_id = run_id.into();
        let master_dir = config.artifact_dir.join(DATA_INGESTION_DIR);
        let working_dir = master_dir.join(&run_id);

        Ok(Self {
            from_date,
            to_date,
            failed_dir: working_dir.join(FAILED_DIR),
            staging_dir: working_dir.join(DOWNLOADED_DIR),
            output_dataset_path: master_dir
                .join(FEATURE_STORE_DIR)
                .join(dataset_file_name(&config.file_name)),
            checkpoint_path: master_dir.join(METADATA_FILE_NAME),
            working_dir,
            run_id,
        })
    }

    /// Whether the resolved range is a single point
    pub fn is_noop(&self) -> bool {
        self.from_date == self.to_date
    }
}
