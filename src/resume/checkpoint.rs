//! Checkpoint record for resumable ingestion

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Durable marker of ingestion progress
///
/// `dataset_path` references a dataset holding every record ingested up to
/// `to_date`. A later run resumes from `to_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Start of the range covered by the run that wrote this record
    pub from_date: NaiveDate,
    /// Date ingestion has progressed to
    pub to_date: NaiveDate,
    /// Consolidated dataset
    #[serde(rename = "data_file_path")]
    pub dataset_path: PathBuf,
}

impl CheckpointRecord {
    /// Create a record
    pub fn new(from_date: NaiveDate, to_date: NaiveDate, dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            from_date,
            to_date,
            dataset_path: dataset_path.into(),
        }
    }
}
