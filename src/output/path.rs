//! Deterministic file naming
//!
//! Every interval owns a unique raw file name derived from the dataset name
//! and its boundaries, so concurrent fetches never share an output path:
//!
//! ```text
//! {raw_dir}/finance_complaint_2012-01-01_2012-02-01.json
//! {failed_dir}/finance_complaint_2012-01-01_2012-02-01.json
//! {feature_store}/finance_complaint.jsonl
//! ```

use crate::downloader::DownloadTask;
use crate::planner::DateInterval;
use std::path::{Path, PathBuf};

/// Extension of raw interval files
pub const RAW_FILE_EXTENSION: &str = "json";

/// Extension of the consolidated dataset
pub const DATASET_FILE_EXTENSION: &str = "jsonl";

/// Raw file name for one interval
pub fn raw_file_name(dataset_name: &str, interval: &DateInterval) -> String {
    format!(
        "{}_{}_{}.{RAW_FILE_EXTENSION}",
        sanitize_name(dataset_name),
        interval.start.format("%Y-%m-%d"),
        interval.end.format("%Y-%m-%d")
    )
}

/// Raw file path for one interval
pub fn raw_file_path(raw_dir: &Path, dataset_name: &str, interval: &DateInterval) -> PathBuf {
    raw_dir.join(raw_file_name(dataset_name, interval))
}

/// File name of the consolidated dataset
pub fn dataset_file_name(dataset_name: &str) -> String {
    format!("{}.{DATASET_FILE_EXTENSION}", sanitize_name(dataset_name))
}

/// Diagnostics path for a task, keyed by its output file name
pub fn diagnostics_path(failed_dir: &Path, task: &DownloadTask) -> PathBuf {
    let name = task.output_file_name().unwrap_or("unnamed_task");
    failed_dir.join(name)
}

/// Sanitize a dataset name for filesystem safety
///
/// Prevents path traversal by replacing `/`, `\`, `:` with `_` and `..` with `__`.
fn sanitize_name(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}
