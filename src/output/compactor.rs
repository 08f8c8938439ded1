//! Compaction of raw interval files into the consolidated dataset
//!
//! The dataset is a JSON Lines file. Compaction reads every raw file of one
//! run's staging directory (in file-name order), skips empty ones, and
//! appends their records. The new dataset is assembled in a temp file next
//! to the target (existing lines first, then the new records) and renamed
//! into place, so a failed compaction leaves the previous dataset intact.
//!
//! Because only the current run's staging directory is read, running
//! compaction once per run never appends the same raw file twice. The run
//! controller goes further and passes [`Compactor::compact_files`] only the
//! files inside the checkpointed range, so intervals that will be fetched
//! again next run are never appended.

use super::raw::read_records;
use super::{OutputError, OutputResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of one compaction pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompactionSummary {
    /// Dataset path (returned even when nothing was written)
    pub output_path: PathBuf,
    /// Raw files that contributed records
    pub files_read: usize,
    /// Raw files skipped because they held zero records
    pub files_skipped_empty: usize,
    /// Records appended to the dataset
    pub records_appended: usize,
    /// Records dropped by key deduplication
    pub duplicates_skipped: usize,
}

/// Merges raw interval files into one dataset
#[derive(Debug, Clone, Default)]
pub struct Compactor {
    dedup_key: Option<String>,
}

impl Compactor {
    /// Plain append compactor
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip records whose `key` value already exists in the dataset or earlier in the pass
    pub fn with_dedup_key(mut self, key: Option<String>) -> Self {
        self.dedup_key = key;
        self
    }

    /// Compact every raw file under `raw_dir` into `output_path`.
    ///
    /// A missing `raw_dir`, or one holding only empty files, leaves
    /// `output_path` untouched (and uncreated).
    pub fn compact(&self, raw_dir: &Path, output_path: &Path) -> OutputResult<CompactionSummary> {
        if !raw_dir.exists() {
            debug!(raw_dir = %raw_dir.display(), "No staging directory, nothing to compact");
            return Ok(CompactionSummary {
                output_path: output_path.to_path_buf(),
                ..CompactionSummary::default()
            });
        }

        self.compact_files(&raw_files(raw_dir)?, output_path)
    }

    /// Compact the given raw files, in the order given, into `output_path`.
    ///
    /// Same append, skip and dedup rules as [`Compactor::compact`]; an empty
    /// list leaves `output_path` untouched.
    pub fn compact_files(
        &self,
        files: &[PathBuf],
        output_path: &Path,
    ) -> OutputResult<CompactionSummary> {
        let mut summary = CompactionSummary {
            output_path: output_path.to_path_buf(),
            ..CompactionSummary::default()
        };

        let mut seen = match &self.dedup_key {
            Some(key) => existing_keys(output_path, key)?,
            None => HashSet::new(),
        };

        let mut pending: Vec<Value> = Vec::new();
        for path in files {
            let records = read_records(path)?;
            if records.is_empty() {
                debug!(path = %path.display(), "Skipping empty raw file");
                summary.files_skipped_empty += 1;
                continue;
            }

            summary.files_read += 1;
            for record in records {
                if let Some(key) = &self.dedup_key {
                    if let Some(value) = key_of(&record, key) {
                        if !seen.insert(value) {
                            summary.duplicates_skipped += 1;
                            continue;
                        }
                    }
                }
                pending.push(record);
            }
        }

        if pending.is_empty() {
            info!(
                files = files.len(),
                skipped = summary.files_skipped_empty,
                "No records to compact"
            );
            return Ok(summary);
        }

        summary.records_appended = append_atomically(output_path, &pending)?;

        info!(
            output = %output_path.display(),
            files = summary.files_read,
            records = summary.records_appended,
            duplicates = summary.duplicates_skipped,
            "Compaction complete"
        );
        crate::metrics::record_records_compacted(summary.records_appended);

        Ok(summary)
    }
}

/// Regular files directly under `dir`, sorted by name
fn raw_files(dir: &Path) -> OutputResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| OutputError::io("failed to read directory", dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OutputError::io("failed to read entry in", dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Key value as a comparable string; strings are used verbatim, other values as JSON text
fn key_of(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn existing_keys(dataset: &Path, key: &str) -> OutputResult<HashSet<String>> {
    let mut keys = HashSet::new();
    if !dataset.exists() {
        return Ok(keys);
    }

    let file = File::open(dataset).map_err(|e| OutputError::io("failed to open", dataset, e))?;
    for line in BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file).lines() {
        let line = line.map_err(|e| OutputError::io("failed to read", dataset, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: Value =
            serde_json::from_str(&line).map_err(|e| OutputError::MalformedRawFile {
                path: dataset.display().to_string(),
                reason: e.to_string(),
            })?;
        if let Some(value) = key_of(&record, key) {
            keys.insert(value);
        }
    }
    debug!(dataset = %dataset.display(), keys = keys.len(), "Loaded existing dataset keys");
    Ok(keys)
}

fn append_atomically(output_path: &Path, records: &[Value]) -> OutputResult<usize> {
    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| OutputError::io("failed to create directory", parent, e))?;

    let temp_file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| OutputError::io("failed to create temp file in", parent, e))?;

    {
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, temp_file.as_file());

        if output_path.exists() {
            let mut existing = File::open(output_path)
                .map_err(|e| OutputError::io("failed to open", output_path, e))?;
            std::io::copy(&mut existing, &mut writer)
                .map_err(|e| OutputError::io("failed to copy", output_path, e))?;
        }

        for record in records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| OutputError::SerializationError(e.to_string()))?;
            writer
                .write_all(b"\n")
                .map_err(|e| OutputError::io("failed to write", output_path, e))?;
        }

        writer
            .flush()
            .map_err(|e| OutputError::io("failed to flush", output_path, e))?;
    }

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| OutputError::io("failed to sync", output_path, e))?;
    temp_file
        .persist(output_path)
        .map_err(|e| OutputError::io("failed to persist", output_path, e.error))?;

    Ok(records.len())
}

/// Count the records of a JSON Lines dataset
pub fn count_dataset_records(dataset: &Path) -> OutputResult<usize> {
    let file = File::open(dataset).map_err(|e| OutputError::io("failed to open", dataset, e))?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| OutputError::io("failed to read", dataset, e))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}
