//! Raw interval files
//!
//! Each interval is persisted as a single JSON array. Writes go through a
//! temporary file in the target directory and are renamed into place, so a
//! reader either sees the complete array or no file at all.

use super::{OutputError, OutputResult};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Write `records` as a JSON array at `path`, creating the parent directory.
///
/// Returns the number of records written.
pub fn write_records(path: &Path, records: &[Value]) -> OutputResult<usize> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| OutputError::io("failed to create directory", parent, e))?;

    let temp_file = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| OutputError::io("failed to create temp file in", parent, e))?;

    {
        let mut writer = BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, temp_file.as_file());
        serde_json::to_writer(&mut writer, records)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| OutputError::io("failed to flush temp file for", path, e))?;
    }

    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| OutputError::io("failed to sync temp file for", path, e))?;
    temp_file
        .persist(path)
        .map_err(|e| OutputError::io("failed to persist", path, e.error))?;

    debug!(path = %path.display(), records = records.len(), "Raw file written");
    Ok(records.len())
}

/// Read a raw file back as a list of records
pub fn read_records(path: &Path) -> OutputResult<Vec<Value>> {
    let file = File::open(path).map_err(|e| OutputError::io("failed to open", path, e))?;
    let reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
    serde_json::from_reader(reader).map_err(|e| OutputError::MalformedRawFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Remove whatever is at `path`, ignoring a missing file
pub fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial output"),
    }
}
