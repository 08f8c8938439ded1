//! Checkpoint persistence
//!
//! The metadata store holds exactly one [`CheckpointRecord`] in a YAML file.
//! Writes are atomic (temp file, fsync, rename, fsync of the parent
//! directory) under an exclusive advisory lock on a sibling `.lock` file;
//! reads take the shared lock. A missing file means "first run"; a file
//! that cannot be read or parsed is reported, never treated as missing.

use super::checkpoint::CheckpointRecord;
use fd_lock::RwLock;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum allowed checkpoint file size (64 KB); anything larger is not a checkpoint
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 64 * 1024;

/// Errors related to checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// Checkpoint exists but cannot be used
    #[error("checkpoint {path} is corrupt: {reason}")]
    CheckpointCorrupt {
        /// Checkpoint file
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}

/// Durable single-record checkpoint store
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Store backed by the YAML file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn open_lock_file(&self) -> Result<File, ResumeError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ResumeError::IoError(e.to_string()))?;
            }
        }
        let lock_path = self.path.with_extension("lock");
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ResumeError::LockError(format!("Failed to create lock file: {e}")))
    }

    /// Read the checkpoint, `Ok(None)` when none has been written yet
    pub fn read(&self) -> Result<Option<CheckpointRecord>, ResumeError> {
        if !self.exists() {
            debug!(path = %self.path.display(), "No checkpoint found");
            return Ok(None);
        }

        let lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock
            .read()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let corrupt = |reason: String| ResumeError::CheckpointCorrupt {
            path: self.path.display().to_string(),
            reason,
        };

        let metadata = std::fs::metadata(&self.path).map_err(|e| corrupt(e.to_string()))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(corrupt(format!(
                "file too large: {} bytes (max: {MAX_CHECKPOINT_FILE_SIZE} bytes)",
                metadata.len()
            )));
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| corrupt(e.to_string()))?;
        let record: CheckpointRecord = serde_yaml::from_str(&contents).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to parse checkpoint");
            corrupt(e.to_string())
        })?;

        if record.from_date > record.to_date {
            return Err(corrupt(format!(
                "from_date {} is after to_date {}",
                record.from_date, record.to_date
            )));
        }

        info!(
            path = %self.path.display(),
            from_date = %record.from_date,
            to_date = %record.to_date,
            "Checkpoint loaded"
        );
        Ok(Some(record))
    }

    /// Atomically replace the checkpoint
    pub fn write(&self, record: &CheckpointRecord) -> Result<(), ResumeError> {
        let yaml = serde_yaml::to_string(record)
            .map_err(|e| ResumeError::SerializationError(e.to_string()))?;

        let mut lock = RwLock::new(self.open_lock_file()?);
        let _guard = lock
            .write()
            .map_err(|e| ResumeError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let parent_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp_file = tempfile::NamedTempFile::new_in(parent_dir)
            .map_err(|e| ResumeError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(yaml.as_bytes())
            .map_err(|e| ResumeError::IoError(format!("Failed to write to temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| ResumeError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| ResumeError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| ResumeError::IoError(format!("Failed to persist temp file: {e}")))?;

        if let Ok(dir) = File::open(parent_dir) {
            let _ = dir.sync_all();
        }

        info!(
            path = %self.path.display(),
            from_date = %record.from_date,
            to_date = %record.to_date,
            dataset = %record.dataset_path.display(),
            "Checkpoint saved"
        );
        Ok(())
    }
}
