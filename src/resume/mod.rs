//! Resume capability across runs
//!
//! Provides the single durable checkpoint with atomic writes and file locking.

pub mod checkpoint;
pub mod store;

pub use checkpoint::CheckpointRecord;
pub use store::{MetadataStore, ResumeError};
