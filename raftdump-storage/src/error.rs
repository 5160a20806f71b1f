//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no available snapshot")]
    NoSnapshot,

    #[error("snapshot file {} is empty", .0.display())]
    EmptySnapshot(PathBuf),

    #[error("snapshot {} checksum mismatch (expected {expected:08x}, got {actual:08x})", path.display())]
    CrcMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
    },
}

impl StorageError {
    /// No snapshot exists; callers start from the beginning of the log.
    pub fn is_no_snapshot(&self) -> bool {
        matches!(self, StorageError::NoSnapshot)
    }
}
