//! WAL error types.

use crate::reader::WalContents;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record corrupted at offset {offset}: CRC mismatch (expected {expected:#x}, got {actual:#x})")]
    CorruptedRecord {
        offset: u64,
        expected: u32,
        actual: u32,
    },

    #[error("invalid record header at offset {offset}: {reason}")]
    InvalidHeader { offset: u64, reason: String },

    #[error("record too large: {size} bytes (max {max})")]
    RecordTooLarge { size: usize, max: usize },

    #[error("no WAL segment covers index {index} in {}", dir.display())]
    FileNotFound { dir: PathBuf, index: u64 },

    #[error("WAL segment sequence gap: expected {expected}, found {found}")]
    SequenceGap { expected: u64, found: u64 },

    #[error("conflicting metadata found in WAL")]
    MetadataConflict,

    #[error("snapshot not found in WAL (index {index}, term {term})")]
    SnapshotNotFound { index: u64, term: u64 },

    #[error("snapshot mismatch at index {index}: expected term {expected}, found {found}")]
    SnapshotMismatch { index: u64, expected: u64, found: u64 },

    #[error("slice out of range: resume index {resume_index}, entry index {index}, {len} entries read")]
    SliceOutOfRange {
        resume_index: u64,
        index: u64,
        len: usize,
    },

    #[error("record decode error: {0}")]
    Protocol(#[from] raftdump_protocol::ProtocolError),
}

impl WalError {
    /// The WAL has a gap after the entries read so far.
    pub fn is_slice_out_of_range(&self) -> bool {
        matches!(self, WalError::SliceOutOfRange { .. })
    }

    /// The resume point has no snapshot marker in the WAL.
    pub fn is_snapshot_not_found(&self) -> bool {
        matches!(self, WalError::SnapshotNotFound { .. })
    }
}

/// A read-all failure together with everything read before it.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct PartialRead {
    pub contents: WalContents,
    pub source: WalError,
}

impl PartialRead {
    pub fn new(contents: WalContents, source: WalError) -> Self {
        Self { contents, source }
    }
}
