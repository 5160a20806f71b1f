//! Dump error types.

use raftdump_storage::StorageError;
use raftdump_wal::WalError;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that abort a dump.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("failed loading snapshot: {0}")]
    Snapshot(#[source] StorageError),

    #[error("failed opening WAL: {0}")]
    OpenWal(#[source] WalError),

    #[error("failed reading WAL: {0}")]
    ReadWal(#[source] WalError),

    #[error("failed to start stream decoder '{command}': {source}")]
    DecoderSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stream decoder closed its output before answering entry {index}")]
    DecoderEof { index: u64 },

    #[error("stream decoder I/O error: {0}")]
    DecoderIo(#[source] std::io::Error),

    #[error("stream decoder exited with {0}")]
    DecoderExit(ExitStatus),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl DumpError {
    /// Returns whether the error was caused by the invocation itself.
    pub fn is_usage(&self) -> bool {
        matches!(self, DumpError::InvalidOptions(_))
    }
}
