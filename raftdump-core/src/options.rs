//! Dump options.
//!
//! Built once from the command line and validated before any I/O.

use crate::error::DumpError;
use std::path::{Path, PathBuf};

/// Entry types dumped when none are requested.
pub const DEFAULT_ENTRY_TYPES: &str = "Normal,ConfigChange";

/// Everything a dump run needs to know.
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Member data directory.
    pub data_dir: PathBuf,
    /// WAL location overriding `<data_dir>/member/wal`.
    pub wal_dir: Option<PathBuf>,
    /// Snapshot file name (inside the snapshot directory) to start from.
    pub start_snapshot: Option<String>,
    /// First index to dump (inclusive).
    pub start_index: Option<u64>,
    /// Index to stop at (exclusive).
    pub end_index: Option<u64>,
    /// Comma-separated entry type tokens.
    pub entry_types: String,
    /// External decoder command line.
    pub stream_decoder: Option<String>,
    /// List raw WAL frames instead of classified entries.
    pub raw: bool,
}

impl DumpOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            wal_dir: None,
            start_snapshot: None,
            start_index: None,
            end_index: None,
            entry_types: DEFAULT_ENTRY_TYPES.to_string(),
            stream_decoder: None,
            raw: false,
        }
    }

    pub fn with_wal_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wal_dir = Some(dir.into());
        self
    }

    pub fn with_start_snapshot(mut self, name: impl Into<String>) -> Self {
        self.start_snapshot = Some(name.into());
        self
    }

    pub fn with_start_index(mut self, index: u64) -> Self {
        self.start_index = Some(index);
        self
    }

    pub fn with_end_index(mut self, index: u64) -> Self {
        self.end_index = Some(index);
        self
    }

    pub fn with_entry_types(mut self, entry_types: impl Into<String>) -> Self {
        self.entry_types = entry_types.into();
        self
    }

    pub fn with_stream_decoder(mut self, command: impl Into<String>) -> Self {
        self.stream_decoder = Some(command.into());
        self
    }

    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Checks flag combinations.
    pub fn validate(&self) -> Result<(), DumpError> {
        if self.start_snapshot.is_some() && self.start_index.is_some() {
            return Err(DumpError::InvalidOptions(
                "start-snap and start-index flags cannot be used together".to_string(),
            ));
        }

        if self.raw
            && (self.start_snapshot.is_some()
                || self.entry_types != DEFAULT_ENTRY_TYPES
                || self.decoder_command().is_some())
        {
            return Err(DumpError::InvalidOptions(
                "flags --start-snap, --entry-type and --stream-decoder are not supported in raw mode"
                    .to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (self.start_index, self.end_index) {
            if end < start {
                tracing::warn!("end-index {} is below start-index {}; nothing will match", end, start);
            }
        }

        Ok(())
    }

    /// The decoder command, if one is configured and non-blank.
    pub fn decoder_command(&self) -> Option<&str> {
        self.stream_decoder
            .as_deref()
            .map(str::trim)
            .filter(|cmd| !cmd.is_empty())
    }

    /// Directory holding WAL segments.
    pub fn wal_dir(&self) -> PathBuf {
        match &self.wal_dir {
            Some(dir) => dir.clone(),
            None => member_dir(&self.data_dir).join("wal"),
        }
    }

    /// Directory holding snapshot files.
    pub fn snap_dir(&self) -> PathBuf {
        member_dir(&self.data_dir).join("snap")
    }
}

fn member_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("member")
}
