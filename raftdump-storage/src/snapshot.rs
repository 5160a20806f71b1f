//! Snapshot storage.
//!
//! Snapshot files are named `<term:016x>-<index:016x>.snap` and hold a
//! CRC32C of the body (4 bytes, big-endian) followed by the JSON body.

use crate::error::StorageError;
use raftdump_protocol::Snapshot;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// File extension of snapshot files.
pub const SNAPSHOT_SUFFIX: &str = ".snap";

const CRC_SIZE: usize = 4;

/// Snapshot file name for a (term, index) position.
pub fn snapshot_filename(term: u64, index: u64) -> String {
    format!("{:016x}-{:016x}{}", term, index, SNAPSHOT_SUFFIX)
}

/// Reads and writes snapshots in one directory.
pub struct Snapshotter {
    dir: PathBuf,
}

impl Snapshotter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a snapshot and returns its path.
    pub fn save(&self, snapshot: &Snapshot) -> Result<PathBuf, StorageError> {
        fs::create_dir_all(&self.dir)?;

        let body = serde_json::to_vec(snapshot)?;
        let crc = crc32c::crc32c(&body);

        let path = self.dir.join(snapshot_filename(
            snapshot.metadata.term,
            snapshot.metadata.index,
        ));
        let mut file = File::create(&path)?;
        file.write_all(&crc.to_be_bytes())?;
        file.write_all(&body)?;
        file.sync_all()?;

        tracing::debug!(
            "Saved snapshot term={} index={} to {}",
            snapshot.metadata.term,
            snapshot.metadata.index,
            path.display()
        );

        Ok(path)
    }

    /// Loads the newest snapshot that reads cleanly.
    ///
    /// Unreadable files are skipped. Returns [`StorageError::NoSnapshot`]
    /// when nothing usable exists.
    pub fn load(&self) -> Result<Snapshot, StorageError> {
        for name in self.snap_names()?.iter().rev() {
            let path = self.dir.join(name);
            match Self::read(&path) {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) => tracing::warn!("Skipping unreadable snapshot {}: {}", name, e),
            }
        }
        Err(StorageError::NoSnapshot)
    }

    /// Reads one snapshot file.
    pub fn read(path: &Path) -> Result<Snapshot, StorageError> {
        let data = fs::read(path)?;
        if data.len() <= CRC_SIZE {
            return Err(StorageError::EmptySnapshot(path.to_path_buf()));
        }

        let (crc, body) = data.split_at(CRC_SIZE);
        let expected = u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]]);
        let actual = crc32c::crc32c(body);
        if expected != actual {
            return Err(StorageError::CrcMismatch {
                path: path.to_path_buf(),
                expected,
                actual,
            });
        }

        Ok(serde_json::from_slice(body)?)
    }

    /// Lists snapshot file names, oldest first. A missing directory has none.
    pub fn snap_names(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.ends_with(SNAPSHOT_SUFFIX) {
                names.push(name);
            } else {
                tracing::debug!("Ignoring non-snapshot file {}", name);
            }
        }

        names.sort();
        Ok(names)
    }
}
