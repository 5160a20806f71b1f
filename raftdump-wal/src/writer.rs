//! WAL writer.
//!
//! Produces the same layout the reader consumes. A new WAL starts with a
//! metadata record and a snapshot marker at (0, 0); each cut segment
//! repeats the metadata and the latest hard state.

use crate::error::WalError;
use crate::record::{RecordType, WalRecord};
use crate::segment::{Segment, SegmentName};
use crate::DEFAULT_SEGMENT_SIZE;
use bytes::Bytes;
use raftdump_protocol::{Entry, HardState, Metadata, WalSnapshot};
use std::path::{Path, PathBuf};

/// Appends records to a WAL directory.
pub struct WalWriter {
    dir: PathBuf,
    segment: Segment,
    metadata: Metadata,
    state: HardState,
    last_index: u64,
    next_sequence: u64,
    segment_size: u64,
}

impl WalWriter {
    /// Creates a new WAL in `dir`. Fails if a segment already exists.
    pub fn create(dir: impl AsRef<Path>, metadata: &Metadata) -> Result<Self, WalError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let segment = Segment::create(&dir, SegmentName::new(0, 0))?;
        let mut writer = Self {
            dir,
            segment,
            metadata: *metadata,
            state: HardState::default(),
            last_index: 0,
            next_sequence: 1,
            segment_size: DEFAULT_SEGMENT_SIZE,
        };

        writer.append(RecordType::Metadata, Bytes::from(metadata.encode()?))?;
        writer.append(RecordType::Snapshot, WalSnapshot::default().encode())?;

        tracing::debug!("Created WAL at {}", writer.dir.display());
        Ok(writer)
    }

    /// Sets the size at which `save_entries` starts a new segment.
    pub fn with_segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    /// Appends entries, cutting a new segment once the current one is full.
    pub fn save_entries(&mut self, entries: &[Entry]) -> Result<(), WalError> {
        for entry in entries {
            self.append(RecordType::Entry, entry.encode())?;
            self.last_index = entry.index;
            if self.segment.size() >= self.segment_size {
                self.cut()?;
            }
        }
        Ok(())
    }

    pub fn save_state(&mut self, state: &HardState) -> Result<(), WalError> {
        self.state = *state;
        self.append(RecordType::State, state.encode())?;
        Ok(())
    }

    pub fn save_snapshot(&mut self, snapshot: WalSnapshot) -> Result<(), WalError> {
        self.append(RecordType::Snapshot, snapshot.encode())?;
        if snapshot.index > self.last_index {
            self.last_index = snapshot.index;
        }
        Ok(())
    }

    /// Closes the current segment and starts the next one.
    pub fn cut(&mut self) -> Result<(), WalError> {
        self.segment.sync()?;

        let name = SegmentName::new(self.segment.name().seq + 1, self.last_index + 1);
        self.segment = Segment::create(&self.dir, name)?;

        self.append(RecordType::Metadata, Bytes::from(self.metadata.encode()?))?;
        let state = self.state;
        self.append(RecordType::State, state.encode())?;

        tracing::debug!("Cut WAL segment {}", name.filename());
        Ok(())
    }

    pub fn sync(&mut self) -> Result<(), WalError> {
        self.segment.sync()
    }

    /// Path of the segment currently being written.
    pub fn current_segment(&self) -> &Path {
        self.segment.path()
    }

    fn append(&mut self, record_type: RecordType, payload: Bytes) -> Result<(), WalError> {
        let record = WalRecord::new(record_type, self.next_sequence, payload);
        self.segment.append(&record)?;
        self.next_sequence += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentScanner;
    use tempfile::TempDir;

    #[test]
    fn test_create_writes_header_records() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(7, 8)).unwrap();
        writer.sync().unwrap();

        let records = Segment::read_all(writer.current_segment()).unwrap();
        let types: Vec<RecordType> = records.iter().map(|(_, r)| r.header.record_type).collect();
        assert_eq!(types, vec![RecordType::Metadata, RecordType::Snapshot]);
    }

    #[test]
    fn test_create_twice_fails() {
        let dir = TempDir::new().unwrap();
        WalWriter::create(dir.path(), &Metadata::new(1, 1)).unwrap();
        assert!(WalWriter::create(dir.path(), &Metadata::new(1, 1)).is_err());
    }

    #[test]
    fn test_segment_rotation() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 1))
            .unwrap()
            .with_segment_size(256);

        let entries: Vec<Entry> = (1..=20)
            .map(|i| Entry::normal(1, i, vec![b'x'; 32]))
            .collect();
        writer.save_entries(&entries).unwrap();
        writer.sync().unwrap();

        let segments = SegmentScanner::list_segments(dir.path()).unwrap();
        assert!(segments.len() > 1, "expected rotation, got {:?}", segments);
        assert!(SegmentScanner::check_sequence(&segments).is_ok());
        assert!(segments.windows(2).all(|w| w[0].index < w[1].index));
    }
}
