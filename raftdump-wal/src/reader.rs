//! Read-only WAL access.

use crate::error::{PartialRead, WalError};
use crate::record::{RecordType, WalRecord};
use crate::segment::{SegmentName, SegmentRecords, SegmentScanner};
use raftdump_protocol::{Entry, HardState, Metadata, WalSnapshot};
use std::path::{Path, PathBuf};

/// Everything read from the WAL after a resume point.
#[derive(Debug, Clone, Default)]
pub struct WalContents {
    /// Identity of the member that wrote the WAL.
    pub metadata: Option<Metadata>,
    /// Latest hard state seen.
    pub state: HardState,
    /// Entries after the resume point, in log order.
    pub entries: Vec<Entry>,
}

impl WalContents {
    pub fn last_index(&self) -> Option<u64> {
        self.entries.last().map(|e| e.index)
    }
}

/// WAL reader positioned at a resume point.
pub struct WalReader {
    dir: PathBuf,
    start: WalSnapshot,
    segments: Vec<SegmentName>,
}

impl WalReader {
    /// Opens the WAL in `dir` for reading entries after `start`.
    ///
    /// Selects the last segment that may hold `start.index` and every
    /// segment after it.
    pub fn open_for_read(dir: impl AsRef<Path>, start: WalSnapshot) -> Result<Self, WalError> {
        let dir = dir.as_ref().to_path_buf();
        let names = SegmentScanner::list_segments(&dir)?;

        let first = SegmentScanner::search_index(&names, start.index).ok_or_else(|| {
            WalError::FileNotFound {
                dir: dir.clone(),
                index: start.index,
            }
        })?;
        let segments = names[first..].to_vec();
        SegmentScanner::check_sequence(&segments)?;

        tracing::debug!(
            "Opened WAL {} for read: {} segment(s) from seq {}",
            dir.display(),
            segments.len(),
            segments[0].seq
        );

        Ok(Self {
            dir,
            start,
            segments,
        })
    }

    /// Returns the segments this reader will visit.
    pub fn segments(&self) -> &[SegmentName] {
        &self.segments
    }

    /// Reads every record of the selected segments.
    ///
    /// A later entry whose index is already present replaces it and
    /// everything after it. On failure the entries read so far are
    /// returned with the error.
    pub fn read_all(&self) -> Result<WalContents, PartialRead> {
        let mut contents = WalContents::default();
        let mut matched = false;

        for name in &self.segments {
            let path = self.dir.join(name.filename());
            let records = match SegmentRecords::open(&path) {
                Ok(records) => records,
                Err(e) => return Err(PartialRead::new(contents, e)),
            };

            for item in records {
                let result = item.and_then(|(_, record)| self.apply(&mut contents, &mut matched, &record));
                if let Err(e) = result {
                    return Err(PartialRead::new(contents, e));
                }
            }
        }

        if !matched {
            let err = WalError::SnapshotNotFound {
                index: self.start.index,
                term: self.start.term,
            };
            return Err(PartialRead::new(contents, err));
        }

        Ok(contents)
    }

    fn apply(
        &self,
        contents: &mut WalContents,
        matched: &mut bool,
        record: &WalRecord,
    ) -> Result<(), WalError> {
        match record.header.record_type {
            RecordType::Entry => {
                let entry = Entry::decode(&record.payload)?;
                if entry.index > self.start.index {
                    let offset = entry.index - self.start.index - 1;
                    if offset > contents.entries.len() as u64 {
                        return Err(WalError::SliceOutOfRange {
                            resume_index: self.start.index,
                            index: entry.index,
                            len: contents.entries.len(),
                        });
                    }
                    contents.entries.truncate(offset as usize);
                    contents.entries.push(entry);
                }
            }
            RecordType::Metadata => {
                let metadata = Metadata::decode(&record.payload)?;
                if contents.metadata.is_some_and(|existing| existing != metadata) {
                    return Err(WalError::MetadataConflict);
                }
                contents.metadata = Some(metadata);
            }
            RecordType::State => {
                contents.state = HardState::decode(&record.payload)?;
            }
            RecordType::Snapshot => {
                let snap = WalSnapshot::decode(&record.payload)?;
                if snap.index == self.start.index {
                    if self.start.term != 0 && snap.term != self.start.term {
                        return Err(WalError::SnapshotMismatch {
                            index: snap.index,
                            expected: self.start.term,
                            found: snap.term,
                        });
                    }
                    *matched = true;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WalWriter;
    use tempfile::TempDir;

    fn entries(term: u64, range: std::ops::RangeInclusive<u64>) -> Vec<Entry> {
        range
            .map(|i| Entry::normal(term, i, format!("{{\"header\":{{\"id\":{}}}}}", i)))
            .collect()
    }

    #[test]
    fn test_read_all_from_start() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=5)).unwrap();
        writer
            .save_state(&HardState {
                term: 1,
                vote: 1,
                commit: 5,
            })
            .unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::default()).unwrap();
        let contents = reader.read_all().unwrap();

        assert_eq!(contents.metadata, Some(Metadata::new(1, 2)));
        assert_eq!(contents.state.commit, 5);
        assert_eq!(contents.entries.len(), 5);
        assert_eq!(contents.last_index(), Some(5));
    }

    #[test]
    fn test_later_term_overwrites_tail() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=5)).unwrap();
        writer.save_entries(&entries(2, 4..=6)).unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::default()).unwrap();
        let contents = reader.read_all().unwrap();

        let got: Vec<(u64, u64)> = contents.entries.iter().map(|e| (e.term, e.index)).collect();
        assert_eq!(got, vec![(1, 1), (1, 2), (1, 3), (2, 4), (2, 5), (2, 6)]);
    }

    #[test]
    fn test_resume_without_marker_is_snapshot_not_found() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=5)).unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::new(2, 0)).unwrap();
        let err = reader.read_all().unwrap_err();

        assert!(err.source.is_snapshot_not_found());
        let indexes: Vec<u64> = err.contents.entries.iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![3, 4, 5]);
    }

    #[test]
    fn test_resume_from_snapshot_marker() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=5)).unwrap();
        writer.save_snapshot(WalSnapshot::new(3, 1)).unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::new(3, 1)).unwrap();
        let contents = reader.read_all().unwrap();
        assert_eq!(contents.entries.len(), 2);

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::new(3, 9)).unwrap();
        let err = reader.read_all().unwrap_err();
        assert!(matches!(err.source, WalError::SnapshotMismatch { .. }));
    }

    #[test]
    fn test_gap_is_slice_out_of_range() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=3)).unwrap();
        writer.save_entries(&entries(2, 8..=9)).unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::default()).unwrap();
        let err = reader.read_all().unwrap_err();

        assert!(err.source.is_slice_out_of_range());
        assert_eq!(err.contents.entries.len(), 3);
    }

    #[test]
    fn test_open_skips_earlier_segments() {
        let dir = TempDir::new().unwrap();
        let mut writer = WalWriter::create(dir.path(), &Metadata::new(1, 2)).unwrap();
        writer.save_entries(&entries(1, 1..=4)).unwrap();
        writer.cut().unwrap();
        writer.save_entries(&entries(1, 5..=8)).unwrap();
        writer.save_snapshot(WalSnapshot::new(6, 1)).unwrap();
        writer.sync().unwrap();

        let reader = WalReader::open_for_read(dir.path(), WalSnapshot::new(6, 1)).unwrap();
        assert_eq!(reader.segments(), &[SegmentName::new(1, 5)]);

        let contents = reader.read_all().unwrap();
        let indexes: Vec<u64> = contents.entries.iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![7, 8]);
        assert_eq!(contents.metadata, Some(Metadata::new(1, 2)));
    }

    #[test]
    fn test_open_empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        let result = WalReader::open_for_read(dir.path(), WalSnapshot::default());
        assert!(matches!(result, Err(WalError::FileNotFound { .. })));
    }
}
