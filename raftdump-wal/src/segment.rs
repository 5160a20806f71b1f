//! WAL segment management.
//!
//! The WAL is split into segments. Each segment file is named after its
//! sequence number and the index of the first entry it may hold, so a
//! reader can skip whole segments that precede its resume point.

use crate::error::WalError;
use crate::record::WalRecord;
use crate::RECORD_HEADER_SIZE;
use bytes::BytesMut;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Sequence number and first index of a segment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentName {
    pub seq: u64,
    pub index: u64,
}

impl SegmentName {
    pub fn new(seq: u64, index: u64) -> Self {
        Self { seq, index }
    }

    /// Segment file name format: `<seq:016x>-<index:016x>.wal`
    pub fn filename(&self) -> String {
        format!("{:016x}-{:016x}.wal", self.seq, self.index)
    }

    /// Parses a segment file name.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.strip_suffix(".wal")?;
        let (seq, index) = name.split_once('-')?;
        if seq.len() != 16 || index.len() != 16 {
            return None;
        }
        Some(Self {
            seq: u64::from_str_radix(seq, 16).ok()?,
            index: u64::from_str_radix(index, 16).ok()?,
        })
    }
}

/// A single WAL segment file opened for appending.
pub struct Segment {
    name: SegmentName,
    path: PathBuf,
    file: File,
    size: u64,
    sync_pending: bool,
}

impl Segment {
    /// Creates a new segment file.
    pub fn create(dir: &Path, name: SegmentName) -> Result<Self, WalError> {
        let path = dir.join(name.filename());
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)?;

        Ok(Self {
            name,
            path,
            file,
            size: 0,
            sync_pending: false,
        })
    }

    pub fn name(&self) -> SegmentName {
        self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Appends a record to the segment, returning its offset.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64, WalError> {
        let encoded = record.encode()?;
        let offset = self.size;

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&encoded)?;
        self.size += encoded.len() as u64;
        self.sync_pending = true;

        Ok(offset)
    }

    /// Syncs the segment to disk.
    pub fn sync(&mut self) -> Result<(), WalError> {
        if self.sync_pending {
            self.file.sync_data()?;
            self.sync_pending = false;
        }
        Ok(())
    }

    /// Reads every record of a segment file.
    ///
    /// Stops quietly at an incomplete tail record; fails on the first
    /// corrupt frame.
    pub fn read_all(path: &Path) -> Result<Vec<(u64, WalRecord)>, WalError> {
        SegmentRecords::open(path)?.collect()
    }
}

/// Iterator over the records of one segment file.
///
/// Yields `(offset, record)` pairs. After the first error it yields nothing.
pub struct SegmentRecords {
    buf: BytesMut,
    offset: u64,
    failed: bool,
}

impl SegmentRecords {
    /// Reads the whole segment file into memory.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let mut file = File::open(path)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;

        Ok(Self {
            buf: BytesMut::from(&data[..]),
            offset: 0,
            failed: false,
        })
    }

    /// Offset of the next undecoded byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes left after the last decoded record.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

impl Iterator for SegmentRecords {
    type Item = Result<(u64, WalRecord), WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.len() < RECORD_HEADER_SIZE {
            return None;
        }

        let record_offset = self.offset;
        match WalRecord::decode(&mut self.buf, record_offset) {
            Ok(Some(record)) => {
                self.offset += record.disk_size() as u64;
                Some(Ok((record_offset, record)))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Segment directory scanner.
pub struct SegmentScanner;

impl SegmentScanner {
    /// Lists all segments in a directory, sorted by sequence number.
    pub fn list_segments(dir: &Path) -> Result<Vec<SegmentName>, WalError> {
        let mut segments = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            match SegmentName::parse(&name) {
                Some(segment) => segments.push(segment),
                None => tracing::debug!("Ignoring non-segment file {}", name),
            }
        }

        segments.sort();
        Ok(segments)
    }

    /// Returns the position of the last segment whose first index is at
    /// or below `index`.
    pub fn search_index(segments: &[SegmentName], index: u64) -> Option<usize> {
        segments.iter().rposition(|s| s.index <= index)
    }

    /// Checks that sequence numbers increase by exactly one.
    pub fn check_sequence(segments: &[SegmentName]) -> Result<(), WalError> {
        for pair in segments.windows(2) {
            let expected = pair[0].seq + 1;
            if pair[1].seq != expected {
                return Err(WalError::SequenceGap {
                    expected,
                    found: pair[1].seq,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordType;
    use bytes::Bytes;
    use tempfile::TempDir;

    #[test]
    fn test_segment_filename() {
        assert_eq!(
            SegmentName::new(0, 0).filename(),
            "0000000000000000-0000000000000000.wal"
        );
        assert_eq!(
            SegmentName::new(1, 0xff).filename(),
            "0000000000000001-00000000000000ff.wal"
        );
    }

    #[test]
    fn test_parse_segment_filename() {
        assert_eq!(
            SegmentName::parse("0000000000000002-0000000000000010.wal"),
            Some(SegmentName::new(2, 16))
        );
        assert_eq!(SegmentName::parse("0000000000000000.wal"), None);
        assert_eq!(SegmentName::parse("invalid-name.wal"), None);
        assert_eq!(
            SegmentName::parse("0000000000000000-0000000000000000.tmp"),
            None
        );
    }

    #[test]
    fn test_search_index() {
        let segments = vec![
            SegmentName::new(0, 0),
            SegmentName::new(1, 10),
            SegmentName::new(2, 20),
        ];
        assert_eq!(SegmentScanner::search_index(&segments, 0), Some(0));
        assert_eq!(SegmentScanner::search_index(&segments, 15), Some(1));
        assert_eq!(SegmentScanner::search_index(&segments, 20), Some(2));
        assert_eq!(SegmentScanner::search_index(&segments[1..], 5), None);
    }

    #[test]
    fn test_check_sequence() {
        let ok = vec![SegmentName::new(3, 0), SegmentName::new(4, 9)];
        assert!(SegmentScanner::check_sequence(&ok).is_ok());

        let gap = vec![SegmentName::new(3, 0), SegmentName::new(5, 9)];
        assert!(matches!(
            SegmentScanner::check_sequence(&gap),
            Err(WalError::SequenceGap {
                expected: 4,
                found: 5
            })
        ));
    }

    #[test]
    fn test_segment_append_and_read() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::create(dir.path(), SegmentName::new(0, 0)).unwrap();

        for i in 0..5 {
            let record = WalRecord::new(RecordType::Entry, i, Bytes::from(format!("rec-{}", i)));
            segment.append(&record).unwrap();
        }
        segment.sync().unwrap();

        let records = Segment::read_all(segment.path()).unwrap();
        assert_eq!(records.len(), 5);
        for (i, (_, record)) in records.iter().enumerate() {
            assert_eq!(record.header.sequence, i as u64);
        }
    }

    #[test]
    fn test_iterator_stops_after_corruption() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::create(dir.path(), SegmentName::new(0, 0)).unwrap();
        for i in 0..3 {
            let record = WalRecord::new(RecordType::Entry, i, Bytes::from_static(b"data"));
            segment.append(&record).unwrap();
        }
        segment.sync().unwrap();

        let mut raw = std::fs::read(segment.path()).unwrap();
        // Flip a payload byte of the second record
        let second = RECORD_HEADER_SIZE + 4;
        raw[second + RECORD_HEADER_SIZE] ^= 0xFF;
        std::fs::write(segment.path(), &raw).unwrap();

        let results: Vec<_> = SegmentRecords::open(segment.path()).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(WalError::CorruptedRecord { .. })));
    }

    #[test]
    fn test_list_segments_skips_other_files() {
        let dir = TempDir::new().unwrap();
        Segment::create(dir.path(), SegmentName::new(1, 5)).unwrap();
        Segment::create(dir.path(), SegmentName::new(0, 0)).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let segments = SegmentScanner::list_segments(dir.path()).unwrap();
        assert_eq!(segments, vec![SegmentName::new(0, 0), SegmentName::new(1, 5)]);
    }
}
