//! Raw frame listing.
//!
//! Walks every WAL segment in order and prints each record frame as stored,
//! without classification.

use crate::error::DumpError;
use raftdump_protocol::{Entry, HardState, Metadata, WalSnapshot};
use raftdump_wal::{RecordType, SegmentRecords, SegmentScanner, WalRecord};
use std::io::Write;
use std::path::Path;

/// Prints every frame under `wal_dir`, returning the number printed.
///
/// Entries below `start_index` are skipped. A corrupt frame ends its
/// segment; the remaining segments are still listed.
pub fn dump_raw<W: Write>(
    wal_dir: &Path,
    start_index: Option<u64>,
    out: &mut W,
) -> Result<usize, DumpError> {
    let segments = SegmentScanner::list_segments(wal_dir).map_err(DumpError::OpenWal)?;
    let start = start_index.unwrap_or(0);
    let mut printed = 0;

    for name in &segments {
        let filename = name.filename();
        writeln!(out, "Segment: {}", filename)?;

        let records = match SegmentRecords::open(&wal_dir.join(&filename)) {
            Ok(records) => records,
            Err(e) => {
                writeln!(out, "error: {}", e)?;
                continue;
            }
        };

        for item in records {
            let (offset, record) = match item {
                Ok(item) => item,
                Err(e) => {
                    writeln!(out, "error: {}", e)?;
                    break;
                }
            };

            let summary = describe(&record);
            if let Summary::Entry { index, .. } = &summary {
                if *index < start {
                    continue;
                }
            }

            writeln!(
                out,
                "offset={} type={} seq={} len={} crc={:08x}\t{}",
                offset,
                record.header.record_type,
                record.header.sequence,
                record.header.payload_len,
                record.header.crc32c,
                summary
            )?;
            printed += 1;
        }
    }

    writeln!(out, "\nRecords: {}", printed)?;
    Ok(printed)
}

enum Summary {
    Entry { term: u64, index: u64, kind: String },
    State(HardState),
    Snapshot(WalSnapshot),
    Metadata(Metadata),
    Undecodable(String),
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Summary::Entry { term, index, kind } => {
                write!(f, "term={} index={} type={}", term, index, kind)
            }
            Summary::State(s) => write!(f, "term={} vote={:x} commit={}", s.term, s.vote, s.commit),
            Summary::Snapshot(s) => write!(f, "term={} index={}", s.term, s.index),
            Summary::Metadata(m) => write!(f, "nodeID={} clusterID={}", m.node_id, m.cluster_id),
            Summary::Undecodable(e) => write!(f, "undecodable: {}", e),
        }
    }
}

fn describe(record: &WalRecord) -> Summary {
    let payload = &record.payload[..];
    let decoded = match record.header.record_type {
        RecordType::Entry => Entry::decode(payload).map(|e| Summary::Entry {
            term: e.term,
            index: e.index,
            kind: e.entry_type.to_string(),
        }),
        RecordType::State => HardState::decode(payload).map(Summary::State),
        RecordType::Snapshot => WalSnapshot::decode(payload).map(Summary::Snapshot),
        RecordType::Metadata => Metadata::decode(payload).map(Summary::Metadata),
    };
    decoded.unwrap_or_else(|e| Summary::Undecodable(e.to_string()))
}
