//! # raftdump-wal
//!
//! Write-ahead log access for raftdump.
//!
//! This crate provides:
//! - Per-record CRC32C framing
//! - Segment discovery and ordering
//! - Read-all from a resume point, with the tolerated partial-read conditions
//! - A writer used to build WAL directories

pub mod error;
pub mod reader;
pub mod record;
pub mod segment;
pub mod writer;

pub use error::{PartialRead, WalError};
pub use reader::{WalContents, WalReader};
pub use record::{RecordType, WalRecord, WalRecordHeader};
pub use segment::{Segment, SegmentName, SegmentRecords, SegmentScanner};
pub use writer::WalWriter;

/// Default segment size (64 MiB).
pub const DEFAULT_SEGMENT_SIZE: u64 = 64 * 1024 * 1024;

/// WAL record header size in bytes.
pub const RECORD_HEADER_SIZE: usize = 24;
