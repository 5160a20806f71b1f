//! WAL record framing.
//!
//! ```text
//! offset  size  field
//!      0     4  magic "RWAL"
//!      4     1  record type
//!      5     1  flags
//!      6     2  reserved (zero)
//!      8     4  payload length, big-endian
//!     12     4  CRC32C of the payload, big-endian
//!     16     8  sequence number, big-endian
//!     24     n  payload
//! ```
//!
//! A frame starting with four zero bytes is preallocated space and ends the
//! segment.

use crate::error::WalError;
use crate::RECORD_HEADER_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Leading bytes of every frame.
pub const WAL_MAGIC: [u8; 4] = *b"RWAL";

/// Largest accepted payload.
pub const MAX_RECORD_SIZE: usize = 16 * 1024 * 1024;

/// What a record's payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// JSON member and cluster identity.
    Metadata = 1,
    /// Binary log entry.
    Entry = 2,
    /// Binary hard state.
    State = 3,
    /// Binary snapshot position marker.
    Snapshot = 4,
}

impl RecordType {
    fn from_u8(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => RecordType::Metadata,
            2 => RecordType::Entry,
            3 => RecordType::State,
            4 => RecordType::Snapshot,
            _ => return None,
        })
    }
}

impl TryFrom<u8> for RecordType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        RecordType::from_u8(tag).ok_or(tag)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordType::Metadata => "metadata",
            RecordType::Entry => "entry",
            RecordType::State => "state",
            RecordType::Snapshot => "snapshot",
        })
    }
}

/// Fixed-size frame header.
#[derive(Debug, Clone)]
pub struct WalRecordHeader {
    pub record_type: RecordType,
    pub flags: u8,
    pub payload_len: u32,
    pub crc32c: u32,
    pub sequence: u64,
}

impl WalRecordHeader {
    /// Parses a header from the first [`RECORD_HEADER_SIZE`] bytes of `frame`.
    fn parse(mut frame: &[u8], offset: u64) -> Result<Self, WalError> {
        let invalid = |reason: String| WalError::InvalidHeader { offset, reason };

        let mut magic = [0u8; 4];
        frame.copy_to_slice(&mut magic);
        if magic != WAL_MAGIC {
            return Err(invalid(format!("bad magic {:02x?}", magic)));
        }

        let tag = frame.get_u8();
        let record_type = RecordType::from_u8(tag)
            .ok_or_else(|| invalid(format!("unknown record type {}", tag)))?;
        let flags = frame.get_u8();
        frame.advance(2);

        let header = Self {
            record_type,
            flags,
            payload_len: frame.get_u32(),
            crc32c: frame.get_u32(),
            sequence: frame.get_u64(),
        };

        if header.payload_len as usize > MAX_RECORD_SIZE {
            return Err(WalError::RecordTooLarge {
                size: header.payload_len as usize,
                max: MAX_RECORD_SIZE,
            });
        }
        Ok(header)
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_slice(&WAL_MAGIC);
        buf.put_u8(self.record_type as u8);
        buf.put_u8(self.flags);
        buf.put_u16(0);
        buf.put_u32(self.payload_len);
        buf.put_u32(self.crc32c);
        buf.put_u64(self.sequence);
    }
}

/// One frame: header and payload.
#[derive(Debug, Clone)]
pub struct WalRecord {
    pub header: WalRecordHeader,
    pub payload: Bytes,
}

impl WalRecord {
    /// Frames `payload`, computing its length and checksum.
    pub fn new(record_type: RecordType, sequence: u64, payload: Bytes) -> Self {
        let header = WalRecordHeader {
            record_type,
            flags: 0,
            payload_len: payload.len() as u32,
            crc32c: crc32c::crc32c(&payload),
            sequence,
        };
        Self { header, payload }
    }

    pub fn encode(&self) -> Result<BytesMut, WalError> {
        if self.payload.len() > MAX_RECORD_SIZE {
            return Err(WalError::RecordTooLarge {
                size: self.payload.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.disk_size());
        self.header.put(&mut buf);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Takes one frame off the front of `buf`.
    ///
    /// `Ok(None)` means there is no complete frame left: the buffer ends
    /// mid-frame or reached preallocated zeroes. `buf` is only consumed when
    /// a frame is returned.
    pub fn decode(buf: &mut BytesMut, offset: u64) -> Result<Option<Self>, WalError> {
        if buf.len() < RECORD_HEADER_SIZE || buf[..4] == [0; 4] {
            return Ok(None);
        }

        let header = WalRecordHeader::parse(&buf[..RECORD_HEADER_SIZE], offset)?;
        let frame_len = RECORD_HEADER_SIZE + header.payload_len as usize;
        if buf.len() < frame_len {
            return Ok(None);
        }

        let mut frame = buf.split_to(frame_len);
        let payload = frame.split_off(RECORD_HEADER_SIZE).freeze();

        let actual = crc32c::crc32c(&payload);
        if actual != header.crc32c {
            return Err(WalError::CorruptedRecord {
                offset,
                expected: header.crc32c,
                actual,
            });
        }

        Ok(Some(Self { header, payload }))
    }

    /// Header plus payload length.
    pub fn disk_size(&self) -> usize {
        RECORD_HEADER_SIZE + self.payload.len()
    }
}
