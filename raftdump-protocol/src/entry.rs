//! Log entries and the fixed-size records stored next to them.
//!
//! Entry layout:
//!
//! ```text
//! +----------+----------+--------+------------------------+
//! | term     | index    | type   | data                   |
//! | 8 bytes  | 8 bytes  | 1 byte | remaining bytes        |
//! +----------+----------+--------+------------------------+
//! ```
//!
//! All integers are big-endian.

use crate::error::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Size of the fixed entry header in bytes (8+8+1 = 17).
pub const ENTRY_HEADER_SIZE: usize = 17;

const HARD_STATE_SIZE: usize = 24;
const WAL_SNAPSHOT_SIZE: usize = 16;

/// Kind of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum EntryType {
    /// Application operation.
    #[default]
    Normal = 0,
    /// Cluster membership change.
    ConfChange = 1,
}

impl TryFrom<u8> for EntryType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EntryType::Normal),
            1 => Ok(EntryType::ConfChange),
            other => Err(ProtocolError::UnknownEntryType(other)),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Normal => f.write_str("EntryNormal"),
            EntryType::ConfChange => f.write_str("EntryConfChange"),
        }
    }
}

/// A replicated log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub term: u64,
    pub index: u64,
    pub entry_type: EntryType,
    pub data: Bytes,
}

impl Entry {
    /// Creates a normal entry.
    pub fn normal(term: u64, index: u64, data: impl Into<Bytes>) -> Self {
        Self {
            term,
            index,
            entry_type: EntryType::Normal,
            data: data.into(),
        }
    }

    /// Creates a configuration-change entry.
    pub fn conf_change(term: u64, index: u64, data: impl Into<Bytes>) -> Self {
        Self {
            term,
            index,
            entry_type: EntryType::ConfChange,
            data: data.into(),
        }
    }

    pub fn is_normal(&self) -> bool {
        self.entry_type == EntryType::Normal
    }

    /// Encodes the entry into bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(ENTRY_HEADER_SIZE + self.data.len());
        buf.put_u64(self.term);
        buf.put_u64(self.index);
        buf.put_u8(self.entry_type as u8);
        buf.put_slice(&self.data);
        buf.freeze()
    }

    /// Decodes an entry; everything after the header is the payload.
    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < ENTRY_HEADER_SIZE {
            return Err(ProtocolError::Truncated {
                needed: ENTRY_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let term = buf.get_u64();
        let index = buf.get_u64();
        let entry_type = EntryType::try_from(buf.get_u8())?;
        let data = Bytes::copy_from_slice(buf);

        Ok(Self {
            term,
            index,
            entry_type,
            data,
        })
    }
}

/// Persistent consensus state: current term, vote and commit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HardState {
    pub term: u64,
    pub vote: u64,
    pub commit: u64,
}

impl HardState {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HARD_STATE_SIZE);
        buf.put_u64(self.term);
        buf.put_u64(self.vote);
        buf.put_u64(self.commit);
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < HARD_STATE_SIZE {
            return Err(ProtocolError::Truncated {
                needed: HARD_STATE_SIZE,
                actual: buf.len(),
            });
        }

        Ok(Self {
            term: buf.get_u64(),
            vote: buf.get_u64(),
            commit: buf.get_u64(),
        })
    }
}

/// Position of a snapshot as recorded in the WAL.
///
/// Also used as the resume point handed to the WAL reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WalSnapshot {
    pub index: u64,
    pub term: u64,
}

impl WalSnapshot {
    pub fn new(index: u64, term: u64) -> Self {
        Self { index, term }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(WAL_SNAPSHOT_SIZE);
        buf.put_u64(self.index);
        buf.put_u64(self.term);
        buf.freeze()
    }

    pub fn decode(mut buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < WAL_SNAPSHOT_SIZE {
            return Err(ProtocolError::Truncated {
                needed: WAL_SNAPSHOT_SIZE,
                actual: buf.len(),
            });
        }

        Ok(Self {
            index: buf.get_u64(),
            term: buf.get_u64(),
        })
    }
}
