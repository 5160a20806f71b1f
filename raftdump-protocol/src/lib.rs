//! # raftdump-protocol
//!
//! Record schema shared by the raftdump crates.
//!
//! This crate provides:
//! - Log entries, hard state and WAL snapshot markers with a binary codec
//! - Cluster metadata and node identifiers
//! - Membership changes and snapshot metadata
//! - The structured and legacy request payloads carried by normal entries

pub mod confchange;
pub mod entry;
pub mod error;
pub mod id;
pub mod request;

pub use confchange::{ConfChange, ConfChangeType, ConfState, Snapshot, SnapshotMetadata};
pub use entry::{Entry, EntryType, HardState, WalSnapshot, ENTRY_HEADER_SIZE};
pub use error::ProtocolError;
pub use id::{format_ids, Metadata, NodeId};
pub use request::{
    AuthUserAddRequest, AuthUserChangePasswordRequest, CompactionRequest, DeleteRangeRequest,
    InternalRaftRequest, LeaseCheckpointRequest, LeaseGrantRequest, LeaseRevokeRequest,
    PutRequest, RangeRequest, Request, RequestHeader, RequestOp, TxnRequest, REDACTED_VALUE,
};

/// Method tag of a legacy SYNC request.
pub const METHOD_SYNC: &str = "SYNC";

/// Method tag of a legacy quorum GET request.
pub const METHOD_QGET: &str = "QGET";

/// Method tag of a legacy DELETE request.
pub const METHOD_DELETE: &str = "DELETE";
