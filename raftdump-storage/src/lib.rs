//! # raftdump-storage
//!
//! Snapshot storage for raftdump.
//!
//! This crate provides:
//! - Snapshot file naming and discovery
//! - Checksummed snapshot reads and writes
//! - The newest-readable-snapshot lookup used to pick a resume point

pub mod error;
pub mod snapshot;

pub use error::StorageError;
pub use snapshot::{snapshot_filename, Snapshotter, SNAPSHOT_SUFFIX};
