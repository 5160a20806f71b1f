//! # raftdump-core
//!
//! Offline dump pipeline for a member's raft log.
//!
//! This crate provides:
//! - Resume point and end-index selection over the WAL
//! - Ordered, first-match-wins entry classification
//! - Per-category line rendering with secret redaction
//! - Streaming payloads through an external decoder process
//! - Raw frame listing

pub mod decoder;
pub mod dump;
pub mod error;
pub mod filter;
pub mod options;
pub mod range;
pub mod raw;
pub mod render;
pub mod report;

pub use decoder::{parse_decoder_output, DecoderOutput, StreamDecoder};
pub use dump::{DumpContext, DumpSummary};
pub use error::DumpError;
pub use filter::{Classifier, EntryFilter, EntryKind, EntryTypeToken, EntryView, IrrField};
pub use options::{DumpOptions, DEFAULT_ENTRY_TYPES};
pub use render::excerpt;
pub use report::Reporter;
