//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding records.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("record truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("unknown entry type: {0}")]
    UnknownEntryType(u8),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
