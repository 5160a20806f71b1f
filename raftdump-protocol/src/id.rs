//! Node identifiers and WAL metadata.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Member or cluster identifier, displayed in lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Formats a list of ids as `[a b c]`.
pub fn format_ids(ids: &[u64]) -> String {
    let parts: Vec<String> = ids.iter().map(|&id| NodeId(id).to_string()).collect();
    format!("[{}]", parts.join(" "))
}

/// Identity of the member that wrote the WAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub node_id: NodeId,
    pub cluster_id: NodeId,
}

impl Metadata {
    pub fn new(node_id: u64, cluster_id: u64) -> Self {
        Self {
            node_id: NodeId(node_id),
            cluster_id: NodeId(cluster_id),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}
