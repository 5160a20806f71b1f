//! Membership changes and snapshot metadata.

use crate::error::ProtocolError;
use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfChangeType {
    #[default]
    ConfChangeAddNode,
    ConfChangeRemoveNode,
    ConfChangeUpdateNode,
    ConfChangeAddLearnerNode,
}

impl fmt::Display for ConfChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfChangeType::ConfChangeAddNode => "ConfChangeAddNode",
            ConfChangeType::ConfChangeRemoveNode => "ConfChangeRemoveNode",
            ConfChangeType::ConfChangeUpdateNode => "ConfChangeUpdateNode",
            ConfChangeType::ConfChangeAddLearnerNode => "ConfChangeAddLearnerNode",
        };
        f.write_str(name)
    }
}

/// Payload of a configuration-change entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfChange {
    #[serde(default)]
    pub id: u64,
    #[serde(rename = "type")]
    pub change_type: ConfChangeType,
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ConfChange {
    pub fn new(change_type: ConfChangeType, node_id: u64) -> Self {
        Self {
            id: 0,
            change_type,
            node_id: NodeId(node_id),
            context: None,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Cluster membership at a snapshot point.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfState {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voters: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub learners: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub voters_outgoing: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub learners_next: Vec<u64>,
    pub auto_leave: bool,
}

/// Log position and membership captured by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default)]
    pub conf_state: ConfState,
    pub index: u64,
    pub term: u64,
}

/// A point-in-time image of applied state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    #[serde(default, with = "hex::serde")]
    pub data: Vec<u8>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.metadata.index == 0
    }
}
