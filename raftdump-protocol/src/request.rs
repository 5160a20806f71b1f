//! Request payloads carried by normal entries.
//!
//! Two schemas share the normal entry: the structured
//! [`InternalRaftRequest`] and the legacy key/value [`Request`]. Both are
//! decoded strictly, so a payload naming a field of the other schema fails
//! to decode. An empty payload (or `{}`) decodes as either one.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder written over secrets before a request is displayed.
pub const REDACTED_VALUE: &str = "<value removed>";

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestHeader {
    #[serde(skip_serializing_if = "is_default")]
    pub id: u64,
    #[serde(skip_serializing_if = "is_default")]
    pub username: String,
    #[serde(skip_serializing_if = "is_default")]
    pub auth_revision: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRequest {
    pub key: String,
    #[serde(skip_serializing_if = "is_default")]
    pub range_end: String,
    #[serde(skip_serializing_if = "is_default")]
    pub limit: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub revision: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub serializable: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub keys_only: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub count_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PutRequest {
    pub key: String,
    #[serde(skip_serializing_if = "is_default")]
    pub value: String,
    #[serde(skip_serializing_if = "is_default")]
    pub lease: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub prev_kv: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub ignore_value: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub ignore_lease: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteRangeRequest {
    pub key: String,
    #[serde(skip_serializing_if = "is_default")]
    pub range_end: String,
    #[serde(skip_serializing_if = "is_default")]
    pub prev_kv: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Compare {
    pub key: String,
    pub result: String,
    pub target: String,
    #[serde(skip_serializing_if = "is_default")]
    pub value: String,
}

/// One operation inside a transaction branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOp {
    RequestRange(RangeRequest),
    RequestPut(PutRequest),
    RequestDeleteRange(DeleteRangeRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TxnRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub compare: Vec<Compare>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub success: Vec<RequestOp>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failure: Vec<RequestOp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionRequest {
    pub revision: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub physical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseGrantRequest {
    pub ttl: i64,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseRevokeRequest {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseCheckpoint {
    pub id: i64,
    pub remaining_ttl: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseCheckpointRequest {
    pub checkpoints: Vec<LeaseCheckpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmRequest {
    pub action: String,
    #[serde(skip_serializing_if = "is_default")]
    pub member_id: u64,
    #[serde(skip_serializing_if = "is_default")]
    pub alarm: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthEnableRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthUserAddRequest {
    pub name: String,
    #[serde(skip_serializing_if = "is_default")]
    pub password: String,
    #[serde(skip_serializing_if = "is_default")]
    pub hashed_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthUserDeleteRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthUserChangePasswordRequest {
    pub name: String,
    #[serde(skip_serializing_if = "is_default")]
    pub password: String,
    #[serde(skip_serializing_if = "is_default")]
    pub hashed_password: String,
}

/// Structured request replicated through the log.
///
/// At most one operation field is expected to be set.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InternalRaftRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub put: Option<PutRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_range: Option<DeleteRangeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn: Option<TxnRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_grant: Option<LeaseGrantRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_revoke: Option<LeaseRevokeRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_checkpoint: Option<LeaseCheckpointRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_enable: Option<AuthEnableRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user_add: Option<AuthUserAddRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user_delete: Option<AuthUserDeleteRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_user_change_password: Option<AuthUserChangePasswordRequest>,
}

impl InternalRaftRequest {
    /// Decodes a payload. An empty payload is the empty request.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(data)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Returns whether any plaintext password is present.
    pub fn has_secrets(&self) -> bool {
        let plaintext = |password: &str| !password.is_empty() && password != REDACTED_VALUE;
        let change = self
            .auth_user_change_password
            .as_ref()
            .is_some_and(|r| plaintext(&r.password));
        let add = self
            .auth_user_add
            .as_ref()
            .is_some_and(|r| plaintext(&r.password));
        change || add
    }

    /// Replaces plaintext passwords with [`REDACTED_VALUE`].
    pub fn redact_secrets(&mut self) {
        if let Some(req) = self.auth_user_change_password.as_mut() {
            if !req.password.is_empty() {
                req.password = REDACTED_VALUE.to_string();
            }
        }
        if let Some(req) = self.auth_user_add.as_mut() {
            if !req.password.is_empty() {
                req.password = REDACTED_VALUE.to_string();
            }
        }
    }
}

impl fmt::Display for InternalRaftRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

/// Legacy key/value request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Request {
    pub id: u64,
    pub method: String,
    pub path: String,
    pub val: String,
    pub dir: bool,
    pub prev_value: String,
    pub prev_index: u64,
    pub prev_exist: Option<bool>,
    pub expiration: i64,
    pub wait: bool,
    pub since: u64,
    pub recursive: bool,
    pub sorted: bool,
    pub quorum: bool,
    /// Wall clock time in nanoseconds since the Unix epoch.
    pub time: i64,
    pub stream: bool,
}

impl Request {
    /// Decodes a payload. An empty payload is the empty request.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(data)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_decodes_only_as_internal() {
        let data = br#"{"header":{"id":7},"put":{"key":"foo","value":"bar"}}"#;
        let irr = InternalRaftRequest::decode(data).unwrap();
        assert_eq!(irr.put.as_ref().unwrap().key, "foo");
        assert!(Request::decode(data).is_err());
    }

    #[test]
    fn test_legacy_decodes_only_as_request() {
        let data = br#"{"id":1,"method":"PUT","path":"/a","val":"b"}"#;
        let req = Request::decode(data).unwrap();
        assert_eq!(req.method, "PUT");
        assert!(InternalRaftRequest::decode(data).is_err());
    }

    #[test]
    fn test_empty_payload_decodes_as_both() {
        assert_eq!(
            InternalRaftRequest::decode(b"").unwrap(),
            InternalRaftRequest::default()
        );
        assert_eq!(Request::decode(b"").unwrap(), Request::default());
        assert!(InternalRaftRequest::decode(b"{}").is_ok());
        assert!(Request::decode(b"{}").is_ok());
    }

    #[test]
    fn test_garbage_decodes_as_neither() {
        let data = b"\x08\x96\x01garbage";
        assert!(InternalRaftRequest::decode(data).is_err());
        assert!(Request::decode(data).is_err());
    }

    #[test]
    fn test_display_is_compact_json() {
        let irr = InternalRaftRequest {
            header: Some(RequestHeader {
                id: 5,
                ..Default::default()
            }),
            put: Some(PutRequest {
                key: "k".into(),
                value: "v".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            irr.to_string(),
            r#"{"header":{"id":5},"put":{"key":"k","value":"v"}}"#
        );
    }

    #[test]
    fn test_redact_change_password() {
        let data = br#"{"auth_user_change_password":{"name":"root","password":"hunter2"}}"#;
        let mut irr = InternalRaftRequest::decode(data).unwrap();
        assert!(irr.has_secrets());

        irr.redact_secrets();
        assert!(!irr.has_secrets());
        let text = irr.to_string();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(REDACTED_VALUE));
    }

    #[test]
    fn test_redact_leaves_empty_password() {
        let mut irr = InternalRaftRequest {
            auth_user_change_password: Some(AuthUserChangePasswordRequest {
                name: "root".into(),
                hashed_password: "$2a$10$abc".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        irr.redact_secrets();
        assert_eq!(
            irr.auth_user_change_password.unwrap().password,
            String::new()
        );
    }

    #[test]
    fn test_txn_ops_tagged() {
        let data = br#"{"txn":{"success":[{"request_put":{"key":"a","value":"1"}}]}}"#;
        let irr = InternalRaftRequest::decode(data).unwrap();
        let txn = irr.txn.unwrap();
        assert!(matches!(txn.success[0], RequestOp::RequestPut(_)));
    }
}
