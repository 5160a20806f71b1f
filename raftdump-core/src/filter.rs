//! Entry classification.
//!
//! Entry type tokens expand into an ordered list of filters. Each filter
//! tries to decode an entry as one schema; the first filter that accepts an
//! entry decides how it is rendered. Entries no filter accepts are dropped.
//!
//! The `IRR*` filters are narrower than `InternalRaftRequest` and all render
//! the same way, so they only produce finer counts when listed before it.

use raftdump_protocol::{ConfChange, Entry, EntryType, InternalRaftRequest, Request};
use std::fmt;
use std::str::FromStr;

/// Valid entry type tokens, as shown to users.
pub const VALID_ENTRY_TYPES: &str = "ConfigChange, Normal, Request, InternalRaftRequest,
IRRRange, IRRPut, IRRDeleteRange, IRRTxn,
IRRCompaction, IRRLeaseGrant, IRRLeaseRevoke, IRRLeaseCheckpoint";

/// A user-facing entry type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTypeToken {
    ConfigChange,
    Normal,
    Request,
    InternalRaftRequest,
    IrrRange,
    IrrPut,
    IrrDeleteRange,
    IrrTxn,
    IrrCompaction,
    IrrLeaseGrant,
    IrrLeaseRevoke,
    IrrLeaseCheckpoint,
}

impl EntryTypeToken {
    /// Filters this token expands to, in evaluation order.
    pub fn filters(self) -> &'static [EntryFilter] {
        use EntryFilter as F;
        match self {
            EntryTypeToken::ConfigChange => &[F::ConfChange],
            EntryTypeToken::Normal => &[F::InternalRaftRequest, F::Request, F::UnknownNormal],
            EntryTypeToken::Request => &[F::Request],
            EntryTypeToken::InternalRaftRequest => &[F::InternalRaftRequest],
            EntryTypeToken::IrrRange => &[F::Irr(IrrField::Range)],
            EntryTypeToken::IrrPut => &[F::Irr(IrrField::Put)],
            EntryTypeToken::IrrDeleteRange => &[F::Irr(IrrField::DeleteRange)],
            EntryTypeToken::IrrTxn => &[F::Irr(IrrField::Txn)],
            EntryTypeToken::IrrCompaction => &[F::Irr(IrrField::Compaction)],
            EntryTypeToken::IrrLeaseGrant => &[F::Irr(IrrField::LeaseGrant)],
            EntryTypeToken::IrrLeaseRevoke => &[F::Irr(IrrField::LeaseRevoke)],
            EntryTypeToken::IrrLeaseCheckpoint => &[F::Irr(IrrField::LeaseCheckpoint)],
        }
    }
}

impl FromStr for EntryTypeToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ConfigChange" => Ok(EntryTypeToken::ConfigChange),
            "Normal" => Ok(EntryTypeToken::Normal),
            "Request" => Ok(EntryTypeToken::Request),
            "InternalRaftRequest" => Ok(EntryTypeToken::InternalRaftRequest),
            "IRRRange" => Ok(EntryTypeToken::IrrRange),
            "IRRPut" => Ok(EntryTypeToken::IrrPut),
            "IRRDeleteRange" => Ok(EntryTypeToken::IrrDeleteRange),
            "IRRTxn" => Ok(EntryTypeToken::IrrTxn),
            "IRRCompaction" => Ok(EntryTypeToken::IrrCompaction),
            "IRRLeaseGrant" => Ok(EntryTypeToken::IrrLeaseGrant),
            "IRRLeaseRevoke" => Ok(EntryTypeToken::IrrLeaseRevoke),
            "IRRLeaseCheckpoint" => Ok(EntryTypeToken::IrrLeaseCheckpoint),
            other => Err(other.to_string()),
        }
    }
}

/// Operation field of an [`InternalRaftRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrrField {
    Range,
    Put,
    DeleteRange,
    Txn,
    Compaction,
    LeaseGrant,
    LeaseRevoke,
    LeaseCheckpoint,
}

impl IrrField {
    fn is_set(self, rr: &InternalRaftRequest) -> bool {
        match self {
            IrrField::Range => rr.range.is_some(),
            IrrField::Put => rr.put.is_some(),
            IrrField::DeleteRange => rr.delete_range.is_some(),
            IrrField::Txn => rr.txn.is_some(),
            IrrField::Compaction => rr.compaction.is_some(),
            IrrField::LeaseGrant => rr.lease_grant.is_some(),
            IrrField::LeaseRevoke => rr.lease_revoke.is_some(),
            IrrField::LeaseCheckpoint => rr.lease_checkpoint.is_some(),
        }
    }
}

/// One predicate of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFilter {
    /// Any configuration-change entry.
    ConfChange,
    /// A normal entry that decodes as an [`InternalRaftRequest`].
    InternalRaftRequest,
    /// Like `InternalRaftRequest`, with the given operation set.
    Irr(IrrField),
    /// A normal entry that decodes only as a legacy [`Request`].
    Request,
    /// A normal entry that decodes as neither request schema.
    UnknownNormal,
}

impl EntryFilter {
    /// Returns the decoded view when this filter accepts the entry.
    ///
    /// Never fails: a payload that does not decode is simply not accepted.
    pub fn apply(self, entry: &Entry) -> Option<EntryView> {
        match self {
            EntryFilter::ConfChange => {
                if entry.entry_type != EntryType::ConfChange {
                    return None;
                }
                Some(EntryView::ConfChange(ConfChange::decode(&entry.data).ok()))
            }
            EntryFilter::InternalRaftRequest => decode_internal(entry),
            EntryFilter::Irr(field) => decode_internal(entry).filter(|view| match view {
                EntryView::InternalRaftRequest { request, .. } => field.is_set(request),
                _ => false,
            }),
            EntryFilter::Request => {
                if !entry.is_normal() || InternalRaftRequest::decode(&entry.data).is_ok() {
                    return None;
                }
                Request::decode(&entry.data).ok().map(EntryView::Request)
            }
            EntryFilter::UnknownNormal => {
                let unknown = entry.is_normal()
                    && Request::decode(&entry.data).is_err()
                    && InternalRaftRequest::decode(&entry.data).is_err();
                unknown.then_some(EntryView::UnknownNormal)
            }
        }
    }
}

/// Decodes a structured request and redacts it before anyone sees it.
fn decode_internal(entry: &Entry) -> Option<EntryView> {
    if !entry.is_normal() {
        return None;
    }
    let mut request = InternalRaftRequest::decode(&entry.data).ok()?;
    let redacted = request.has_secrets();
    if redacted {
        request.redact_secrets();
    }
    Some(EntryView::InternalRaftRequest {
        request: Box::new(request),
        redacted,
    })
}

/// Rendering category of a classified entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    ConfigChange,
    InternalRaftRequest,
    Request,
    UnknownNormal,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::ConfigChange => "ConfigChange",
            EntryKind::InternalRaftRequest => "InternalRaftRequest",
            EntryKind::Request => "Request",
            EntryKind::UnknownNormal => "UnknownNormal",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry decoded by the filter that accepted it.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryView {
    /// `None` when the payload is not a valid conf change.
    ConfChange(Option<ConfChange>),
    InternalRaftRequest {
        request: Box<InternalRaftRequest>,
        /// Secrets were removed from the decoded request.
        redacted: bool,
    },
    Request(Request),
    UnknownNormal,
}

impl EntryView {
    pub fn kind(&self) -> EntryKind {
        match self {
            EntryView::ConfChange(_) => EntryKind::ConfigChange,
            EntryView::InternalRaftRequest { .. } => EntryKind::InternalRaftRequest,
            EntryView::Request(_) => EntryKind::Request,
            EntryView::UnknownNormal => EntryKind::UnknownNormal,
        }
    }

    /// Bytes handed to an external decoder.
    ///
    /// The original payload, except for redacted requests, which are
    /// re-encoded without their secrets.
    pub fn decoder_payload(&self, entry: &Entry) -> Vec<u8> {
        if let EntryView::InternalRaftRequest {
            request,
            redacted: true,
        } = self
        {
            if let Ok(encoded) = request.encode() {
                return encoded;
            }
        }
        entry.data.to_vec()
    }
}

/// Ordered filter table built from entry type tokens.
#[derive(Debug, Clone)]
pub struct Classifier {
    filters: Vec<EntryFilter>,
}

impl Classifier {
    /// Builds the table from a comma-separated token list.
    ///
    /// Unknown tokens are logged and ignored.
    pub fn from_entry_types(entry_types: &str) -> Self {
        let mut filters = Vec::new();
        for token in entry_types.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.parse::<EntryTypeToken>() {
                Ok(token) => filters.extend_from_slice(token.filters()),
                Err(invalid) => tracing::warn!(
                    "[{}] is not a valid entry-type, ignored.\nPlease set entry-type to one or more of the following:\n{}",
                    invalid,
                    VALID_ENTRY_TYPES
                ),
            }
        }
        Self { filters }
    }

    pub fn filters(&self) -> &[EntryFilter] {
        &self.filters
    }

    /// First filter that accepts the entry wins.
    pub fn classify(&self, entry: &Entry) -> Option<EntryView> {
        self.filters.iter().find_map(|filter| filter.apply(entry))
    }
}
