use serde::Serialize;

use chronicle_session::SessionError;

/// Errors produced by the orchestration engine.
///
/// Every failure a caller can observe is one of these; session errors are
/// converted at the boundary where they occur.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EngineError {
    /// The request was malformed. Raised before any network contact.
    #[error("invalid request: {0}")]
    Precondition(String),

    /// The session knows no peers (or not the one asked for).
    #[error("no peers available: {0}")]
    NoPeersAvailable(String),

    /// The peer refused to endorse the proposal or answered with an error.
    #[error("proposal rejected by {peer}: {reason}")]
    ProposalRejected { peer: String, reason: String },

    /// The ordering service did not accept the endorsed transaction.
    #[error("ordering failed: {0}")]
    OrderingFailed(String),

    /// The transaction was committed with a non-VALID validation code.
    #[error("commit rejected with code {0}")]
    CommitRejected(String),

    /// No commit notification arrived before the deadline.
    #[error("commit not observed within {timeout_ms} ms")]
    CommitTimedOut { timeout_ms: u64 },

    /// The peer's event stream failed while waiting for the commit.
    #[error("event stream failed on {peer}: {reason}")]
    EventStreamFailed { peer: String, reason: String },

    /// Every queried peer answered empty or with an error.
    #[error("query failed on all peers: {}", .0.join("; "))]
    QueryAllPeersFailed(Vec<String>),

    /// A single-peer query got no answer before the deadline.
    #[error("query not answered within {timeout_ms} ms")]
    QueryTimedOut { timeout_ms: u64 },

    /// The committed transaction's ledger record could not be fetched.
    #[error("transaction detail lookup failed: {0}")]
    DetailLookupFailed(String),
}

impl EngineError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    pub fn proposal_rejected(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProposalRejected {
            peer: peer.into(),
            reason: reason.into(),
        }
    }

    /// Short, stable name of the variant, used as a log and metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "precondition",
            Self::NoPeersAvailable(_) => "no_peers_available",
            Self::ProposalRejected { .. } => "proposal_rejected",
            Self::OrderingFailed(_) => "ordering_failed",
            Self::CommitRejected(_) => "commit_rejected",
            Self::CommitTimedOut { .. } => "commit_timed_out",
            Self::EventStreamFailed { .. } => "event_stream_failed",
            Self::QueryAllPeersFailed(_) => "query_all_peers_failed",
            Self::QueryTimedOut { .. } => "query_timed_out",
            Self::DetailLookupFailed(_) => "detail_lookup_failed",
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::UnknownPeer(name) => Self::NoPeersAvailable(format!("unknown peer {name}")),
            SessionError::Peer { peer, message } => Self::ProposalRejected {
                peer,
                reason: message,
            },
            SessionError::Ordering(message) => Self::OrderingFailed(message),
            SessionError::EventStream { peer, message } => Self::EventStreamFailed {
                peer,
                reason: message,
            },
            SessionError::TransactionNotFound(tx) => {
                Self::DetailLookupFailed(format!("transaction {tx} not found"))
            }
        }
    }
}

/// Human-readable reason carried by a session error, without the peer
/// prefix the caller adds itself.
pub(crate) fn peer_reason(err: SessionError) -> String {
    match err {
        SessionError::Peer { message, .. } => message,
        other => other.to_string(),
    }
}

/// Convenience alias used throughout the engine crate.
pub type EngineResult<T> = Result<T, EngineError>;
