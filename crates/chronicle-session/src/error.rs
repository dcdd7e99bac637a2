use thiserror::Error;

/// Errors a ledger session reports back to the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown peer: {0}")]
    UnknownPeer(String),

    #[error("peer {peer} returned an error: {message}")]
    Peer { peer: String, message: String },

    #[error("ordering service error: {0}")]
    Ordering(String),

    #[error("event stream error on {peer}: {message}")]
    EventStream { peer: String, message: String },

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),
}

impl SessionError {
    pub fn peer(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Peer {
            peer: peer.into(),
            message: message.into(),
        }
    }

    pub fn event_stream(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EventStream {
            peer: peer.into(),
            message: message.into(),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
