use std::time::Duration;

/// How a peer answers endorsement proposals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EndorsementBehavior {
    /// Simulate the call and sign off with status 200.
    #[default]
    Endorse,
    /// Answer with a non-200 status.
    Reject { status: u32, message: String },
    /// Answer with an error object.
    Fail(String),
}

/// How a peer's event service treats commit listeners.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EventBehavior {
    /// Deliver the commit notification to registered listeners.
    #[default]
    Deliver,
    /// Accept registrations but never notify.
    Silent,
    /// Fail every listener with a stream error when the commit happens.
    StreamError(String),
}

/// How a peer answers read-only contract calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryBehavior {
    /// Read from the world state (empty payload when the key is absent).
    #[default]
    Serve,
    /// Always return an empty payload.
    Empty,
    /// Answer with an error object.
    Fail(String),
    /// Never answer.
    Hang,
}

/// How a peer answers transaction lookups.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DetailsBehavior {
    #[default]
    Serve,
    /// Serve the record with the channel header timestamp stripped.
    OmitTimestamp,
    Fail(String),
}

/// Scripted behaviour of one peer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerBehavior {
    pub endorsement: EndorsementBehavior,
    pub events: EventBehavior,
    pub query: QueryBehavior,
    /// Latency added before every query answer.
    pub query_delay: Duration,
    pub details: DetailsBehavior,
}

impl PeerBehavior {
    /// A peer that fails every request it receives.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            endorsement: EndorsementBehavior::Fail(message.clone()),
            events: EventBehavior::StreamError(message.clone()),
            query: QueryBehavior::Fail(message.clone()),
            query_delay: Duration::ZERO,
            details: DetailsBehavior::Fail(message),
        }
    }
}

/// How the ordering service answers submissions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OrderingBehavior {
    #[default]
    Accept,
    /// Acknowledge with a non-`SUCCESS` status.
    Reject { status: String, info: String },
    /// Fail the submission call outright.
    Fail(String),
    /// Never answer the submission.
    Hang,
}

/// Channel-wide behaviour: ordering and validation of submitted transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkBehavior {
    pub ordering: OrderingBehavior,
    /// Validation code stamped on committed transactions; `None` means VALID.
    pub invalidate_with: Option<String>,
    /// Time between ordering acknowledgement and block commit. Zero commits
    /// before the ordering call returns.
    pub commit_delay: Duration,
}
