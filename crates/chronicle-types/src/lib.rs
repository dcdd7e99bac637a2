//! Foundation types for Chronicle.
//!
//! Chronicle drives writes and reads against a permissioned ledger channel.
//! This crate holds the plain value types shared by the session layer, the
//! orchestration engine, and the SDK. Nothing here performs I/O.
//!
//! # Key Types
//!
//! - [`TransactionId`] - Hex identifier minted per proposal from a nonce and the creator
//! - [`PeerHandle`] - Address of one endorsing peer in the channel
//! - [`WriteRequest`] / [`QueryRequest`] - Caller-facing request values with defaults
//! - [`CommitStatus`] / [`CommitEvent`] - Terminal status of a transaction
//! - [`ProcessedTransaction`] - Ledger record of a committed transaction

pub mod envelope;
pub mod error;
pub mod event;
pub mod peer;
pub mod proposal;
pub mod request;
pub mod transaction;

pub use envelope::{
    ChannelHeader, EnvelopePayload, Header, ProcessedTransaction, SignatureHeader,
    TransactionEnvelope,
};
pub use error::TypeError;
pub use event::{CommitEvent, CommitStatus};
pub use peer::PeerHandle;
pub use proposal::{
    ContractCall, EndorsedTransaction, EndorsementResponse, OrderingResult, ProposalRequest,
    ENDORSEMENT_OK, ORDERING_SUCCESS,
};
pub use request::{
    QueryRequest, QueryTarget, WriteRequest, DEFAULT_EVALUATE_TIMEOUT, DEFAULT_QUERY_ATTEMPTS,
    DEFAULT_QUERY_TIMEOUT, DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_TIMEOUT,
};
pub use transaction::TransactionId;
