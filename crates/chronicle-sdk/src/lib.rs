//! High-level SDK for Chronicle.
//!
//! [`Chronicle`] is the entry point for applications: it wraps a ledger
//! session with the write, query and detail-lookup orchestrators, and can be
//! built from a TOML [`ClientConfig`]. [`Chronicle::in_memory`] wires it to
//! a process-local network for sandboxes and tests.

pub mod client;
pub mod config;
pub mod error;

pub use client::{CallTimeouts, Chronicle, ChronicleBuilder};
pub use config::{ClientConfig, ContractConfig, PeerConfig, QuerySettings, WriteSettings};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use chronicle_engine::{
    DetailOutcome, DetailedWriteOutcome, EngineError, EngineMetrics, EngineObserver,
    QueryOutcome, WriteOutcome,
};
pub use chronicle_session::{InMemoryNetwork, LedgerSession};
pub use chronicle_types::{QueryRequest, QueryTarget, TransactionId, WriteRequest};
