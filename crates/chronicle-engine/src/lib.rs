//! Transaction orchestration engine for Chronicle.
//!
//! Drives writes through propose → endorse → order → commit with bounded
//! retries, fans reads out to peers and aggregates their answers, and
//! correlates committed writes with their ledger timestamps. The network is
//! reached only through a shared [`chronicle_session::LedgerSession`];
//! diagnostics go to an injected [`EngineObserver`].

pub mod commit;
pub mod config;
pub mod details;
pub mod error;
pub mod observer;
pub mod outcome;
pub mod proposal;
pub mod query;
pub mod retry;
pub mod selector;
pub mod write;

pub use commit::{CommitWaiter, PendingCommit};
pub use config::{EngineConfig, DEFAULT_QUERY_FUNCTION, DEFAULT_WRITE_FUNCTION};
pub use details::{DetailResolver, ResolvedDetails};
pub use error::{EngineError, EngineResult};
pub use observer::{
    EngineMetrics, EngineObserver, MetricsSnapshot, NoopObserver, Operation, TracingObserver,
};
pub use outcome::{DetailOutcome, DetailedWriteOutcome, QueryOutcome, WriteOutcome};
pub use proposal::{EndorsedProposal, ProposalSubmitter};
pub use query::QueryOrchestrator;
pub use retry::{AttemptReport, Retried, RetryPolicy};
pub use selector::{FirstPeerSelector, PeerSelector, RandomSelector, RoundRobinSelector};
pub use write::WriteOrchestrator;
