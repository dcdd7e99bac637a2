//! Ledger session contract for Chronicle.
//!
//! A [`LedgerSession`] is the already-bootstrapped connection to one ledger
//! channel: identity, channel membership and the peers it can talk to. The
//! orchestration engine only ever reaches the network through this trait.
//!
//! [`memory::InMemoryNetwork`] implements the contract in-process, with a
//! world state, a block log and per-peer commit event hubs. It backs the
//! CLI sandbox and the engine tests, and its peers can be scripted to
//! reject, stall or fail.

pub mod error;
pub mod memory;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use memory::{
    DetailsBehavior, EndorsementBehavior, EventBehavior, InMemoryNetwork, NetworkBehavior,
    NetworkStats, OrderingBehavior, PeerBehavior, QueryBehavior, StatsSnapshot,
};
pub use session::{CommitSubscription, LedgerSession, Subscription};
