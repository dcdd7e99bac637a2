//! In-process ledger network.

mod behavior;
mod hub;
mod ledger;
mod stats;

pub use behavior::{
    DetailsBehavior, EndorsementBehavior, EventBehavior, NetworkBehavior, OrderingBehavior,
    PeerBehavior, QueryBehavior,
};
pub use stats::{Counter, NetworkStats, StatsSnapshot};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use chronicle_types::{
    CommitStatus, ContractCall, EndorsedTransaction, EndorsementResponse, OrderingResult,
    PeerHandle, ProcessedTransaction, ProposalRequest, TransactionId,
};

use crate::error::{SessionError, SessionResult};
use crate::session::{CommitSubscription, LedgerSession};
use hub::{EventHub, HubSubscription};
use ledger::LedgerState;

/// State shared with background commit tasks.
struct Shared {
    channel: String,
    creator: String,
    peers: Vec<PeerHandle>,
    hubs: HashMap<String, Arc<EventHub>>,
    peer_behavior: RwLock<HashMap<String, PeerBehavior>>,
    network_behavior: RwLock<NetworkBehavior>,
    ledger: RwLock<LedgerState>,
    stats: Arc<NetworkStats>,
}

impl Shared {
    fn peer_behavior(&self, peer: &str) -> PeerBehavior {
        self.peer_behavior
            .read()
            .expect("behavior lock poisoned")
            .get(peer)
            .cloned()
            .unwrap_or_default()
    }

    fn check_peer(&self, peer: &PeerHandle) -> SessionResult<()> {
        if self.hubs.contains_key(&peer.name) {
            Ok(())
        } else {
            Err(SessionError::UnknownPeer(peer.name.clone()))
        }
    }

    /// Cut a block holding `transaction` and notify every peer's event hub.
    fn commit(&self, transaction: &EndorsedTransaction, status: CommitStatus) {
        let event = self
            .ledger
            .write()
            .expect("ledger lock poisoned")
            .commit(&self.channel, &self.creator, transaction, status, Utc::now());
        self.stats.commits.inc();
        debug!(
            tx_id = event.transaction_id.short_id(),
            status = %event.status,
            block = ?event.block_number,
            "transaction committed"
        );

        for peer in &self.peers {
            if let Some(hub) = self.hubs.get(&peer.name) {
                hub.dispatch(&event, &self.peer_behavior(&peer.name).events);
            }
        }
    }
}

/// A ledger channel living entirely in process memory.
///
/// Cloning is cheap and yields a handle to the same network.
#[derive(Clone)]
pub struct InMemoryNetwork {
    shared: Arc<Shared>,
}

impl InMemoryNetwork {
    pub fn new(channel: impl Into<String>, creator: impl Into<String>, peers: Vec<PeerHandle>) -> Self {
        let stats = Arc::new(NetworkStats::default());
        let hubs = peers
            .iter()
            .map(|p| (p.name.clone(), Arc::new(EventHub::new(p.name.clone(), stats.clone()))))
            .collect();
        let channel = channel.into();
        info!(channel = %channel, peers = peers.len(), "in-memory network started");
        Self {
            shared: Arc::new(Shared {
                channel,
                creator: creator.into(),
                peers,
                hubs,
                peer_behavior: RwLock::new(HashMap::new()),
                network_behavior: RwLock::new(NetworkBehavior::default()),
                ledger: RwLock::new(LedgerState::default()),
                stats,
            }),
        }
    }

    /// A network with `count` peers named `peer0` … `peer{count-1}`.
    pub fn with_peer_count(channel: impl Into<String>, count: usize) -> Self {
        let peers = (0..count)
            .map(|i| PeerHandle::new(format!("peer{i}"), format!("mem://peer{i}")))
            .collect();
        Self::new(channel, "appUser", peers)
    }

    pub fn set_peer_behavior(&self, peer: &str, behavior: PeerBehavior) {
        self.shared
            .peer_behavior
            .write()
            .expect("behavior lock poisoned")
            .insert(peer.to_string(), behavior);
    }

    pub fn set_network_behavior(&self, behavior: NetworkBehavior) {
        *self
            .shared
            .network_behavior
            .write()
            .expect("behavior lock poisoned") = behavior;
    }

    /// Store a record directly in the world state.
    pub fn preload(&self, contract: &str, key: &str, value: impl Into<Vec<u8>>) {
        self.shared
            .ledger
            .write()
            .expect("ledger lock poisoned")
            .put(contract, key, value.into());
    }

    /// Read the world state the way a peer would serve it.
    pub fn read_record(&self, contract: &str, key: &str) -> Vec<u8> {
        self.shared
            .ledger
            .read()
            .expect("ledger lock poisoned")
            .read(&ContractCall::new(contract, "", vec![key.to_string()]))
    }

    pub fn block_height(&self) -> u64 {
        self.shared.ledger.read().expect("ledger lock poisoned").height()
    }

    /// Commit listeners currently registered across all peers.
    pub fn active_listeners(&self) -> usize {
        self.shared.hubs.values().map(|h| h.listener_count()).sum()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

#[async_trait]
impl LedgerSession for InMemoryNetwork {
    fn channel(&self) -> &str {
        &self.shared.channel
    }

    fn creator(&self) -> &str {
        &self.shared.creator
    }

    fn list_peers(&self) -> Vec<PeerHandle> {
        self.shared.peers.clone()
    }

    async fn send_endorsement_proposal(
        &self,
        peer: &PeerHandle,
        proposal: &ProposalRequest,
    ) -> SessionResult<EndorsementResponse> {
        self.shared.stats.proposals.inc();
        self.shared.check_peer(peer)?;
        match self.shared.peer_behavior(&peer.name).endorsement {
            EndorsementBehavior::Endorse => {
                let payload = self
                    .shared
                    .ledger
                    .read()
                    .expect("ledger lock poisoned")
                    .simulate(Utc::now());
                debug!(peer = %peer, tx_id = proposal.transaction_id.short_id(), "proposal endorsed");
                Ok(EndorsementResponse::ok(payload))
            }
            EndorsementBehavior::Reject { status, message } => Ok(EndorsementResponse {
                status,
                message,
                payload: Vec::new(),
            }),
            EndorsementBehavior::Fail(message) => Err(SessionError::peer(&peer.name, message)),
        }
    }

    async fn submit_for_ordering(
        &self,
        transaction: &EndorsedTransaction,
    ) -> SessionResult<OrderingResult> {
        self.shared.stats.submissions.inc();
        let behavior = self
            .shared
            .network_behavior
            .read()
            .expect("behavior lock poisoned")
            .clone();

        match behavior.ordering {
            OrderingBehavior::Accept => {}
            OrderingBehavior::Reject { status, info } => {
                return Ok(OrderingResult::rejected(status, info));
            }
            OrderingBehavior::Fail(message) => return Err(SessionError::Ordering(message)),
            OrderingBehavior::Hang => std::future::pending::<()>().await,
        }

        let status = behavior
            .invalidate_with
            .map_or(CommitStatus::Valid, CommitStatus::Invalid);

        if behavior.commit_delay.is_zero() {
            self.shared.commit(transaction, status);
        } else {
            let shared = Arc::clone(&self.shared);
            let transaction = transaction.clone();
            tokio::spawn(async move {
                tokio::time::sleep(behavior.commit_delay).await;
                shared.commit(&transaction, status);
            });
        }
        Ok(OrderingResult::success())
    }

    async fn subscribe_commit_events(
        &self,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
    ) -> SessionResult<CommitSubscription> {
        let hub = self
            .shared
            .hubs
            .get(&peer.name)
            .ok_or_else(|| SessionError::UnknownPeer(peer.name.clone()))?;
        let (id, receiver) = hub.register(transaction_id);
        let handle = HubSubscription::new(Arc::clone(hub), transaction_id.clone(), id);
        Ok(CommitSubscription::new(&peer.name, receiver, Box::new(handle)))
    }

    async fn query_peer(&self, peer: &PeerHandle, call: &ContractCall) -> SessionResult<Vec<u8>> {
        self.shared.stats.queries.inc();
        self.shared.check_peer(peer)?;
        let behavior = self.shared.peer_behavior(&peer.name);
        if !behavior.query_delay.is_zero() {
            tokio::time::sleep(behavior.query_delay).await;
        }
        match behavior.query {
            QueryBehavior::Serve => Ok(self
                .shared
                .ledger
                .read()
                .expect("ledger lock poisoned")
                .read(call)),
            QueryBehavior::Empty => Ok(Vec::new()),
            QueryBehavior::Fail(message) => Err(SessionError::peer(&peer.name, message)),
            QueryBehavior::Hang => std::future::pending().await,
        }
    }

    async fn query_transaction_details(
        &self,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
    ) -> SessionResult<ProcessedTransaction> {
        self.shared.stats.detail_lookups.inc();
        self.shared.check_peer(peer)?;
        let behavior = self.shared.peer_behavior(&peer.name).details;
        if let DetailsBehavior::Fail(message) = &behavior {
            return Err(SessionError::peer(&peer.name, message.clone()));
        }

        let mut record = self
            .shared
            .ledger
            .read()
            .expect("ledger lock poisoned")
            .transaction(transaction_id)
            .ok_or_else(|| SessionError::TransactionNotFound(transaction_id.to_string()))?;
        if behavior == DetailsBehavior::OmitTimestamp {
            record
                .transaction_envelope
                .payload
                .header
                .channel_header
                .timestamp = None;
        }
        Ok(record)
    }
}
