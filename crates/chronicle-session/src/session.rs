use async_trait::async_trait;
use tokio::sync::oneshot;

use chronicle_types::{
    CommitEvent, ContractCall, EndorsedTransaction, EndorsementResponse, OrderingResult,
    PeerHandle, ProcessedTransaction, ProposalRequest, TransactionId,
};

use crate::error::{SessionError, SessionResult};

/// An initialized connection to one ledger channel.
///
/// Implementations are shared read-only between concurrent orchestrations,
/// so every method takes `&self` and the peer list is handed out as an
/// owned snapshot.
#[async_trait]
pub trait LedgerSession: Send + Sync {
    /// Name of the channel this session is bound to.
    fn channel(&self) -> &str;

    /// Identity that signs proposals; mixed into transaction ids.
    fn creator(&self) -> &str;

    /// Snapshot of the peers currently known to the session.
    fn list_peers(&self) -> Vec<PeerHandle>;

    /// Look up a known peer by name.
    fn find_peer(&self, name: &str) -> Option<PeerHandle> {
        self.list_peers().into_iter().find(|p| p.name == name)
    }

    /// Send a proposal to `peer` for endorsement.
    ///
    /// `Err` means the peer answered with an error object; a non-200
    /// response is returned as `Ok` and judged by the caller.
    async fn send_endorsement_proposal(
        &self,
        peer: &PeerHandle,
        proposal: &ProposalRequest,
    ) -> SessionResult<EndorsementResponse>;

    /// Hand an endorsed transaction to the ordering service.
    async fn submit_for_ordering(
        &self,
        transaction: &EndorsedTransaction,
    ) -> SessionResult<OrderingResult>;

    /// Register a commit listener for `transaction_id` on `peer`'s event
    /// service. The listener is connected when this returns.
    async fn subscribe_commit_events(
        &self,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
    ) -> SessionResult<CommitSubscription>;

    /// Evaluate a read-only contract call on one peer.
    async fn query_peer(&self, peer: &PeerHandle, call: &ContractCall) -> SessionResult<Vec<u8>>;

    /// Fetch the ledger record of a committed transaction from `peer`.
    async fn query_transaction_details(
        &self,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
    ) -> SessionResult<ProcessedTransaction>;
}

/// Control side of a live event registration.
pub trait Subscription: Send + Sync {
    /// Unregister the listener and disconnect from the event service.
    /// Calling it more than once is a no-op.
    fn cancel(&self);

    fn is_active(&self) -> bool;
}

/// A registered, single-fire commit listener.
///
/// Dropping the subscription cancels it, so a listener never outlives the
/// wait that created it.
pub struct CommitSubscription {
    peer: String,
    events: Option<oneshot::Receiver<SessionResult<CommitEvent>>>,
    handle: Box<dyn Subscription>,
}

impl CommitSubscription {
    pub fn new(
        peer: impl Into<String>,
        events: oneshot::Receiver<SessionResult<CommitEvent>>,
        handle: Box<dyn Subscription>,
    ) -> Self {
        Self {
            peer: peer.into(),
            events: Some(events),
            handle,
        }
    }

    /// Wait for the notification. Only the first call observes it.
    pub async fn next_event(&mut self) -> SessionResult<CommitEvent> {
        let Some(events) = self.events.take() else {
            return Err(SessionError::event_stream(&self.peer, "notification already consumed"));
        };
        match events.await {
            Ok(result) => result,
            Err(_) => Err(SessionError::event_stream(&self.peer, "event service disconnected")),
        }
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_active()
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl Drop for CommitSubscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

impl std::fmt::Debug for CommitSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitSubscription")
            .field("peer", &self.peer)
            .field("active", &self.handle.is_active())
            .finish()
    }
}
