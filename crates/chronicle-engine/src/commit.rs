use std::sync::Arc;
use std::time::Duration;

use chronicle_session::{CommitSubscription, LedgerSession, SessionError};
use chronicle_types::{CommitEvent, PeerHandle, TransactionId};

use crate::error::{EngineError, EngineResult};
use crate::observer::EngineObserver;

/// Waits for a transaction's commit notification, bounded by a timer.
#[derive(Clone)]
pub struct CommitWaiter {
    observer: Arc<dyn EngineObserver>,
}

impl CommitWaiter {
    pub fn new(observer: Arc<dyn EngineObserver>) -> Self {
        Self { observer }
    }

    /// Register a listener on `peer` for `transaction_id`.
    ///
    /// The listener is live when this returns, so an ordering submission
    /// started afterwards cannot race past it.
    pub async fn register(
        &self,
        session: &dyn LedgerSession,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
    ) -> EngineResult<PendingCommit> {
        let subscription = session
            .subscribe_commit_events(peer, transaction_id)
            .await
            .map_err(|err| stream_error(&peer.name, err))?;
        Ok(PendingCommit {
            subscription,
            transaction_id: transaction_id.clone(),
            observer: Arc::clone(&self.observer),
        })
    }

    /// Register and wait in one step.
    pub async fn await_commit(
        &self,
        session: &dyn LedgerSession,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
        timeout: Duration,
    ) -> EngineResult<CommitEvent> {
        self.register(session, peer, transaction_id)
            .await?
            .wait(timeout)
            .await
    }
}

/// A registered commit listener. Dropping it unregisters the listener.
pub struct PendingCommit {
    subscription: CommitSubscription,
    transaction_id: TransactionId,
    observer: Arc<dyn EngineObserver>,
}

impl PendingCommit {
    pub fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Race the notification against `timeout`.
    ///
    /// The timer winning yields a `TIMEOUT` event, not an error; the
    /// listener is cancelled before it is returned.
    pub async fn wait(mut self, timeout: Duration) -> EngineResult<CommitEvent> {
        let raced = tokio::time::timeout(timeout, self.subscription.next_event()).await;
        let event = match raced {
            Ok(Ok(event)) => event,
            Ok(Err(err)) => return Err(stream_error(self.subscription.peer(), err)),
            Err(_) => {
                self.subscription.cancel();
                CommitEvent::timeout(self.transaction_id.clone())
            }
        };
        self.observer
            .commit_resolved(self.subscription.peer(), &event);
        Ok(event)
    }
}

impl std::fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCommit")
            .field("transaction_id", &self.transaction_id)
            .field("subscription", &self.subscription)
            .finish()
    }
}

fn stream_error(peer: &str, err: SessionError) -> EngineError {
    match err {
        SessionError::EventStream { peer, message } => EngineError::EventStreamFailed {
            peer,
            reason: message,
        },
        other => EngineError::EventStreamFailed {
            peer: peer.to_string(),
            reason: other.to_string(),
        },
    }
}
