use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::oneshot;
use tracing::debug;

use chronicle_types::{CommitEvent, TransactionId};

use crate::error::{SessionError, SessionResult};
use crate::memory::behavior::EventBehavior;
use crate::memory::stats::NetworkStats;
use crate::session::Subscription;

type Sender = oneshot::Sender<SessionResult<CommitEvent>>;

/// A listener waiting on one transaction id.
struct Listener {
    id: u64,
    sender: Sender,
}

/// One peer's event service: commit listeners keyed by transaction id.
pub(crate) struct EventHub {
    peer: String,
    listeners: RwLock<HashMap<TransactionId, Vec<Listener>>>,
    next_id: AtomicU64,
    stats: Arc<NetworkStats>,
}

impl EventHub {
    pub(crate) fn new(peer: impl Into<String>, stats: Arc<NetworkStats>) -> Self {
        Self {
            peer: peer.into(),
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            stats,
        }
    }

    /// Register a listener. Returns its id and the receiving end.
    pub(crate) fn register(
        &self,
        transaction_id: &TransactionId,
    ) -> (u64, oneshot::Receiver<SessionResult<CommitEvent>>) {
        let (sender, receiver) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .expect("event hub lock poisoned")
            .entry(transaction_id.clone())
            .or_default()
            .push(Listener { id, sender });
        self.stats.subscriptions.inc();
        debug!(peer = %self.peer, tx_id = transaction_id.short_id(), listener = id, "commit listener registered");
        (id, receiver)
    }

    /// Remove a listener. Returns `true` if it was still registered.
    pub(crate) fn unregister(&self, transaction_id: &TransactionId, id: u64) -> bool {
        let mut listeners = self.listeners.write().expect("event hub lock poisoned");
        let Some(waiting) = listeners.get_mut(transaction_id) else {
            return false;
        };
        let before = waiting.len();
        waiting.retain(|l| l.id != id);
        let removed = waiting.len() < before;
        if waiting.is_empty() {
            listeners.remove(transaction_id);
        }
        removed
    }

    /// Route a commit event to every listener registered for its
    /// transaction. Listeners are single-fire and removed on dispatch.
    pub(crate) fn dispatch(&self, event: &CommitEvent, behavior: &EventBehavior) {
        if matches!(behavior, EventBehavior::Silent) {
            return;
        }
        let waiting = self
            .listeners
            .write()
            .expect("event hub lock poisoned")
            .remove(&event.transaction_id)
            .unwrap_or_default();

        if waiting.is_empty() {
            self.stats.events_dropped.inc();
            debug!(peer = %self.peer, tx_id = event.transaction_id.short_id(), "commit event with no listener");
            return;
        }

        for listener in waiting {
            let message = match behavior {
                EventBehavior::StreamError(msg) => {
                    Err(SessionError::event_stream(&self.peer, msg.clone()))
                }
                _ => Ok(event.clone()),
            };
            // The receiver may have been dropped between removal and send.
            if listener.sender.send(message).is_ok() {
                self.stats.events_delivered.inc();
            } else {
                self.stats.events_dropped.inc();
            }
        }
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .expect("event hub lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

/// Cancellation handle given out with each [`crate::CommitSubscription`].
pub(crate) struct HubSubscription {
    hub: Arc<EventHub>,
    transaction_id: TransactionId,
    id: u64,
    active: AtomicBool,
}

impl HubSubscription {
    pub(crate) fn new(hub: Arc<EventHub>, transaction_id: TransactionId, id: u64) -> Self {
        Self {
            hub,
            transaction_id,
            id,
            active: AtomicBool::new(true),
        }
    }
}

impl Subscription for HubSubscription {
    fn cancel(&self) {
        if self.active.swap(false, Ordering::SeqCst)
            && self.hub.unregister(&self.transaction_id, self.id)
        {
            self.hub.stats.cancellations.inc();
            debug!(peer = %self.hub.peer, tx_id = self.transaction_id.short_id(), listener = self.id, "commit listener unregistered");
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
