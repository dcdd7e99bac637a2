use std::sync::atomic::{AtomicUsize, Ordering};

use rand::seq::SliceRandom;

use chronicle_session::LedgerSession;
use chronicle_types::PeerHandle;

use crate::error::{EngineError, EngineResult};

/// Policy choosing which peer handles a request.
pub trait PeerSelector: Send + Sync {
    /// Pick one peer out of a snapshot. `None` only for an empty slice.
    fn choose(&self, peers: &[PeerHandle]) -> Option<PeerHandle>;

    /// Pick a peer from the session's current peer set.
    fn select(&self, session: &dyn LedgerSession) -> EngineResult<PeerHandle> {
        let peers = session.list_peers();
        self.choose(&peers).ok_or_else(|| {
            EngineError::NoPeersAvailable(format!("channel {} has no peers", session.channel()))
        })
    }
}

/// Uniform random choice, no health weighting.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl PeerSelector for RandomSelector {
    fn choose(&self, peers: &[PeerHandle]) -> Option<PeerHandle> {
        peers.choose(&mut rand::thread_rng()).cloned()
    }
}

/// Always the first peer of the snapshot: the channel's default peer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstPeerSelector;

impl PeerSelector for FirstPeerSelector {
    fn choose(&self, peers: &[PeerHandle]) -> Option<PeerHandle> {
        peers.first().cloned()
    }
}

/// Cycles through the snapshot in order, one step per selection.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    next: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeerSelector for RoundRobinSelector {
    fn choose(&self, peers: &[PeerHandle]) -> Option<PeerHandle> {
        if peers.is_empty() {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % peers.len();
        peers.get(index).cloned()
    }
}
