//! Read path: fan a query out to peers and aggregate their answers.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::debug;

use chronicle_session::LedgerSession;
use chronicle_types::{ContractCall, PeerHandle, QueryRequest, QueryTarget};

use crate::config::EngineConfig;
use crate::error::{peer_reason, EngineError, EngineResult};
use crate::observer::{EngineObserver, Operation};
use crate::outcome::QueryOutcome;
use crate::retry::RetryPolicy;
use crate::selector::PeerSelector;
use crate::write::duration_ms;

const NO_DATA: &str = "no data found";

/// Runs record queries against one or all peers, with retry.
#[derive(Clone)]
pub struct QueryOrchestrator {
    session: Arc<dyn LedgerSession>,
    config: Arc<EngineConfig>,
    selector: Arc<dyn PeerSelector>,
    observer: Arc<dyn EngineObserver>,
}

impl QueryOrchestrator {
    pub fn new(
        session: Arc<dyn LedgerSession>,
        config: Arc<EngineConfig>,
        selector: Arc<dyn PeerSelector>,
        observer: Arc<dyn EngineObserver>,
    ) -> Self {
        Self {
            session,
            config,
            selector,
            observer,
        }
    }

    /// Query a record, retrying up to `request.max_attempts` times.
    ///
    /// An attempt succeeds as soon as one peer returns a non-empty payload.
    /// When none does, it fails with one error entry per peer.
    pub async fn query(&self, request: &QueryRequest) -> QueryOutcome {
        let policy = match RetryPolicy::new(Operation::Query, request.max_attempts) {
            Ok(policy) => policy,
            Err(err) => return QueryOutcome::failed(err, 0),
        };

        let call = ContractCall::new(
            self.config.contract_for(request.contract.as_deref()),
            request
                .function
                .as_deref()
                .unwrap_or(&self.config.query_function),
            vec![request.key.clone()],
        );
        let call = &call;

        let retried = policy
            .run(self.observer.as_ref(), move |_| {
                self.attempt(call, &request.target, request.timeout)
            })
            .await;
        match retried.last {
            Ok(payload) => QueryOutcome::found(payload, retried.attempts),
            Err(err) => QueryOutcome::failed(err, retried.attempts),
        }
    }

    /// One read-only call on a single randomly chosen peer, no retry.
    ///
    /// The raw payload is returned even when empty.
    pub async fn evaluate_once(
        &self,
        function: &str,
        args: Vec<String>,
        timeout: Duration,
    ) -> EngineResult<Vec<u8>> {
        let peer = self.selector.select(self.session.as_ref())?;
        let call = ContractCall::new(self.config.contract.as_str(), function, args);
        match tokio::time::timeout(timeout, self.session.query_peer(&peer, &call)).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(err)) => {
                let reason = peer_reason(err);
                self.observer.query_peer_failed(&peer.name, &reason);
                Err(EngineError::QueryAllPeersFailed(vec![format!(
                    "{}: {reason}",
                    peer.name
                )]))
            }
            Err(_) => Err(EngineError::QueryTimedOut {
                timeout_ms: duration_ms(timeout),
            }),
        }
    }

    fn target_peers(&self, target: &QueryTarget) -> EngineResult<Vec<PeerHandle>> {
        let peers = match target {
            QueryTarget::AllPeers => self.session.list_peers(),
            QueryTarget::Peer(name) => {
                let peer = self
                    .session
                    .find_peer(name)
                    .ok_or_else(|| EngineError::NoPeersAvailable(format!("unknown peer {name}")))?;
                vec![peer]
            }
        };
        if peers.is_empty() {
            return Err(EngineError::NoPeersAvailable(format!(
                "channel {} has no peers",
                self.session.channel()
            )));
        }
        Ok(peers)
    }

    async fn attempt(
        &self,
        call: &ContractCall,
        target: &QueryTarget,
        timeout: Duration,
    ) -> EngineResult<Vec<u8>> {
        let peers = self.target_peers(target)?;
        let deadline = Instant::now() + timeout;

        let mut tasks = JoinSet::new();
        for peer in &peers {
            let session = Arc::clone(&self.session);
            let peer = peer.clone();
            let call = call.clone();
            tasks.spawn(async move {
                let result = session.query_peer(&peer, &call).await;
                (peer.name, result)
            });
        }

        let mut outstanding: Vec<String> = peers.iter().map(|p| p.name.clone()).collect();
        let mut errors = Vec::with_capacity(peers.len());
        let mut timed_out = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((peer, result)))) => {
                    outstanding.retain(|name| name != &peer);
                    let reason = match result {
                        Ok(payload) if !payload.is_empty() => {
                            debug!(peer = %peer, bytes = payload.len(), "query answered");
                            tasks.abort_all();
                            return Ok(payload);
                        }
                        Ok(_) => NO_DATA.to_string(),
                        Err(err) => peer_reason(err),
                    };
                    self.observer.query_peer_failed(&peer, &reason);
                    errors.push(format!("{peer}: {reason}"));
                }
                // Panicked or cancelled task; its peer stays outstanding.
                Ok(Some(Err(_))) => {}
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }
        tasks.abort_all();

        let reason = if timed_out {
            format!("no response within {} ms", duration_ms(timeout))
        } else {
            "query task failed".to_string()
        };
        for peer in &outstanding {
            self.observer.query_peer_failed(peer, &reason);
            errors.push(format!("{peer}: {reason}"));
        }

        if timed_out && matches!(target, QueryTarget::Peer(_)) {
            return Err(EngineError::QueryTimedOut {
                timeout_ms: duration_ms(timeout),
            });
        }
        Err(EngineError::QueryAllPeersFailed(errors))
    }
}
