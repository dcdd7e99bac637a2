use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use chronicle_session::LedgerSession;
use chronicle_types::{PeerHandle, ProcessedTransaction, TransactionId};

use crate::error::{peer_reason, EngineError, EngineResult};
use crate::observer::{EngineObserver, Operation};
use crate::outcome::DetailOutcome;
use crate::retry::RetryPolicy;
use crate::selector::{FirstPeerSelector, PeerSelector};
use crate::write::duration_ms;

/// Ledger record of a committed transaction and its commit time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedDetails {
    pub timestamp: DateTime<Utc>,
    pub record: ProcessedTransaction,
}

/// Looks up committed transactions on the ledger.
#[derive(Clone)]
pub struct DetailResolver {
    session: Arc<dyn LedgerSession>,
    selector: Arc<dyn PeerSelector>,
    observer: Arc<dyn EngineObserver>,
}

impl DetailResolver {
    pub fn new(
        session: Arc<dyn LedgerSession>,
        selector: Arc<dyn PeerSelector>,
        observer: Arc<dyn EngineObserver>,
    ) -> Self {
        Self {
            session,
            selector,
            observer,
        }
    }

    /// Fetch the record and its channel header timestamp.
    ///
    /// Each attempt draws its own peer; a record without a timestamp counts
    /// as a failed attempt.
    pub async fn resolve_details(
        &self,
        transaction_id: &TransactionId,
        max_attempts: u32,
        timeout: Duration,
    ) -> EngineResult<ResolvedDetails> {
        let policy = RetryPolicy::new(Operation::Details, max_attempts)?;
        let retried = policy
            .run(self.observer.as_ref(), move |_| self.attempt(transaction_id, timeout))
            .await;
        if let Err(err) = &retried.last {
            self.observer.detail_lookup_failed(transaction_id, err);
        }
        retried.last
    }

    /// Single lookup on a named peer, or on the channel's default (first)
    /// peer when none is given.
    pub async fn fetch(
        &self,
        transaction_id: &TransactionId,
        peer: Option<&str>,
        timeout: Duration,
    ) -> DetailOutcome {
        let result = async {
            let peer = match peer {
                Some(name) => self
                    .session
                    .find_peer(name)
                    .ok_or_else(|| EngineError::NoPeersAvailable(format!("unknown peer {name}")))?,
                None => FirstPeerSelector.select(self.session.as_ref())?,
            };
            self.lookup(&peer, transaction_id, timeout).await
        }
        .await;

        if let Err(err) = &result {
            self.observer.detail_lookup_failed(transaction_id, err);
        }
        DetailOutcome::from(result)
    }

    async fn attempt(
        &self,
        transaction_id: &TransactionId,
        timeout: Duration,
    ) -> EngineResult<ResolvedDetails> {
        let peer = self.selector.select(self.session.as_ref())?;
        let record = self.lookup(&peer, transaction_id, timeout).await?;
        let timestamp = record.commit_timestamp().ok_or_else(|| {
            EngineError::DetailLookupFailed(format!(
                "{}: record of {} carries no timestamp",
                peer.name,
                transaction_id.short_id()
            ))
        })?;
        Ok(ResolvedDetails { timestamp, record })
    }

    async fn lookup(
        &self,
        peer: &PeerHandle,
        transaction_id: &TransactionId,
        timeout: Duration,
    ) -> EngineResult<ProcessedTransaction> {
        let lookup = self.session.query_transaction_details(peer, transaction_id);
        match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(err)) => Err(EngineError::DetailLookupFailed(format!(
                "{}: {}",
                peer.name,
                peer_reason(err)
            ))),
            Err(_) => Err(EngineError::DetailLookupFailed(format!(
                "{}: no response within {} ms",
                peer.name,
                duration_ms(timeout)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_session::{DetailsBehavior, InMemoryNetwork, PeerBehavior};
    use chronicle_types::WriteRequest;

    use crate::config::EngineConfig;
    use crate::observer::EngineMetrics;
    use crate::selector::{RandomSelector, RoundRobinSelector};
    use crate::write::WriteOrchestrator;

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn committed(network: &InMemoryNetwork) -> TransactionId {
        let writer = WriteOrchestrator::new(
            Arc::new(network.clone()),
            Arc::new(EngineConfig::new("registry")),
            Arc::new(RandomSelector),
            Arc::new(EngineMetrics::new()),
        );
        let outcome = writer
            .write(&WriteRequest::new(["x"]).autogenerate_id())
            .await;
        assert!(outcome.succeeded, "{outcome:?}");
        outcome.transaction_id.unwrap()
    }

    fn resolver(
        network: &InMemoryNetwork,
        selector: Arc<dyn PeerSelector>,
    ) -> (DetailResolver, Arc<EngineMetrics>) {
        let metrics = Arc::new(EngineMetrics::new());
        (
            DetailResolver::new(Arc::new(network.clone()), selector, metrics.clone()),
            metrics,
        )
    }

    #[tokio::test]
    async fn resolves_timestamp_of_committed_write() {
        let network = InMemoryNetwork::with_peer_count("ch", 3);
        let tx = committed(&network).await;
        let (resolver, _) = resolver(&network, Arc::new(RandomSelector));

        let details = resolver.resolve_details(&tx, 2, TIMEOUT).await.unwrap();
        assert_eq!(details.record.transaction_id(), &tx);
        assert_eq!(Some(details.timestamp), details.record.commit_timestamp());
        assert!(details.record.validation_code.is_valid());
    }

    #[tokio::test]
    async fn missing_timestamp_moves_on_to_another_peer() {
        let network = InMemoryNetwork::with_peer_count("ch", 2);
        let tx = committed(&network).await;
        network.set_peer_behavior(
            "peer0",
            PeerBehavior {
                details: DetailsBehavior::OmitTimestamp,
                ..Default::default()
            },
        );
        let (resolver, metrics) = resolver(&network, Arc::new(RoundRobinSelector::new()));

        let details = resolver.resolve_details(&tx, 2, TIMEOUT).await.unwrap();
        assert!(details.record.commit_timestamp().is_some());
        let snap = metrics.snapshot();
        assert_eq!((snap.attempts, snap.failures), (2, 1));
        assert_eq!(snap.detail_failures, 0);
    }

    #[tokio::test]
    async fn exhausted_lookup_reports_detail_failure() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        let tx = committed(&network).await;
        network.set_peer_behavior("peer0", PeerBehavior::failing("ledger unavailable"));
        let (resolver, metrics) = resolver(&network, Arc::new(RandomSelector));

        let err = resolver.resolve_details(&tx, 3, TIMEOUT).await.unwrap_err();
        assert_eq!(err, EngineError::DetailLookupFailed("peer0: ledger unavailable".into()));
        assert_eq!(network.stats().detail_lookups, 3);
        assert_eq!(metrics.snapshot().detail_failures, 1);
    }

    #[tokio::test]
    async fn fetch_uses_the_default_peer_once() {
        let network = InMemoryNetwork::with_peer_count("ch", 2);
        let tx = committed(&network).await;
        network.set_peer_behavior("peer1", PeerBehavior::failing("down"));
        let (resolver, _) = resolver(&network, Arc::new(RandomSelector));

        let outcome = resolver.fetch(&tx, None, TIMEOUT).await;
        assert!(outcome.succeeded);
        assert!(outcome.timestamp().is_some());

        let outcome = resolver.fetch(&tx, Some("peer1"), TIMEOUT).await;
        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.error,
            Some(EngineError::DetailLookupFailed("peer1: down".into()))
        );
        assert_eq!(network.stats().detail_lookups, 2);
    }

    #[tokio::test]
    async fn unknown_transaction_is_a_lookup_failure() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        let (resolver, _) = resolver(&network, Arc::new(RandomSelector));
        let tx = TransactionId::derive(&[4; 24], "nobody");
        let outcome = resolver.fetch(&tx, None, TIMEOUT).await;
        assert!(matches!(outcome.error, Some(EngineError::DetailLookupFailed(_))));
        assert_eq!(outcome.result, None);
    }
}
