//! Write path: propose, endorse, order, await commit, retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use chronicle_session::{LedgerSession, SessionError};
use chronicle_types::{CommitStatus, ContractCall, WriteRequest};

use crate::commit::CommitWaiter;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::observer::{EngineObserver, Operation};
use crate::outcome::WriteOutcome;
use crate::proposal::{EndorsedProposal, ProposalSubmitter};
use crate::retry::RetryPolicy;
use crate::selector::PeerSelector;

/// Drives record writes to completion or a well-defined failure.
///
/// Every attempt picks its own peer and mints its own transaction id. The
/// commit listener is registered on the endorsing peer before the ordering
/// submission is awaited, and both are then driven concurrently.
#[derive(Clone)]
pub struct WriteOrchestrator {
    session: Arc<dyn LedgerSession>,
    config: Arc<EngineConfig>,
    selector: Arc<dyn PeerSelector>,
    submitter: ProposalSubmitter,
    waiter: CommitWaiter,
    observer: Arc<dyn EngineObserver>,
}

impl WriteOrchestrator {
    pub fn new(
        session: Arc<dyn LedgerSession>,
        config: Arc<EngineConfig>,
        selector: Arc<dyn PeerSelector>,
        observer: Arc<dyn EngineObserver>,
    ) -> Self {
        Self {
            session,
            submitter: ProposalSubmitter::new(Arc::clone(&config)),
            waiter: CommitWaiter::new(Arc::clone(&observer)),
            config,
            selector,
            observer,
        }
    }

    /// Write a record, retrying up to `request.max_attempts` times.
    ///
    /// Returns the last attempt's outcome. Malformed requests fail with
    /// `Precondition` and zero attempts, without touching the network.
    pub async fn write(&self, request: &WriteRequest) -> WriteOutcome {
        let policy = match check_preconditions(request) {
            Ok(policy) => policy,
            Err(err) => return WriteOutcome::failed(err),
        };

        let retried = policy
            .run(self.observer.as_ref(), move |_| self.attempt(request))
            .await;
        let mut outcome = retried.last;
        outcome.attempts = retried.attempts;
        outcome
    }

    /// One write of a raw contract call: no identifier insertion, no retry.
    pub async fn submit_once(&self, function: &str, args: Vec<String>, timeout: Duration) -> WriteOutcome {
        let call = ContractCall::new(self.config.contract.as_str(), function, args);
        let policy = match RetryPolicy::new(Operation::Write, 1) {
            Ok(policy) => policy,
            Err(err) => return WriteOutcome::failed(err),
        };

        let call = &call;
        let retried = policy
            .run(self.observer.as_ref(), move |_| async move {
                let peer = match self.selector.select(self.session.as_ref()) {
                    Ok(peer) => peer,
                    Err(err) => return WriteOutcome::failed(err),
                };
                match self
                    .submitter
                    .propose_call(self.session.as_ref(), &peer, call.clone())
                    .await
                {
                    Ok(endorsed) => self.order_and_wait(endorsed, timeout).await,
                    Err(err) => rejected_at(&peer.name, err),
                }
            })
            .await;
        let mut outcome = retried.last;
        outcome.attempts = retried.attempts;
        outcome
    }

    async fn attempt(&self, request: &WriteRequest) -> WriteOutcome {
        let peer = match self.selector.select(self.session.as_ref()) {
            Ok(peer) => peer,
            Err(err) => return WriteOutcome::failed(err),
        };
        match self
            .submitter
            .propose(self.session.as_ref(), &peer, request)
            .await
        {
            Ok(endorsed) => self.order_and_wait(endorsed, request.timeout).await,
            Err(err) => rejected_at(&peer.name, err),
        }
    }

    async fn order_and_wait(&self, endorsed: EndorsedProposal, timeout: Duration) -> WriteOutcome {
        // Ordering and the commit wait share one deadline per attempt.
        let deadline = Instant::now() + timeout;
        let mut outcome = WriteOutcome {
            succeeded: false,
            transaction_id: Some(endorsed.transaction_id().clone()),
            record_id: endorsed.record_id.clone(),
            peer: Some(endorsed.peer().name.clone()),
            commit_status: None,
            block_number: None,
            payload: endorsed.payload().to_vec(),
            attempts: 0,
            error: None,
        };

        let pending = match self
            .waiter
            .register(self.session.as_ref(), endorsed.peer(), endorsed.transaction_id())
            .await
        {
            Ok(pending) => pending,
            Err(err) => {
                outcome.error = Some(err);
                return outcome;
            }
        };

        let ordering = async {
            let submission = self.session.submit_for_ordering(&endorsed.transaction);
            let result = tokio::time::timeout_at(deadline, submission)
                .await
                .map_err(|_| {
                    EngineError::OrderingFailed(format!(
                        "no ordering response within {} ms",
                        duration_ms(timeout)
                    ))
                })?
                .map_err(ordering_error)?;
            if result.is_success() {
                debug!(tx_id = endorsed.transaction_id().short_id(), "ordering accepted");
                Ok(())
            } else {
                Err(EngineError::OrderingFailed(format!(
                    "status {}: {}",
                    result.status, result.info
                )))
            }
        };

        // A failed submission drops the pending wait, which unregisters
        // the listener.
        let event = match tokio::try_join!(ordering, pending.wait(timeout)) {
            Ok(((), event)) => event,
            Err(err) => {
                outcome.error = Some(err);
                return outcome;
            }
        };

        outcome.block_number = event.block_number;
        outcome.error = match &event.status {
            CommitStatus::Valid => None,
            CommitStatus::Invalid(code) => Some(EngineError::CommitRejected(code.clone())),
            CommitStatus::Timeout => Some(EngineError::CommitTimedOut {
                timeout_ms: duration_ms(timeout),
            }),
        };
        outcome.succeeded = outcome.error.is_none();
        outcome.commit_status = Some(event.status);
        outcome
    }
}

fn check_preconditions(request: &WriteRequest) -> EngineResult<RetryPolicy> {
    if request.payload.is_empty() {
        return Err(EngineError::precondition("payload must not be empty"));
    }
    let has_record_id = matches!(request.record_id.as_deref(), Some(id) if !id.is_empty());
    if !request.autogenerate_id && !has_record_id {
        return Err(EngineError::precondition(
            "a record id is required unless it is autogenerated",
        ));
    }
    RetryPolicy::new(Operation::Write, request.max_attempts)
}

fn rejected_at(peer: &str, err: EngineError) -> WriteOutcome {
    let mut outcome = WriteOutcome::failed(err);
    outcome.peer = Some(peer.to_string());
    outcome
}

fn ordering_error(err: SessionError) -> EngineError {
    match err {
        SessionError::Ordering(message) => EngineError::OrderingFailed(message),
        other => EngineError::OrderingFailed(other.to_string()),
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_session::{
        EventBehavior, InMemoryNetwork, NetworkBehavior, OrderingBehavior, PeerBehavior,
    };

    use crate::observer::EngineMetrics;
    use crate::selector::{RandomSelector, RoundRobinSelector};

    fn orchestrator_with(
        network: &InMemoryNetwork,
        selector: Arc<dyn PeerSelector>,
    ) -> (WriteOrchestrator, Arc<EngineMetrics>) {
        let metrics = Arc::new(EngineMetrics::new());
        let orchestrator = WriteOrchestrator::new(
            Arc::new(network.clone()),
            Arc::new(EngineConfig::new("registry")),
            selector,
            metrics.clone(),
        );
        (orchestrator, metrics)
    }

    fn orchestrator(network: &InMemoryNetwork) -> (WriteOrchestrator, Arc<EngineMetrics>) {
        orchestrator_with(network, Arc::new(RandomSelector))
    }

    #[tokio::test]
    async fn autogenerated_single_attempt_write_commits() {
        let network = InMemoryNetwork::with_peer_count("ch", 3);
        let (writer, _) = orchestrator(&network);
        let request = WriteRequest::new(["x"]).autogenerate_id().with_max_attempts(1);

        let outcome = writer.write(&request).await;
        assert!(outcome.succeeded, "{outcome:?}");
        let tx_id = outcome.transaction_id.clone().unwrap();
        assert_eq!(outcome.record_id.as_deref(), Some(tx_id.as_str()));
        assert_eq!(outcome.commit_status, Some(CommitStatus::Valid));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.error, None);
        assert!(!outcome.payload_text().is_empty());
        assert_eq!(network.read_record("registry", tx_id.as_str()), br#"["x"]"#.to_vec());
    }

    #[tokio::test]
    async fn malformed_requests_never_touch_the_network() {
        let network = InMemoryNetwork::with_peer_count("ch", 2);
        let (writer, metrics) = orchestrator(&network);

        let empty: Vec<String> = Vec::new();
        let cases = [
            WriteRequest::new(empty).with_record_id("k"),
            WriteRequest::new(["x"]),
            WriteRequest::new(["x"]).with_record_id(""),
            WriteRequest::new(["x"]).with_record_id("k").with_max_attempts(0),
        ];
        for request in &cases {
            let outcome = writer.write(request).await;
            assert!(!outcome.succeeded);
            assert_eq!(outcome.attempts, 0);
            assert!(matches!(outcome.error, Some(EngineError::Precondition(_))), "{outcome:?}");
        }
        assert_eq!(network.stats().network_calls(), 0);
        assert_eq!(metrics.snapshot().attempts, 0);
    }

    #[tokio::test]
    async fn always_failing_write_makes_exactly_n_attempts() {
        for n in 1..=4u32 {
            let network = InMemoryNetwork::with_peer_count("ch", 2);
            network.set_peer_behavior("peer0", PeerBehavior::failing("access denied"));
            network.set_peer_behavior("peer1", PeerBehavior::failing("access denied"));
            let (writer, metrics) = orchestrator(&network);

            let request = WriteRequest::new(["x"]).with_record_id("k").with_max_attempts(n);
            let outcome = writer.write(&request).await;

            assert!(!outcome.succeeded);
            assert_eq!(outcome.attempts, n);
            assert!(matches!(
                outcome.error,
                Some(EngineError::ProposalRejected { ref reason, .. }) if reason == "access denied"
            ));
            assert_eq!(network.stats().proposals, u64::from(n));
            assert_eq!(network.stats().submissions, 0);
            assert_eq!(metrics.snapshot().failures, u64::from(n));
        }
    }

    #[tokio::test]
    async fn retry_uses_a_fresh_peer_and_transaction() {
        let network = InMemoryNetwork::with_peer_count("ch", 2);
        network.set_peer_behavior("peer0", PeerBehavior::failing("peer down"));
        let (writer, metrics) = orchestrator_with(&network, Arc::new(RoundRobinSelector::new()));

        let outcome = writer
            .write(&WriteRequest::new(["x"]).autogenerate_id())
            .await;
        assert!(outcome.succeeded, "{outcome:?}");
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.peer.as_deref(), Some("peer1"));
        assert_eq!(network.stats().proposals, 2);
        let snap = metrics.snapshot();
        assert_eq!((snap.failures, snap.successes), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn late_commit_times_out_and_the_event_is_not_delivered() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        network.set_network_behavior(NetworkBehavior {
            commit_delay: Duration::from_secs(5),
            ..Default::default()
        });
        let (writer, metrics) = orchestrator(&network);

        let request = WriteRequest::new(["x"])
            .with_record_id("k")
            .with_timeout(Duration::from_millis(250))
            .with_max_attempts(2);
        let outcome = writer.write(&request).await;

        assert!(!outcome.succeeded);
        assert!(outcome.is_pending());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.error, Some(EngineError::CommitTimedOut { timeout_ms: 250 }));
        assert_eq!(network.active_listeners(), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let stats = network.stats();
        assert_eq!(stats.commits, 2);
        assert_eq!(stats.events_delivered, 0);
        assert_eq!(metrics.snapshot().commit_timeouts, 2);
    }

    #[tokio::test]
    async fn invalid_commit_is_a_rejection_with_the_code() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        network.set_network_behavior(NetworkBehavior {
            invalidate_with: Some("ENDORSEMENT_POLICY_FAILURE".into()),
            ..Default::default()
        });
        let (writer, _) = orchestrator(&network);

        let outcome = writer
            .write(&WriteRequest::new(["x"]).with_record_id("k").with_max_attempts(1))
            .await;
        assert_eq!(
            outcome.error,
            Some(EngineError::CommitRejected("ENDORSEMENT_POLICY_FAILURE".into()))
        );
        assert_eq!(
            outcome.commit_status,
            Some(CommitStatus::Invalid("ENDORSEMENT_POLICY_FAILURE".into()))
        );
        assert!(outcome.block_number.is_some());
        assert!(network.read_record("registry", "k").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn ordering_rejection_ends_the_attempt_without_waiting() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        network.set_network_behavior(NetworkBehavior {
            ordering: OrderingBehavior::Reject {
                status: "SERVICE_UNAVAILABLE".into(),
                info: "no leader".into(),
            },
            ..Default::default()
        });
        let (writer, _) = orchestrator(&network);

        let started = tokio::time::Instant::now();
        let outcome = writer
            .write(
                &WriteRequest::new(["x"])
                    .with_record_id("k")
                    .with_timeout(Duration::from_secs(30))
                    .with_max_attempts(1),
            )
            .await;

        assert_eq!(
            outcome.error,
            Some(EngineError::OrderingFailed("status SERVICE_UNAVAILABLE: no leader".into()))
        );
        assert_eq!(outcome.commit_status, None);
        assert!(started.elapsed() < Duration::from_secs(30));
        assert_eq!(network.active_listeners(), 0);
        assert_eq!(network.block_height(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_orderer_fails_each_attempt_at_the_deadline() {
        let network = InMemoryNetwork::with_peer_count("ch", 2);
        network.set_network_behavior(NetworkBehavior {
            ordering: OrderingBehavior::Hang,
            ..Default::default()
        });
        let (writer, metrics) = orchestrator(&network);

        let started = Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_secs(3600),
            writer.write(
                &WriteRequest::new(["x"])
                    .with_record_id("k")
                    .with_timeout(Duration::from_millis(250))
                    .with_max_attempts(2),
            ),
        )
        .await
        .expect("write must return once its attempts are spent");

        assert!(!outcome.succeeded);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            outcome.error,
            Some(EngineError::OrderingFailed("no ordering response within 250 ms".into()))
        );
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(network.stats().submissions, 2);
        assert_eq!(network.active_listeners(), 0);
        assert_eq!(metrics.snapshot().failures, 2);
    }

    #[tokio::test]
    async fn ordering_service_error_is_an_ordering_failure() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        network.set_network_behavior(NetworkBehavior {
            ordering: OrderingBehavior::Fail("connection refused".into()),
            ..Default::default()
        });
        let (writer, _) = orchestrator(&network);
        let outcome = writer
            .write(&WriteRequest::new(["x"]).with_record_id("k").with_max_attempts(1))
            .await;
        assert_eq!(
            outcome.error,
            Some(EngineError::OrderingFailed("connection refused".into()))
        );
    }

    #[tokio::test]
    async fn event_stream_failure_fails_the_attempt() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        network.set_peer_behavior(
            "peer0",
            PeerBehavior {
                events: EventBehavior::StreamError("socket closed".into()),
                ..Default::default()
            },
        );
        let (writer, _) = orchestrator(&network);
        let outcome = writer
            .write(&WriteRequest::new(["x"]).with_record_id("k").with_max_attempts(1))
            .await;
        assert!(matches!(outcome.error, Some(EngineError::EventStreamFailed { .. })));
    }

    #[tokio::test]
    async fn empty_session_reports_no_peers() {
        let network = InMemoryNetwork::new("ch", "u", Vec::new());
        let (writer, _) = orchestrator(&network);
        let outcome = writer
            .write(&WriteRequest::new(["x"]).with_record_id("k"))
            .await;
        assert_eq!(outcome.attempts, 2);
        assert!(matches!(outcome.error, Some(EngineError::NoPeersAvailable(_))));
    }

    #[tokio::test]
    async fn submit_once_keeps_raw_arguments_and_never_retries() {
        let network = InMemoryNetwork::with_peer_count("ch", 1);
        let (writer, _) = orchestrator(&network);

        let outcome = writer
            .submit_once("introducir", vec!["raw-key".into(), "v".into()], Duration::from_secs(1))
            .await;
        assert!(outcome.succeeded);
        assert_eq!(outcome.record_id, None);
        assert_eq!(network.read_record("registry", "raw-key"), br#"["v"]"#.to_vec());

        network.set_peer_behavior("peer0", PeerBehavior::failing("down"));
        let outcome = writer
            .submit_once("introducir", vec!["k".into()], Duration::from_secs(1))
            .await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(network.stats().proposals, 2);
    }
}
