//! Engine lifecycle reporting.
//!
//! The orchestrators never log or count on their own; they report to an
//! [`EngineObserver`] handed to them at construction. [`TracingObserver`]
//! turns reports into `tracing` events, [`EngineMetrics`] counts them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};

use chronicle_types::{CommitEvent, CommitStatus, TransactionId};

use crate::error::EngineError;

/// The orchestrated operation an attempt belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Write,
    Query,
    Details,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Write => "write",
            Self::Query => "query",
            Self::Details => "details",
        })
    }
}

/// Receives lifecycle events from the engine. Every method has a no-op
/// default.
pub trait EngineObserver: Send + Sync {
    fn attempt_started(&self, _operation: Operation, _attempt: u32, _max_attempts: u32) {}

    fn attempt_failed(&self, _operation: Operation, _attempt: u32, _error: &EngineError) {}

    fn attempt_succeeded(&self, _operation: Operation, _attempt: u32) {}

    /// A commit wait finished, with a notification or a timeout.
    fn commit_resolved(&self, _peer: &str, _event: &CommitEvent) {}

    /// One peer of a multi-peer query answered empty or failed.
    fn query_peer_failed(&self, _peer: &str, _reason: &str) {}

    fn detail_lookup_failed(&self, _transaction_id: &TransactionId, _error: &EngineError) {}
}

/// Observer that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {}

// ---------------------------------------------------------------------------
// TracingObserver
// ---------------------------------------------------------------------------

/// Default observer: emits structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn attempt_started(&self, operation: Operation, attempt: u32, max_attempts: u32) {
        debug!(%operation, attempt, max_attempts, "attempt started");
    }

    fn attempt_failed(&self, operation: Operation, attempt: u32, error: &EngineError) {
        warn!(%operation, attempt, kind = error.kind(), error = %error, "attempt failed");
    }

    fn attempt_succeeded(&self, operation: Operation, attempt: u32) {
        info!(%operation, attempt, "attempt succeeded");
    }

    fn commit_resolved(&self, peer: &str, event: &CommitEvent) {
        match &event.status {
            CommitStatus::Valid => debug!(
                peer,
                tx_id = event.transaction_id.short_id(),
                block = ?event.block_number,
                "transaction committed"
            ),
            CommitStatus::Timeout => warn!(
                peer,
                tx_id = event.transaction_id.short_id(),
                "no commit notification before deadline"
            ),
            CommitStatus::Invalid(code) => warn!(
                peer,
                tx_id = event.transaction_id.short_id(),
                code = code.as_str(),
                "transaction invalidated"
            ),
        }
    }

    fn query_peer_failed(&self, peer: &str, reason: &str) {
        debug!(peer, reason, "peer query failed");
    }

    fn detail_lookup_failed(&self, transaction_id: &TransactionId, error: &EngineError) {
        warn!(tx_id = transaction_id.short_id(), error = %error, "transaction detail lookup failed");
    }
}

// ---------------------------------------------------------------------------
// EngineMetrics
// ---------------------------------------------------------------------------

/// Observer that counts lifecycle events with atomics.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    commit_timeouts: AtomicU64,
    commit_rejections: AtomicU64,
    query_peer_failures: AtomicU64,
    detail_failures: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub commit_timeouts: u64,
    pub commit_rejections: u64,
    pub query_peer_failures: u64,
    pub detail_failures: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::SeqCst),
            successes: self.successes.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            commit_timeouts: self.commit_timeouts.load(Ordering::SeqCst),
            commit_rejections: self.commit_rejections.load(Ordering::SeqCst),
            query_peer_failures: self.query_peer_failures.load(Ordering::SeqCst),
            detail_failures: self.detail_failures.load(Ordering::SeqCst),
        }
    }
}

impl EngineObserver for EngineMetrics {
    fn attempt_started(&self, _operation: Operation, _attempt: u32, _max_attempts: u32) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn attempt_failed(&self, _operation: Operation, _attempt: u32, _error: &EngineError) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn attempt_succeeded(&self, _operation: Operation, _attempt: u32) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn commit_resolved(&self, _peer: &str, event: &CommitEvent) {
        match event.status {
            CommitStatus::Valid => {}
            CommitStatus::Timeout => {
                self.commit_timeouts.fetch_add(1, Ordering::SeqCst);
            }
            CommitStatus::Invalid(_) => {
                self.commit_rejections.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn query_peer_failed(&self, _peer: &str, _reason: &str) {
        self.query_peer_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn detail_lookup_failed(&self, _transaction_id: &TransactionId, _error: &EngineError) {
        self.detail_failures.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_count_each_kind() {
        let metrics = EngineMetrics::new();
        let tx = TransactionId::derive(&[9; 24], "u");

        metrics.attempt_started(Operation::Write, 1, 2);
        metrics.attempt_failed(Operation::Write, 1, &EngineError::CommitTimedOut { timeout_ms: 10 });
        metrics.attempt_started(Operation::Write, 2, 2);
        metrics.attempt_succeeded(Operation::Write, 2);
        metrics.commit_resolved("peer0", &CommitEvent::timeout(tx.clone()));
        metrics.commit_resolved("peer0", &CommitEvent::new(tx.clone(), CommitStatus::Invalid("X".into()), 4));
        metrics.commit_resolved("peer0", &CommitEvent::new(tx, CommitStatus::Valid, 5));
        metrics.query_peer_failed("peer1", "no data found");

        let snap = metrics.snapshot();
        assert_eq!(snap.attempts, 2);
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.successes, 1);
        assert_eq!(snap.commit_timeouts, 1);
        assert_eq!(snap.commit_rejections, 1);
        assert_eq!(snap.query_peer_failures, 1);
        assert_eq!(snap.detail_failures, 0);
    }

    #[test]
    fn operation_labels() {
        assert_eq!(Operation::Write.to_string(), "write");
        assert_eq!(Operation::Details.to_string(), "details");
    }
}
