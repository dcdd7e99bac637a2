use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Traffic counters of an [`crate::InMemoryNetwork`].
#[derive(Debug, Default)]
pub struct NetworkStats {
    pub proposals: Counter,
    pub submissions: Counter,
    pub commits: Counter,
    pub subscriptions: Counter,
    pub cancellations: Counter,
    pub events_delivered: Counter,
    /// Commit events that found no listener (or a dropped one).
    pub events_dropped: Counter,
    pub queries: Counter,
    pub detail_lookups: Counter,
}

impl NetworkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            proposals: self.proposals.get(),
            submissions: self.submissions.get(),
            commits: self.commits.get(),
            subscriptions: self.subscriptions.get(),
            cancellations: self.cancellations.get(),
            events_delivered: self.events_delivered.get(),
            events_dropped: self.events_dropped.get(),
            queries: self.queries.get(),
            detail_lookups: self.detail_lookups.get(),
        }
    }
}

/// Point-in-time copy of [`NetworkStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub proposals: u64,
    pub submissions: u64,
    pub commits: u64,
    pub subscriptions: u64,
    pub cancellations: u64,
    pub events_delivered: u64,
    pub events_dropped: u64,
    pub queries: u64,
    pub detail_lookups: u64,
}

impl StatsSnapshot {
    /// Total calls that reached the network.
    pub fn network_calls(&self) -> u64 {
        self.proposals + self.submissions + self.subscriptions + self.queries + self.detail_lookups
    }
}
