//! Metrics registry
//!
//! Relaxed atomic counters, readable at any time by an external collector.
//! Counters only increase, except `last_commit_latency_us` which holds the
//! latest observation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Operational counters of a datastore and its query engine
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    commits: AtomicU64,
    failed_commits: AtomicU64,
    rollbacks: AtomicU64,
    rows_added: AtomicU64,
    rows_removed: AtomicU64,
    /// Latency of the latest successful commit plus one; zero means none yet
    last_commit_latency_us: AtomicU64,
    queries_executed: AtomicU64,
    queries_rejected: AtomicU64,
    query_cache_hits: AtomicU64,
    fact_views_materialized: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Datastore

    pub fn record_commit(&self, latency: Duration, added: u64, removed: u64) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.rows_added.fetch_add(added, Ordering::Relaxed);
        self.rows_removed.fetch_add(removed, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX - 1);
        self.last_commit_latency_us.store(micros + 1, Ordering::Relaxed);
    }

    pub fn increment_failed_commits(&self) {
        self.failed_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rollbacks(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Latency of the latest successful commit
    pub fn last_commit_latency(&self) -> Option<Duration> {
        match self.last_commit_latency_us.load(Ordering::Relaxed) {
            0 => None,
            stored => Some(Duration::from_micros(stored - 1)),
        }
    }

    // Queries

    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_queries_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_query_cache_hits(&self) {
        self.query_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_fact_views(&self) {
        self.fact_views_materialized.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            failed_commits: self.failed_commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            rows_added: self.rows_added.load(Ordering::Relaxed),
            rows_removed: self.rows_removed.load(Ordering::Relaxed),
            last_commit_latency_us: self.last_commit_latency().map(|d| d.as_micros() as u64),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            query_cache_hits: self.query_cache_hits.load(Ordering::Relaxed),
            fact_views_materialized: self.fact_views_materialized.load(Ordering::Relaxed),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time copy of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub commits: u64,
    pub failed_commits: u64,
    pub rollbacks: u64,
    pub rows_added: u64,
    pub rows_removed: u64,
    pub last_commit_latency_us: Option<u64>,
    pub queries_executed: u64,
    pub queries_rejected: u64,
    pub query_cache_hits: u64,
    pub fact_views_materialized: u64,
}
