//! Cache Statistics Module
//!
//! Tracks how the fail-open cache manager is performing, including how
//! often the backend failed and the request silently fell through.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Lock-free counters shared by every request handler.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    read_failures: AtomicU64,
    write_failures: AtomicU64,
    invalidations: AtomicU64,
    stale_populates: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`], as served by `GET /cache/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that fell through to the store
    pub misses: u64,
    /// Successful populates
    pub writes: u64,
    /// Backend or decode failures on read (counted as misses too)
    pub read_failures: u64,
    /// Backend or encode failures on populate or eviction
    pub write_failures: u64,
    /// Invalidation rounds executed
    pub invalidations: u64,
    /// Populates discarded because an invalidation overtook the read
    pub stale_populates: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_populate(&self) {
        self.stale_populates.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Reads every counter and derives the hit rate.
    pub fn snapshot(&self) -> StatsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        StatsSnapshot {
            hits,
            misses,
            writes: self.writes.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            stale_populates: self.stale_populates.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let snapshot = CacheStats::new().snapshot();
        assert_eq!(snapshot, StatsSnapshot::default());
    }

    #[test]
    fn test_hit_rate_no_requests() {
        assert_eq!(CacheStats::new().snapshot().hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert_eq!(stats.snapshot().hit_rate, 0.75);
    }

    #[test]
    fn test_failure_counters() {
        let stats = CacheStats::new();
        stats.record_read_failure();
        stats.record_write_failure();
        stats.record_write_failure();
        stats.record_stale_populate();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.read_failures, 1);
        assert_eq!(snapshot.write_failures, 2);
        assert_eq!(snapshot.stale_populates, 1);
    }
}
