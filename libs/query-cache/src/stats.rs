//! Cache statistics

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated by the orchestrator.
#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
    invalidations: AtomicU64,
    discards: AtomicU64,
}

impl StatCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discards.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize) -> CacheStats {
        CacheStats {
            entries,
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            write_count: self.writes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            invalidation_count: self.invalidations.load(Ordering::Relaxed),
            discard_count: self.discards.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current number of entries.
    pub entries: usize,
    /// Total reads served from cache without a fetch.
    pub hit_count: u64,
    /// Total reads that had to fetch.
    pub miss_count: u64,
    /// Total successful fetch commits.
    pub write_count: u64,
    /// Total fetches that failed after retries.
    pub failure_count: u64,
    /// Total invalidations.
    pub invalidation_count: u64,
    /// Total superseded fetch results disregarded.
    pub discard_count: u64,
}

impl CacheStats {
    /// Calculate hit rate percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            (self.hit_count as f64 / total as f64) * 100.0
        }
    }
}
