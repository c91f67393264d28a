//! Cache Statistics Module
//!
//! Tracks how often a fetcher was served from cache versus upstream.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Hit Counters ==
/// Lock-free hit/miss counters owned by a fetcher.
#[derive(Debug, Default)]
pub struct HitCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot of the counters alongside the current entry count.
    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            total_entries,
        )
    }
}

// == Cache Stats ==
/// Point-in-time statistics for one resource kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Fetches served from cache
    pub hits: u64,
    /// Fetches that went upstream
    pub misses: u64,
    /// Entries currently stored, including expired ones not yet swept
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl CacheStats {
    // == Constructor ==
    pub fn new(hits: u64, misses: u64, total_entries: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        Self {
            hits,
            misses,
            total_entries,
            hit_rate,
        }
    }
}
