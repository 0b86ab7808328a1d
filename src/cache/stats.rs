//! Cache Statistics Module
//!
//! Hit/miss counters and derived totals for a cache facade.

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Current number of entries in the cache
    pub item_count: usize,
    /// Number of gets answered from the cache
    pub hit_count: u64,
    /// Number of gets that had to go to a peer or the loader
    pub miss_count: u64,
    /// Total gets observed (hits + misses)
    pub total_count: u64,
}

impl CacheStats {
    pub fn new(item_count: usize, hit_count: u64, miss_count: u64) -> Self {
        Self {
            item_count,
            hit_count,
            miss_count,
            total_count: hit_count + miss_count,
        }
    }

    /// Cache hit rate, or 0.0 before any request has been observed.
    pub fn hit_rate(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.hit_count as f64 / self.total_count as f64
        }
    }
}
