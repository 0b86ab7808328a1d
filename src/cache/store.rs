//! Cache Store Module
//!
//! Facade presenting a uniform API over the LRU and LRU-K engines. A single
//! mutex serializes every engine call; hit/miss counters live outside the
//! lock and are recorded by the group coordinator, which decides what counts
//! as one logical get.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::cache::entry::now_unix;
use crate::cache::lru::LruCache;
use crate::cache::lru_k::LrukCache;
use crate::cache::{ByteView, CacheStats};

// == Strategy ==
/// Eviction strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Classical least-recently-used eviction
    Lru,
    /// LRU with a K-observation admission gate
    LruK,
}

enum Engine {
    Lru(LruCache),
    LruK(LrukCache),
}

// == Cache Store ==
/// Synchronized facade over one eviction engine.
pub struct CacheStore {
    max_bytes: usize,
    strategy: Strategy,
    k: usize,
    /// Engine slot; built lazily on first write so a zero-capacity store can
    /// be created without allocating engine state
    engine: Mutex<Option<Engine>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStore {
    /// Creates a store for the given capacity and strategy.
    ///
    /// # Arguments
    /// * `max_bytes` - Maximum byte weight per engine, 0 for unbounded
    /// * `strategy` - Eviction strategy
    /// * `k` - Admission threshold, used by [`Strategy::LruK`] only
    pub fn new(max_bytes: usize, strategy: Strategy, k: usize) -> Self {
        Self {
            max_bytes,
            strategy,
            k,
            engine: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // == Add ==
    /// Stores `key` with the given TTL in seconds (0 = never expires).
    pub fn add(&self, key: &str, value: ByteView, ttl: i64) {
        let mut guard = self.engine.lock();
        match guard.get_or_insert_with(|| self.build_engine()) {
            Engine::Lru(lru) => lru.add(key, value, ttl),
            Engine::LruK(lruk) => lruk.add(key, value, ttl),
        }
    }

    // == Get ==
    /// Looks up `key`. Does not record hit/miss; callers do.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let mut guard = self.engine.lock();
        match guard.as_mut()? {
            Engine::Lru(lru) => lru.get(key),
            Engine::LruK(lruk) => lruk.get(key),
        }
    }

    // == Delete ==
    /// Removes `key`. Returns true if it was cached.
    pub fn delete(&self, key: &str) -> bool {
        let mut guard = self.engine.lock();
        match guard.as_mut() {
            Some(Engine::Lru(lru)) => lru.remove(key),
            Some(Engine::LruK(lruk)) => lruk.remove(key),
            None => false,
        }
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&self) {
        let mut guard = self.engine.lock();
        match guard.as_mut() {
            Some(Engine::Lru(lru)) => lru.clear(),
            Some(Engine::LruK(lruk)) => lruk.clear(),
            None => {}
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let mut guard = self.engine.lock();
        match guard.as_mut() {
            Some(Engine::Lru(lru)) => lru.len(),
            Some(Engine::LruK(lruk)) => lruk.len(),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes one expired entry if any is due. The expiration task loops on
    /// this so the engine lock is released between evictions.
    pub fn remove_expired_once(&self) -> Option<String> {
        let now = now_unix();
        let mut guard = self.engine.lock();
        match guard.as_mut()? {
            Engine::Lru(lru) => lru.remove_expired_once(now),
            Engine::LruK(lruk) => lruk.remove_expired_once(now),
        }
    }

    // == Stats ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns current statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.len(),
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    fn build_engine(&self) -> Engine {
        match self.strategy {
            Strategy::Lru => Engine::Lru(LruCache::new(self.max_bytes, None)),
            Strategy::LruK => Engine::LruK(LrukCache::new(self.max_bytes, self.k, None)),
        }
    }
}
