//! LRU-K Engine Module
//!
//! LRU with an admission gate: a key enters the cache only after it has been
//! observed K times (misses and write attempts both count). This keeps
//! one-shot scans from flushing the working set.
//!
//! Like the LRU engine, it is serialized by [`CacheStore`](super::CacheStore).

use std::collections::HashMap;

use crate::cache::entry::{expires_at_for, now_unix, Entry};
use crate::cache::heap::ExpiryHeap;
use crate::cache::list::EntryList;
use crate::cache::lru::EvictionCallback;
use crate::cache::ByteView;

/// Default admission threshold when an invalid K is supplied.
const DEFAULT_K: usize = 2;

// == LRU-K Engine ==
/// Least-recently-used cache with a K-observation admission gate.
pub struct LrukCache {
    /// Admission threshold: observations required before a key is cached
    k: usize,
    max_bytes: usize,
    nbytes: usize,
    list: EntryList,
    index: HashMap<String, usize>,
    /// Per-key timestamps of the most recent observations, at most K each.
    /// Only uncached or not-yet-admitted keys accumulate here; the record is
    /// purged when the promoted entry is removed.
    history: HashMap<String, Vec<i64>>,
    heap: ExpiryHeap,
    on_evicted: Option<EvictionCallback>,
}

impl LrukCache {
    /// Creates an empty cache. A `k` of zero falls back to the default of 2.
    pub fn new(max_bytes: usize, k: usize, on_evicted: Option<EvictionCallback>) -> Self {
        Self {
            k: if k == 0 { DEFAULT_K } else { k },
            max_bytes,
            nbytes: 0,
            list: EntryList::new(),
            index: HashMap::new(),
            history: HashMap::new(),
            heap: ExpiryHeap::new(),
            on_evicted,
        }
    }

    // == Add ==
    /// Inserts or overwrites `key` with `value`.
    ///
    /// An uncached key must first earn admission: the write is recorded in
    /// the key's history and the value is only stored once the key has been
    /// observed at least K times. Overwrites of cached keys apply directly.
    pub fn add(&mut self, key: &str, value: ByteView, ttl: i64) {
        let expires_at = expires_at_for(ttl);
        let now = now_unix();

        if let Some(&idx) = self.index.get(key) {
            self.list.move_to_front(idx);
            let entry = self.list.get_mut(idx);
            let old_len = entry.value.len();
            let old_expires_at = entry.expires_at;
            entry.value = value;
            entry.expires_at = expires_at;
            entry.last_access = now;
            self.nbytes = self.nbytes - old_len + entry.value.len();

            if old_expires_at > 0 {
                self.heap.remove(key);
            }
            if expires_at > 0 {
                self.heap.push(key, expires_at);
            }
        } else {
            if !self.observe(key, now) {
                return;
            }

            // admitted: promote into the recency list
            self.nbytes += key.len() + value.len();
            let idx = self.list.push_front(Entry {
                key: key.to_string(),
                value,
                expires_at,
                last_access: now,
            });
            self.index.insert(key.to_string(), idx);
            if expires_at > 0 {
                self.heap.push(key, expires_at);
            }
        }

        while self.max_bytes > 0 && self.nbytes > self.max_bytes {
            self.remove_oldest();
        }
    }

    // == Get ==
    /// Looks up `key`.
    ///
    /// A hit refreshes recency and `last_access` after a lazy expiry check.
    /// A miss records one observation toward admission and returns None; the
    /// engine never loads data itself.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        if let Some(&idx) = self.index.get(key) {
            if self.list.get(idx).is_expired(now_unix()) {
                self.remove_at(idx);
                return None;
            }
            self.list.move_to_front(idx);
            let entry = self.list.get_mut(idx);
            entry.last_access = now_unix();
            return Some(entry.value.clone());
        }

        self.observe(key, now_unix());
        None
    }

    // == Remove ==
    /// Removes `key` and its access history. Returns true if the key was cached.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&idx) => {
                self.remove_at(idx);
                true
            }
            None => {
                self.history.remove(key);
                false
            }
        }
    }

    /// Evicts the least recently used entry.
    pub fn remove_oldest(&mut self) {
        if let Some(idx) = self.list.back() {
            self.remove_at(idx);
        }
    }

    /// Removes one expired entry, driven by the expiry-heap root.
    /// See [`LruCache::remove_expired_once`](super::lru::LruCache::remove_expired_once).
    pub fn remove_expired_once(&mut self, now: i64) -> Option<String> {
        let item = self.heap.pop_expired(now)?;
        if let Some(&idx) = self.index.get(&item.key) {
            self.remove_at(idx);
        }
        Some(item.key)
    }

    /// Drops every entry and all access history without firing the callback.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.history.clear();
        self.heap.clear();
        self.nbytes = 0;
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Records one observation of `key` at `now` and reports whether the key
    /// has now cleared the admission threshold.
    fn observe(&mut self, key: &str, now: i64) -> bool {
        let history = self.history.entry(key.to_string()).or_default();
        history.push(now);
        if history.len() > self.k {
            let excess = history.len() - self.k;
            history.drain(..excess);
        }
        history.len() >= self.k
    }

    fn remove_at(&mut self, idx: usize) {
        let entry = self.list.remove(idx);
        self.index.remove(&entry.key);
        self.nbytes -= entry.weight();
        if entry.expires_at > 0 {
            self.heap.remove(&entry.key);
        }
        self.history.remove(&entry.key);
        if let Some(cb) = self.on_evicted.as_mut() {
            cb(&entry.key, &entry.value);
        }
    }

    #[cfg(test)]
    pub(crate) fn nbytes(&self) -> usize {
        self.nbytes
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self, key: &str) -> usize {
        self.history.get(key).map(|h| h.len()).unwrap_or(0)
    }
}
