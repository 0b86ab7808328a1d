//! Group Module
//!
//! A group is a named cache namespace bound to a loader. Reads go through
//! the cache facade first, then through a single-flight load that prefers
//! the key's owning peer and falls back to the local loader.

mod registry;
mod singleflight;

pub use registry::{get_group, reset_registry};
pub use singleflight::SingleFlight;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::cache::{ByteView, CacheStats, CacheStore, Strategy};
use crate::error::{CacheError, Result};
use crate::peers::PeerPicker;
use crate::tasks::TaskPool;

/// Pool sizing for peer fetches, matching the values the node has always run with.
const PEER_POOL_SIZE: usize = 10;
const PEER_POOL_QUEUE: usize = 1000;

// == Loader ==
/// The authoritative data source consulted on cache miss.
///
/// Loads are synchronous and blocking; the group runs them on the runtime's
/// blocking pool. The returned buffer is owned by the group from then on.
pub trait Loader: Send + Sync {
    fn load(&self, key: &str) -> Result<Vec<u8>>;
}

impl<F> Loader for F
where
    F: Fn(&str) -> Result<Vec<u8>> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self(key)
    }
}

// == Group ==
/// A cache namespace with its loader, peer picker and single-flight state.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    store: Arc<CacheStore>,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    flight: SingleFlight<Result<ByteView>>,
    default_ttl: i64,
    pool: TaskPool,
}

impl Group {
    /// Creates a group with LRU eviction and no default TTL, and registers
    /// it process-wide under `name`.
    pub fn new(name: &str, cache_bytes: usize, loader: Arc<dyn Loader>) -> Arc<Self> {
        Self::with_options(name, cache_bytes, loader, 0, Strategy::Lru, 2)
    }

    /// Creates a group with a default TTL in seconds (0 = never expires).
    pub fn with_ttl(
        name: &str,
        cache_bytes: usize,
        loader: Arc<dyn Loader>,
        default_ttl: i64,
    ) -> Arc<Self> {
        Self::with_options(name, cache_bytes, loader, default_ttl, Strategy::Lru, 2)
    }

    /// Creates a fully customized group.
    ///
    /// Must be called within a tokio runtime; the group owns a worker pool
    /// for peer fetches.
    pub fn with_options(
        name: &str,
        cache_bytes: usize,
        loader: Arc<dyn Loader>,
        default_ttl: i64,
        strategy: Strategy,
        k: usize,
    ) -> Arc<Self> {
        let group = Arc::new(Self {
            name: name.to_string(),
            loader,
            store: Arc::new(CacheStore::new(cache_bytes, strategy, k)),
            peers: OnceLock::new(),
            flight: SingleFlight::new(),
            default_ttl,
            pool: TaskPool::new(PEER_POOL_SIZE, PEER_POOL_QUEUE),
        });
        registry::register(group.clone());
        group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers the peer picker. Calling this twice is a programming error.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peers.set(picker).is_err() {
            panic!("register_peers called more than once");
        }
    }

    // == Get ==
    /// Fetches the value for `key`, loading it on miss with the group's
    /// default TTL.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        self.get_with_ttl(key, self.default_ttl).await
    }

    /// Fetches the value for `key`; a miss populates the cache with `ttl`.
    pub async fn get_with_ttl(&self, key: &str, ttl: i64) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }

        if let Some(value) = self.store.get(key) {
            debug!(group = %self.name, key, "cache hit");
            self.store.record_hit();
            return Ok(value);
        }
        self.store.record_miss();

        let fut = Self::load(
            self.name.clone(),
            self.store.clone(),
            self.loader.clone(),
            self.peers.get().cloned(),
            self.pool.clone(),
            key.to_string(),
            ttl,
        );
        let (result, _shared) = self.flight.run(key, fut).await;
        result
    }

    /// One complete load: try the owning peer, fall back to the local
    /// loader, write the value through with `ttl`.
    ///
    /// Runs inside the single-flight, so every concurrent caller for `key`
    /// observes this one invocation. The write-through happens before the
    /// result is handed back to any waiter.
    async fn load(
        name: String,
        store: Arc<CacheStore>,
        loader: Arc<dyn Loader>,
        peers: Option<Arc<dyn PeerPicker>>,
        pool: TaskPool,
        key: String,
        ttl: i64,
    ) -> Result<ByteView> {
        if let Some(picker) = peers {
            if let Some(peer) = picker.pick_peer(&key) {
                let (tx, rx) = oneshot::channel();
                let peer_group = name.clone();
                let peer_key = key.clone();
                pool.submit(async move {
                    let _ = tx.send(peer.get(&peer_group, &peer_key).await);
                });

                match rx.await {
                    Ok(Ok(bytes)) => {
                        let value = ByteView::from(bytes);
                        store.add(&key, value.clone(), ttl);
                        return Ok(value);
                    }
                    Ok(Err(err)) => {
                        warn!(group = %name, key, %err, "failed to get from peer");
                    }
                    Err(_) => {
                        warn!(group = %name, key, "peer fetch task dropped");
                    }
                }
            }
        }

        let local_key = key.clone();
        let bytes = tokio::task::spawn_blocking(move || loader.load(&local_key))
            .await
            .map_err(|err| CacheError::Internal(err.to_string()))??;

        let value = ByteView::from(bytes);
        store.add(&key, value.clone(), ttl);
        Ok(value)
    }

    // == Set ==
    /// Stores `value` under `key` with `ttl` seconds (0 = never expires).
    pub fn set(&self, key: &str, value: &[u8], ttl: i64) -> Result<()> {
        if key.is_empty() {
            return Err(CacheError::EmptyKey);
        }
        self.store.add(key, ByteView::copy_from(value), ttl);
        Ok(())
    }

    /// Removes `key` from the local cache.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key);
        Ok(())
    }

    /// Drops every cached entry in this group.
    pub fn clear(&self) -> Result<()> {
        self.store.clear();
        Ok(())
    }

    // == Multi ==
    /// Best-effort bulk read: returns the submap of keys currently cached.
    /// Missing keys are not loaded.
    pub fn get_multi(&self, keys: &[String]) -> HashMap<String, Vec<u8>> {
        let mut result = HashMap::new();
        for key in keys {
            if let Some(value) = self.store.get(key) {
                self.store.record_hit();
                result.insert(key.clone(), value.to_vec());
            } else {
                self.store.record_miss();
            }
        }
        result
    }

    /// Bulk write with a uniform TTL.
    pub fn set_multi(&self, values: &HashMap<String, Vec<u8>>, ttl: i64) -> Result<()> {
        for (key, value) in values {
            self.store.add(key, ByteView::copy_from(value), ttl);
        }
        Ok(())
    }

    /// Returns this group's cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Removes every entry whose TTL is already due, one store-lock
    /// acquisition per entry. Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let mut removed = 0;
        while let Some(key) = self.store.remove_expired_once() {
            debug!(group = %self.name, key = %key, "expired entry removed");
            removed += 1;
        }
        removed
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn score_loader(loads: Arc<AtomicU64>) -> Arc<dyn Loader> {
        let db: HashMap<&str, &str> =
            [("Tom", "630"), ("Jack", "589"), ("Sam", "567")].into();
        Arc::new(move |key: &str| {
            loads.fetch_add(1, Ordering::SeqCst);
            db.get(key)
                .map(|v| v.as_bytes().to_vec())
                .ok_or_else(|| CacheError::NotFound(key.to_string()))
        })
    }

    #[tokio::test]
    async fn test_get_loads_then_hits() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-basic", 2 << 10, score_loader(loads.clone()));

        let value = group.get("Tom").await.unwrap();
        assert_eq!(value.as_bytes(), b"630");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // second read is served from cache
        let value = group.get("Tom").await.unwrap();
        assert_eq!(value.as_bytes(), b"630");
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let stats = group.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_key_propagates_loader_error() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-unknown", 2 << 10, score_loader(loads));

        let err = group.get("Unknown").await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound(_)));
        // a failed load is never cached
        let err = group.get("Unknown").await.unwrap_err();
        assert!(matches!(err, CacheError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-empty", 2 << 10, score_loader(loads));

        assert!(matches!(group.get("").await, Err(CacheError::EmptyKey)));
        assert!(matches!(group.set("", b"v", 0), Err(CacheError::EmptyKey)));
    }

    #[tokio::test]
    async fn test_set_then_expire_falls_back_to_loader() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::with_ttl("group-test-ttl", 2 << 10, score_loader(loads.clone()), 5);

        group.set("Tom", b"999", 2).unwrap();
        assert_eq!(group.get("Tom").await.unwrap().as_bytes(), b"999");
        assert_eq!(loads.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;

        // the override expired, so the loader answers again
        assert_eq!(group.get("Tom").await.unwrap().as_bytes(), b"630");
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_gets_load_once() {
        let loads = Arc::new(AtomicU64::new(0));
        let slow_loads = loads.clone();
        let loader: Arc<dyn Loader> = Arc::new(move |key: &str| {
            slow_loads.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            Ok(format!("value-{}", key).into_bytes())
        });
        let group = Group::new("group-test-flight", 2 << 10, loader);

        let mut handles = Vec::new();
        for _ in 0..100 {
            let group = group.clone();
            handles.push(tokio::spawn(async move { group.get("k").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().as_bytes(), b"value-k");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-delete", 2 << 10, score_loader(loads.clone()));

        group.set("Tom", b"630", 0).unwrap();
        group.delete("Tom").unwrap();
        // deleted, so the loader is consulted again
        group.get("Tom").await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        group.clear().unwrap();
        assert_eq!(group.stats().item_count, 0);
    }

    #[tokio::test]
    async fn test_get_multi_returns_present_subset() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-multi", 2 << 10, score_loader(loads.clone()));

        let mut values = HashMap::new();
        values.insert("a".to_string(), b"1".to_vec());
        values.insert("b".to_string(), b"2".to_vec());
        group.set_multi(&values, 0).unwrap();

        let got = group.get_multi(&[
            "a".to_string(),
            "b".to_string(),
            "missing".to_string(),
        ]);
        assert_eq!(got.len(), 2);
        assert_eq!(got.get("a"), Some(&b"1".to_vec()));
        // get_multi never loads
        assert_eq!(loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-registry", 2 << 10, score_loader(loads));

        let found = get_group("group-test-registry").expect("group is registered");
        assert_eq!(found.name(), group.name());
        assert!(get_group("no-such-group").is_none());
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-sweep", 2 << 10, score_loader(loads));

        group.set("short", b"v", 1).unwrap();
        group.set("long", b"v", 600).unwrap();
        group.set("forever", b"v", 0).unwrap();

        assert_eq!(group.sweep_expired(), 0);
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(group.sweep_expired(), 1);
        assert_eq!(group.stats().item_count, 2);
    }

    #[tokio::test]
    #[should_panic(expected = "register_peers called more than once")]
    async fn test_double_register_peers_panics() {
        use crate::peers::{PeerClient, PeerPicker};

        struct NoPeers;
        impl PeerPicker for NoPeers {
            fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerClient>> {
                None
            }
        }

        let loads = Arc::new(AtomicU64::new(0));
        let group = Group::new("group-test-double-reg", 2 << 10, score_loader(loads));
        group.register_peers(Arc::new(NoPeers));
        group.register_peers(Arc::new(NoPeers));
    }
}
