//! HTTP Peer Pool Module
//!
//! PeerPicker backed by a consistent-hash ring over the cluster's node URLs,
//! with one HTTP client per remote node. The node API's raw `/get` endpoint
//! doubles as the peer RPC surface.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CacheError, Result};
use crate::peers::{HashRing, PeerClient, PeerPicker};

const DEFAULT_REPLICAS: usize = 50;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

struct PoolInner {
    ring: HashRing,
    clients: HashMap<String, Arc<HttpPeerClient>>,
}

// == HTTP Peer Pool ==
/// Cluster membership for one node: the ring plus per-peer clients.
///
/// `set_peers` rebuilds both atomically under the pool mutex; lookups take
/// the same mutex, so a lookup never observes a half-built ring.
pub struct HttpPeerPool {
    self_addr: String,
    inner: Mutex<PoolInner>,
}

impl HttpPeerPool {
    /// Creates an empty pool for the node listening at `self_addr`.
    pub fn new(self_addr: &str) -> Self {
        Self {
            self_addr: self_addr.to_string(),
            inner: Mutex::new(PoolInner {
                ring: HashRing::new(DEFAULT_REPLICAS),
                clients: HashMap::new(),
            }),
        }
    }

    /// Replaces the pool's peer set. Clients are built for every peer except
    /// this node itself.
    pub fn set_peers(&self, peers: &[String]) {
        let mut ring = HashRing::new(DEFAULT_REPLICAS);
        ring.add(peers);

        let mut clients = HashMap::new();
        for peer in peers {
            if peer != &self.self_addr {
                clients.insert(peer.clone(), Arc::new(HttpPeerClient::new(peer)));
            }
        }

        let mut inner = self.inner.lock();
        inner.ring = ring;
        inner.clients = clients;
    }
}

impl PeerPicker for HttpPeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>> {
        let inner = self.inner.lock();
        let peer = inner.ring.get(key)?;
        if peer == self.self_addr {
            return None;
        }
        debug!(peer, key, "picked peer");
        inner
            .clients
            .get(peer)
            .cloned()
            .map(|c| c as Arc<dyn PeerClient>)
    }
}

// == HTTP Peer Client ==
/// Fetches values from one remote node over its raw `/get` endpoint.
pub struct HttpPeerClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>> {
        let url = format!("{}/get/{}/{}", self.base_url, group, key);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| CacheError::PeerUnavailable(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CacheError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(CacheError::PeerUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| CacheError::PeerUnavailable(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_picks_nobody() {
        let pool = HttpPeerPool::new("http://localhost:8001");
        assert!(pool.pick_peer("key").is_none());
    }

    #[test]
    fn test_self_is_never_picked() {
        let pool = HttpPeerPool::new("http://localhost:8001");
        pool.set_peers(&["http://localhost:8001".to_string()]);

        // the only peer is this node, so every lookup falls through
        for key in ["a", "b", "c", "d"] {
            assert!(pool.pick_peer(key).is_none());
        }
    }

    #[test]
    fn test_remote_peers_are_pickable() {
        let pool = HttpPeerPool::new("http://localhost:8001");
        pool.set_peers(&[
            "http://localhost:8001".to_string(),
            "http://localhost:8002".to_string(),
            "http://localhost:8003".to_string(),
        ]);

        let mut picked_any = false;
        for i in 0..32 {
            if pool.pick_peer(&format!("key-{}", i)).is_some() {
                picked_any = true;
            }
        }
        assert!(picked_any, "some keys must land on remote peers");
    }

    #[test]
    fn test_set_peers_replaces_membership() {
        let pool = HttpPeerPool::new("http://localhost:8001");
        pool.set_peers(&[
            "http://localhost:8001".to_string(),
            "http://localhost:8002".to_string(),
        ]);
        pool.set_peers(&["http://localhost:8001".to_string()]);

        for i in 0..16 {
            assert!(pool.pick_peer(&format!("key-{}", i)).is_none());
        }
    }
}
