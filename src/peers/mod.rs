//! Peers Module
//!
//! Abstractions for routing a key to its owning node and fetching from it,
//! plus the consistent-hash ring and the HTTP-backed implementation.

mod http_pool;
mod ring;

pub use http_pool::{HttpPeerClient, HttpPeerPool};
pub use ring::HashRing;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

// == Peer Client ==
/// Fetches a value for a group/key pair from one remote node.
#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Vec<u8>>;
}

// == Peer Picker ==
/// Selects the node that owns a key.
///
/// Returns None when no peer should be consulted - the ring is empty or the
/// owning node is this process - so the group falls through to its local
/// loader.
pub trait PeerPicker: Send + Sync {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerClient>>;
}
