//! Consistent-Hash Ring Module
//!
//! Maps keys to peer identifiers through virtual nodes, so that adding a
//! peer to a ring of N reassigns roughly 1/(N+1) of the key space.

use std::collections::HashMap;

/// Virtual nodes per peer when none is specified.
const DEFAULT_REPLICAS: usize = 50;

/// Hash function applied to virtual-node labels and keys.
pub type HashFn = Box<dyn Fn(&[u8]) -> u32 + Send + Sync>;

// == Hash Ring ==
/// Sorted ring of virtual-node hashes with a hash -> peer map.
///
/// Not internally synchronized: the owning pool serializes mutation against
/// lookup.
pub struct HashRing {
    replicas: usize,
    hash: HashFn,
    /// Sorted virtual-node hashes
    keys: Vec<u32>,
    /// Virtual-node hash -> peer id
    nodes: HashMap<u32, String>,
}

impl HashRing {
    /// Creates a ring with CRC32 hashing. A `replicas` of zero falls back to
    /// the default of 50.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, Box::new(|data| crc32fast::hash(data)))
    }

    /// Creates a ring with a caller-supplied hash function.
    pub fn with_hash_fn(replicas: usize, hash: HashFn) -> Self {
        Self {
            replicas: if replicas == 0 {
                DEFAULT_REPLICAS
            } else {
                replicas
            },
            hash,
            keys: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    /// Adds peers to the ring, inserting `replicas` virtual nodes for each.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let hash = (self.hash)(format!("{}{}", i, peer).as_bytes());
                self.keys.push(hash);
                self.nodes.insert(hash, peer.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    /// Returns the peer owning `key`, or None if the ring is empty.
    ///
    /// Picks the first virtual node at or clockwise of the key's hash,
    /// wrapping to the start of the ring past the last node.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let mut idx = self.keys.partition_point(|&h| h < hash);
        if idx == self.keys.len() {
            idx = 0;
        }
        self.nodes.get(&self.keys[idx]).map(String::as_str)
    }

    /// True if the ring has no peers.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
