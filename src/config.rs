//! Configuration Module
//!
//! Handles loading and managing node configuration from environment variables.

use std::env;

use crate::cache::Strategy;

/// Cache node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Maximum cache size in bytes per group (0 = unbounded)
    pub cache_bytes: usize,
    /// Default TTL in seconds for entries without explicit TTL (0 = never expires)
    pub default_ttl: i64,
    /// Eviction strategy for the demo group
    pub strategy: Strategy,
    /// K value for LRU-K admission
    pub lru_k: usize,
    /// Base URLs of every cache node in the cluster, this node included
    pub peers: Vec<String>,
    /// This node's own base URL, used to skip self when picking peers
    pub self_addr: String,
    /// Active-expiration tick interval in milliseconds
    pub expiry_tick_ms: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8001)
    /// - `CACHE_BYTES` - Max cache bytes per group (default: 2 MiB)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 0, never expires)
    /// - `STRATEGY` - `lru` or `lru-k` (default: lru)
    /// - `LRU_K` - K value for LRU-K (default: 2)
    /// - `PEERS` - Comma-separated base URLs of all cache nodes
    /// - `SELF_ADDR` - This node's base URL (default: http://localhost:<port>)
    /// - `EXPIRY_TICK_MS` - Active-expiration tick in ms (default: 100)
    pub fn from_env() -> Self {
        let server_port: u16 = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8001);

        let strategy = match env::var("STRATEGY").as_deref() {
            Ok("lru-k") | Ok("lruk") => Strategy::LruK,
            _ => Strategy::Lru,
        };

        let peers = env::var("PEERS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let self_addr = env::var("SELF_ADDR")
            .unwrap_or_else(|_| format!("http://localhost:{}", server_port));

        Self {
            server_port,
            cache_bytes: env::var("CACHE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2 << 20),
            default_ttl: env::var("DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            strategy,
            lru_k: env::var("LRU_K")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            peers,
            self_addr,
            expiry_tick_ms: env::var("EXPIRY_TICK_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8001,
            cache_bytes: 2 << 20,
            default_ttl: 0,
            strategy: Strategy::Lru,
            lru_k: 2,
            peers: Vec::new(),
            self_addr: "http://localhost:8001".to_string(),
            expiry_tick_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 8001);
        assert_eq!(config.cache_bytes, 2 << 20);
        assert_eq!(config.default_ttl, 0);
        assert_eq!(config.strategy, Strategy::Lru);
        assert_eq!(config.lru_k, 2);
        assert!(config.peers.is_empty());
        assert_eq!(config.expiry_tick_ms, 100);
    }

    #[test]
    fn test_config_from_env_defaults() {
        env::remove_var("SERVER_PORT");
        env::remove_var("CACHE_BYTES");
        env::remove_var("DEFAULT_TTL");
        env::remove_var("STRATEGY");
        env::remove_var("LRU_K");
        env::remove_var("PEERS");
        env::remove_var("SELF_ADDR");
        env::remove_var("EXPIRY_TICK_MS");

        let config = Config::from_env();
        assert_eq!(config.server_port, 8001);
        assert_eq!(config.self_addr, "http://localhost:8001");
        assert_eq!(config.strategy, Strategy::Lru);
    }
}
