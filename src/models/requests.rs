//! Request DTOs for the node API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::collections::HashMap;

use serde::Deserialize;

/// Request body for the SET operation (PUT /set)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// Target group name
    pub group: String,
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds; omitted or 0 means never expires
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetRequest {
    /// Returns an error message if the request is invalid, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.group.is_empty() {
            return Some("group cannot be empty".to_string());
        }
        if self.key.is_empty() {
            return Some("key cannot be empty".to_string());
        }
        None
    }
}

/// Request body for the bulk read operation (POST /get_multi)
#[derive(Debug, Clone, Deserialize)]
pub struct GetMultiRequest {
    pub group: String,
    pub keys: Vec<String>,
}

/// Request body for the bulk write operation (PUT /set_multi)
#[derive(Debug, Clone, Deserialize)]
pub struct SetMultiRequest {
    pub group: String,
    pub values: HashMap<String, String>,
    /// TTL applied uniformly to every submitted key
    #[serde(default)]
    pub ttl: Option<i64>,
}

impl SetMultiRequest {
    pub fn validate(&self) -> Option<String> {
        if self.group.is_empty() {
            return Some("group cannot be empty".to_string());
        }
        if self.values.keys().any(|k| k.is_empty()) {
            return Some("keys cannot be empty".to_string());
        }
        None
    }
}
