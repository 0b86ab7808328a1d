//! Response DTOs for the node API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;

use crate::cache::CacheStats;

/// Acknowledgement for mutating operations (set, delete, clear).
#[derive(Debug, Clone, Serialize)]
pub struct AckResponse {
    pub success: bool,
    pub message: String,
}

impl AckResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats/:group)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub item_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub total_count: u64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            item_count: stats.item_count,
            hit_count: stats.hit_count,
            miss_count: stats.miss_count,
            total_count: stats.total_count,
        }
    }
}

/// Response body for the bulk read endpoint (POST /get_multi)
#[derive(Debug, Clone, Serialize)]
pub struct GetMultiResponse {
    /// Keys currently cached, with values rendered as UTF-8
    pub values: HashMap<String, String>,
}

impl GetMultiResponse {
    pub fn new(values: HashMap<String, Vec<u8>>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k, String::from_utf8_lossy(&v).into_owned()))
                .collect(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
