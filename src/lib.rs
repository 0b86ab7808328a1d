//! Peercache - a distributed in-memory key-value cache
//!
//! Caches are organized into named groups, each fronting a slow loader with a
//! bounded LRU or LRU-K cache. Reads fan out across a peer cluster using
//! consistent hashing so that each key is cached on a single owning node.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod tasks;

pub use api::create_router;
pub use cache::{ByteView, CacheStats, CacheStore, Strategy};
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{get_group, Group, Loader, SingleFlight};
pub use tasks::{spawn_expiration_task, TaskPool};
