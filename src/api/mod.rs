//! API Module
//!
//! HTTP handlers and routing for the cache node. The raw `/get` endpoint is
//! shared by clients and peers; the remaining endpoints manage entries and
//! expose statistics.
//!
//! # Endpoints
//! - `GET /get/:group/:key` - Retrieve raw value bytes (peer RPC surface)
//! - `PUT /set` - Store a key-value pair
//! - `DELETE /del/:group/:key` - Delete a key
//! - `POST /clear/:group` - Drop every entry in a group
//! - `GET /stats/:group` - Get cache statistics
//! - `POST /get_multi` - Bulk read of present keys
//! - `PUT /set_multi` - Bulk write with uniform TTL
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use routes::create_router;
