//! Error types for the cache cluster
//!
//! Provides unified error handling using thiserror.
//!
//! The enum is `Clone` on purpose: a single-flight load distributes one
//! result to every waiting caller, errors included.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache cluster.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Empty key supplied to a get/set operation
    #[error("key is required")]
    EmptyKey,

    /// Key not found by the backing loader
    #[error("key not found: {0}")]
    NotFound(String),

    /// Named group has not been registered
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Invalid request data
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A peer RPC failed; the caller falls back to the local loader
    #[error("peer request failed: {0}")]
    PeerUnavailable(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) | CacheError::GroupNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::EmptyKey | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::PeerUnavailable(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache cluster.
pub type Result<T> = std::result::Result<T, CacheError>;
