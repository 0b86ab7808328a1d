//! API Routes
//!
//! Configures the Axum router with all cache node endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, get_multi_handler, health_handler,
    set_handler, set_multi_handler, stats_handler,
};

/// Creates the node router with all endpoints configured.
///
/// Handlers resolve groups through the process registry, so the router
/// itself is stateless.
///
/// # Middleware
/// - CORS: allows any origin
/// - Tracing: logs all requests
pub fn create_router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/get/:group/:key", get(get_handler))
        .route("/set", put(set_handler))
        .route("/del/:group/:key", delete(delete_handler))
        .route("/clear/:group", post(clear_handler))
        .route("/stats/:group", get(stats_handler))
        .route("/get_multi", post(get_multi_handler))
        .route("/set_multi", put(set_multi_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
