//! Peercache node - a distributed in-memory cache server
//!
//! Serves one cache node: the local cache engines, the group coordinator and
//! the HTTP surface that both clients and peers talk to.

mod api;
mod cache;
mod config;
mod error;
mod group;
mod models;
mod peers;
mod tasks;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::create_router;
use config::Config;
use error::CacheError;
use group::{Group, Loader};
use peers::HttpPeerPool;
use tasks::spawn_expiration_task;

/// Builds the demo group over a static slow data source.
fn create_scores_group(config: &Config) -> Arc<Group> {
    let db: HashMap<&'static str, &'static str> =
        HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]);

    let loader: Arc<dyn Loader> = Arc::new(move |key: &str| {
        info!(key, "slow db lookup");
        db.get(key)
            .map(|v| v.as_bytes().to_vec())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    });

    Group::with_options(
        "scores",
        config.cache_bytes,
        loader,
        config.default_ttl,
        config.strategy,
        config.lru_k,
    )
}

/// Main entry point for the cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the demo group and wire the peer pool
/// 4. Start the active-expiration task
/// 5. Create the Axum router with all endpoints
/// 6. Serve HTTP with graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peercache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting peercache node");

    let config = Config::from_env();
    info!(
        port = config.server_port,
        cache_bytes = config.cache_bytes,
        default_ttl = config.default_ttl,
        strategy = ?config.strategy,
        peers = config.peers.len(),
        "configuration loaded"
    );

    let group = create_scores_group(&config);

    if !config.peers.is_empty() {
        let pool = HttpPeerPool::new(&config.self_addr);
        pool.set_peers(&config.peers);
        group.register_peers(Arc::new(pool));
        info!(self_addr = %config.self_addr, "peer pool registered");
    }

    let expiry_handle = spawn_expiration_task(
        group.clone(),
        Duration::from_millis(config.expiry_tick_ms),
    );

    let app = create_router();

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            warn!(%addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };
    info!("node listening on http://{}", addr);

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(expiry_handle))
        .await
    {
        warn!(%err, "server error");
        std::process::exit(1);
    }

    info!("node shutdown complete");
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM), then stops the
/// expiration task.
async fn shutdown_signal(expiry_handle: JoinHandle<()>) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            warn!("failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
    }

    expiry_handle.abort();
}
