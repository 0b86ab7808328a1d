//! API gateway - routes client requests to the owning cache node
//!
//! A thin fan-out proxy: it keeps its own consistent-hash ring over the
//! configured cache nodes and forwards each request to the node that owns
//! the key, so clients need a single address for the whole cluster.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use peercache::peers::HashRing;

const DEFAULT_GROUP: &str = "scores";

/// Gateway state: the ring plus one HTTP client shared by all forwards.
#[derive(Clone)]
struct GatewayState {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    ring: HashRing,
    nodes: Vec<String>,
    http: reqwest::Client,
}

impl GatewayState {
    fn new(nodes: Vec<String>) -> Self {
        let mut ring = HashRing::new(50);
        ring.add(&nodes);
        Self {
            inner: Arc::new(GatewayInner {
                ring,
                nodes,
                http: reqwest::Client::new(),
            }),
        }
    }

    /// Cache node owning `key`, or 503 when the ring is empty.
    fn node_for(&self, key: &str) -> Result<String, Response> {
        self.inner.ring.get(key).map(String::from).ok_or_else(|| {
            (StatusCode::SERVICE_UNAVAILABLE, "no available cache nodes").into_response()
        })
    }
}

#[derive(Deserialize)]
struct KeyedQuery {
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    key: Option<String>,
}

impl KeyedQuery {
    fn group(&self) -> String {
        self.group.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string())
    }

    fn key(&self) -> Result<String, Response> {
        match &self.key {
            Some(key) if !key.is_empty() => Ok(key.clone()),
            _ => Err((StatusCode::BAD_REQUEST, "key is required").into_response()),
        }
    }
}

/// GET /api?group=&key= - proxy a read to the owning node.
async fn api_handler(
    State(state): State<GatewayState>,
    Query(query): Query<KeyedQuery>,
) -> Response {
    let key = match query.key() {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let node = match state.node_for(&key) {
        Ok(node) => node,
        Err(resp) => return resp,
    };

    let url = format!("{}/get/{}/{}", node, query.group(), key);
    match state.inner.http.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or_default();
            (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
        }
        Err(err) => {
            warn!(%err, node, key, "node request failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// POST|PUT /set?group=&key= with the value as the request body.
async fn set_handler(
    State(state): State<GatewayState>,
    Query(query): Query<KeyedQuery>,
    body: Bytes,
) -> Response {
    let key = match query.key() {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let node = match state.node_for(&key) {
        Ok(node) => node,
        Err(resp) => return resp,
    };

    let payload = serde_json::json!({
        "group": query.group(),
        "key": key,
        "value": String::from_utf8_lossy(&body).into_owned(),
        "ttl": 0,
    });

    match state
        .inner
        .http
        .put(format!("{}/set", node))
        .json(&payload)
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => (StatusCode::OK, "OK").into_response(),
        Ok(resp) => (resp.status(), "set failed").into_response(),
        Err(err) => {
            warn!(%err, node, key, "node request failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// GET /delete?group=&key= - forward a delete to the owning node.
async fn delete_handler(
    State(state): State<GatewayState>,
    Query(query): Query<KeyedQuery>,
) -> Response {
    let key = match query.key() {
        Ok(key) => key,
        Err(resp) => return resp,
    };
    let node = match state.node_for(&key) {
        Ok(node) => node,
        Err(resp) => return resp,
    };

    let url = format!("{}/del/{}/{}", node, query.group(), key);
    match state.inner.http.delete(&url).send().await {
        Ok(resp) if resp.status().is_success() => (StatusCode::OK, "OK").into_response(),
        Ok(resp) => (resp.status(), "delete failed").into_response(),
        Err(err) => {
            warn!(%err, node, key, "node request failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// GET /stats?group= - ask any node for the group's statistics.
async fn stats_handler(
    State(state): State<GatewayState>,
    Query(query): Query<KeyedQuery>,
) -> Response {
    let Some(node) = state.inner.nodes.first().cloned() else {
        return (StatusCode::SERVICE_UNAVAILABLE, "no available cache nodes").into_response();
    };

    let url = format!("{}/stats/{}", node, query.group());
    match state.inner.http.get(&url).send().await {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or_default();
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Err(err) => {
            warn!(%err, node, "node request failed");
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port: u16 = env::var("GATEWAY_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(9000);
    let nodes: Vec<String> = env::var("CACHE_NODES")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_else(|_| vec!["http://localhost:8001".to_string()]);

    info!(port, nodes = ?nodes, "starting api gateway");

    let state = GatewayState::new(nodes);
    let app = Router::new()
        .route("/api", get(api_handler))
        .route("/set", post(set_handler).put(set_handler))
        .route("/delete", get(delete_handler))
        .route("/stats", get(stats_handler))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            warn!(%addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };
    info!("gateway listening on http://{}", addr);

    if let Err(err) = axum::serve(listener, app).await {
        warn!(%err, "server error");
        std::process::exit(1);
    }
}
