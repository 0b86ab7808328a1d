//! API Handlers
//!
//! HTTP request handlers for each cache node endpoint. Handlers resolve the
//! target group through the process registry (groups register themselves at
//! construction), so one node serves every group registered in it and the
//! router carries no state of its own.

use std::sync::Arc;

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::error::{CacheError, Result};
use crate::group::{get_group, Group};
use crate::models::{
    AckResponse, GetMultiRequest, GetMultiResponse, HealthResponse, SetMultiRequest,
    SetRequest, StatsResponse,
};

fn lookup(name: &str) -> Result<Arc<Group>> {
    get_group(name).ok_or_else(|| CacheError::GroupNotFound(name.to_string()))
}

/// Handler for GET /get/:group/:key
///
/// Returns the raw value bytes. A miss goes through the group's load path
/// (owning peer, then local loader), so this endpoint doubles as the peer
/// RPC surface.
pub async fn get_handler(
    Path((group, key)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let group = lookup(&group)?;
    let value = group.get(&key).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        value.to_vec(),
    ))
}

/// Handler for PUT /set
pub async fn set_handler(Json(req): Json<SetRequest>) -> Result<Json<AckResponse>> {
    if let Some(message) = req.validate() {
        return Err(CacheError::InvalidRequest(message));
    }

    let group = lookup(&req.group)?;
    group.set(&req.key, req.value.as_bytes(), req.ttl.unwrap_or(0))?;

    Ok(Json(AckResponse::ok(format!("key '{}' set", req.key))))
}

/// Handler for DELETE /del/:group/:key
pub async fn delete_handler(
    Path((group, key)): Path<(String, String)>,
) -> Result<Json<AckResponse>> {
    let group = lookup(&group)?;
    group.delete(&key)?;

    Ok(Json(AckResponse::ok(format!("key '{}' deleted", key))))
}

/// Handler for POST /clear/:group
pub async fn clear_handler(Path(group): Path<String>) -> Result<Json<AckResponse>> {
    let group = lookup(&group)?;
    group.clear()?;

    Ok(Json(AckResponse::ok("cache cleared")))
}

/// Handler for GET /stats/:group
pub async fn stats_handler(Path(group): Path<String>) -> Result<Json<StatsResponse>> {
    let group = lookup(&group)?;
    Ok(Json(StatsResponse::from(group.stats())))
}

/// Handler for POST /get_multi
///
/// Best-effort: the response contains only the keys currently cached.
pub async fn get_multi_handler(
    Json(req): Json<GetMultiRequest>,
) -> Result<Json<GetMultiResponse>> {
    let group = lookup(&req.group)?;
    let values = group.get_multi(&req.keys);
    Ok(Json(GetMultiResponse::new(values)))
}

/// Handler for PUT /set_multi
pub async fn set_multi_handler(
    Json(req): Json<SetMultiRequest>,
) -> Result<Json<AckResponse>> {
    if let Some(message) = req.validate() {
        return Err(CacheError::InvalidRequest(message));
    }

    let group = lookup(&req.group)?;
    let values = req
        .values
        .into_iter()
        .map(|(k, v)| (k, v.into_bytes()))
        .collect();
    group.set_multi(&values, req.ttl.unwrap_or(0))?;

    Ok(Json(AckResponse::ok("values set")))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
