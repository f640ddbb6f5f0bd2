//! Workspace routes.
//!
//! Mutations stream through `BackendClient::proxy`; reads go through the
//! fetch wrapper and come back as decoded JSON.

use axum::{
    body::Body,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use serde_json::Value;

use crate::error::RelayError;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::upstream::{is_safe_path_segment, ForwardedRequest, ProxyMethod};

const WORKSPACES: &str = "/workspaces";

async fn forward(
    state: &AppState,
    method: ProxyMethod,
    endpoint: String,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response<Body>, RelayError> {
    state
        .backend
        .proxy(ForwardedRequest {
            method,
            endpoint,
            token: state.access_token(headers),
            body,
            request_id: request_id(headers),
        })
        .await
}

fn workspace_endpoint(id: &str) -> Result<String, RelayError> {
    if !is_safe_path_segment(id) {
        return Err(RelayError::BadRequest("Invalid workspace id".into()));
    }
    Ok(format!("{WORKSPACES}/{id}"))
}

pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, RelayError> {
    let token = state.access_token(&headers);
    let workspaces = state
        .backend
        .fetch_with_user::<Value>(WORKSPACES, token.as_deref())
        .await?;
    Ok(Json(workspaces))
}

pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response<Body>, RelayError> {
    forward(&state, ProxyMethod::Post, WORKSPACES.to_string(), &headers, body).await
}

/// Bulk delete is refused outright in production, before any backend call.
pub async fn delete_all(State(state): State<AppState>, headers: HeaderMap) -> Result<Response<Body>, RelayError> {
    if state.backend.is_production() {
        tracing::warn!("Rejected bulk workspace delete in production");
        return Err(RelayError::Forbidden("Bulk delete is not allowed in production".into()));
    }
    forward(&state, ProxyMethod::Delete, WORKSPACES.to_string(), &headers, Body::empty()).await
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, RelayError> {
    let endpoint = workspace_endpoint(&id)?;
    let token = state.access_token(&headers);
    let workspace = state
        .backend
        .fetch_with_user::<Value>(&endpoint, token.as_deref())
        .await?;
    Ok(Json(workspace))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response<Body>, RelayError> {
    let endpoint = workspace_endpoint(&id)?;
    forward(&state, ProxyMethod::Patch, endpoint, &headers, body).await
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response<Body>, RelayError> {
    let endpoint = workspace_endpoint(&id)?;
    forward(&state, ProxyMethod::Delete, endpoint, &headers, Body::empty()).await
}
