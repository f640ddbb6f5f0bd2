//! Inbound routes.
//!
//! # Responsibilities
//! - Map `/api/workspaces` routes onto the streaming proxy and fetch wrapper
//! - Accept provider webhooks at `/api/webhooks/{provider}`
//! - Answer liveness checks at `/healthz`

pub mod webhooks;
pub mod workspaces;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn healthz() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(state: AppState) -> Router {
    let webhook_limit = state.config.security.max_webhook_body_bytes;

    Router::new()
        .route(
            "/api/workspaces",
            get(workspaces::list)
                .post(workspaces::create)
                .delete(workspaces::delete_all),
        )
        .route(
            "/api/workspaces/{id}",
            get(workspaces::show)
                .patch(workspaces::update)
                .delete(workspaces::remove),
        )
        .route(
            "/api/webhooks/{provider}",
            post(webhooks::receive).layer(DefaultBodyLimit::max(webhook_limit)),
        )
        .route("/healthz", get(healthz))
        .with_state(state)
}
