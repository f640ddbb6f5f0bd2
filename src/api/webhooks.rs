//! Provider webhook receiver.
//!
//! # Data Flow
//! ```text
//! POST /api/webhooks/{provider}
//!     → provider check (404 for anything but the configured provider)
//!     → WEBHOOK_SECRET and API_URL present (500)
//!     → signature verification over the raw body (400)
//!     → event decode + translate (400 / skip)
//!     → relay to backend with machine credentials (502 on transport failure)
//! ```
//!
//! A 502 tells the provider to redeliver; non-2xx answers from the backend
//! are reported as `relayed: false` and are not redelivered.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use std::time::Duration;

use crate::error::RelayError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::webhooks::{self, Translation, WebhookEvent};

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum WebhookAck {
    Skipped { skipped: bool },
    Received { received: bool, relayed: bool },
}

pub async fn receive(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, RelayError> {
    let config = &state.config.webhook;
    if !provider.eq_ignore_ascii_case(&config.provider) {
        return Err(RelayError::NotFound);
    }
    let secret = config
        .secret
        .as_deref()
        .ok_or_else(|| RelayError::Configuration("WEBHOOK_SECRET is not set".into()))?;
    state.backend.require_base_url()?;

    let signature = headers
        .get(config.signature_header())
        .and_then(|value| value.to_str().ok());
    let now_ms = chrono::Utc::now().timestamp_millis();
    if let Err(e) = webhooks::verify(
        secret,
        &body,
        signature,
        now_ms,
        Duration::from_secs(config.tolerance_secs),
    ) {
        tracing::warn!(provider = %provider, error = %e, "Webhook signature rejected");
        metrics::record_webhook_event("unknown", "rejected");
        return Err(e.into());
    }

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        metrics::record_webhook_event("unknown", "rejected");
        RelayError::InvalidPayload(e.to_string())
    })?;

    let plan = match webhooks::translate(&event) {
        Ok(Translation::Relay(plan)) => plan,
        Ok(Translation::Skip) => {
            tracing::info!(event = %event.event, id = ?event.id, "Skipping unsupported webhook event");
            metrics::record_webhook_event(&event.event, "skipped");
            return Ok(Json(WebhookAck::Skipped { skipped: true }));
        }
        Err(e) => {
            metrics::record_webhook_event(&event.event, "rejected");
            return Err(e);
        }
    };

    match state
        .backend
        .forward_webhook(plan.method.clone(), &plan.path, &plan.body)
        .await
    {
        Ok(outcome) => {
            let label = if outcome.ok { "relayed" } else { "declined" };
            metrics::record_webhook_event(plan.kind.as_str(), label);
            Ok(Json(WebhookAck::Received {
                received: true,
                relayed: outcome.ok,
            }))
        }
        Err(e) => {
            metrics::record_webhook_event(plan.kind.as_str(), "failed");
            Err(e)
        }
    }
}
