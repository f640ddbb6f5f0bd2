//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define relay metrics (requests, latency, webhook events, token refreshes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `relay_requests_total` (counter): requests by method, route, status
//! - `relay_request_duration_seconds` (histogram): latency distribution
//! - `relay_webhook_events_total` (counter): webhook events by type and outcome
//! - `relay_identity_token_refresh_total` (counter): ID-token exchanges by outcome
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so tests need no setup
//! - Routes are labelled by their matched pattern, never the raw path

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::Label;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = vec![
        Label::new("method", method.to_string()),
        Label::new("route", route.to_string()),
        Label::new("status", status.to_string()),
    ];
    ::metrics::counter!("relay_requests_total", labels.clone()).increment(1);
    ::metrics::histogram!("relay_request_duration_seconds", labels).record(start.elapsed().as_secs_f64());
}

/// `outcome` is one of `relayed`, `declined` (backend answered non-2xx),
/// `rejected` (verification or payload), `skipped` or `failed`.
pub fn record_webhook_event(event: &str, outcome: &'static str) {
    ::metrics::counter!(
        "relay_webhook_events_total",
        "event" => event.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_identity_refresh(outcome: &'static str) {
    ::metrics::counter!("relay_identity_token_refresh_total", "outcome" => outcome).increment(1);
}
