//! End-to-end tests for the webhook verifier and relay.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::*;
use relay_proxy::webhooks::sign;

fn user_event(tag: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_01",
        "event": tag,
        "data": {
            "id": "u1",
            "email": "a@b.com",
            "createdAt": "2024-01-01T00:00:00Z",
            "firstName": "Ada"
        }
    }))
    .unwrap()
}

async fn deliver(relay: &TestRelay, provider: &str, body: Vec<u8>, signature: Option<String>) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .post(relay.url(&format!("/api/webhooks/{provider}")))
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        request = request.header("workos-signature", signature);
    }
    request.body(body).send().await.unwrap()
}

fn signed(body: &[u8]) -> Option<String> {
    Some(sign(WEBHOOK_SECRET, body, chrono::Utc::now().timestamp_millis()))
}

#[tokio::test]
async fn test_user_created_is_relayed() {
    let backend = start_mock_backend(StatusCode::CREATED, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = user_event("user.created");
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 200);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack, json!({"received": true, "relayed": true}));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/user");
    assert_eq!(request.headers["x-internal-api-key"], INTERNAL_SECRET);
    assert!(request.headers.get("authorization").is_none());
    let relayed: Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(
        relayed,
        json!({"id": "u1", "email": "a@b.com", "created_at": "2024-01-01T00:00:00Z"})
    );
}

#[tokio::test]
async fn test_user_updated_and_deleted_target_item() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    for tag in ["user.updated", "user.deleted"] {
        let body = user_event(tag);
        let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;
        assert_eq!(res.status(), 200);
    }

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "PATCH");
    assert_eq!(requests[0].path, "/user/u1");
    assert_eq!(requests[1].method, "DELETE");
    assert_eq!(requests[1].path, "/user/u1");
}

#[tokio::test]
async fn test_unsupported_event_is_skipped() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = serde_json::to_vec(&json!({"event": "session.created", "data": {"id": "s1"}})).unwrap();
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 200);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack, json!({"skipped": true}));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_bad_signature_rejected() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = user_event("user.created");
    let forged = Some(sign("wrong-secret", &body, chrono::Utc::now().timestamp_millis()));
    let res = deliver(&relay, "workos", body, forged).await;

    assert_eq!(res.status(), 400);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error, json!({"error": "Invalid Signature"}));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_missing_signature_rejected() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let res = deliver(&relay, "workos", user_event("user.created"), None).await;

    assert_eq!(res.status(), 400);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_stale_signature_rejected() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = user_event("user.created");
    let stale = chrono::Utc::now().timestamp_millis() - 10 * 60 * 1000;
    let res = deliver(&relay, "workos", body.clone(), Some(sign(WEBHOOK_SECRET, &body, stale))).await;

    assert_eq!(res.status(), 400);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_event_is_invalid_payload() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = serde_json::to_vec(&json!({"event": "user.created", "data": {"email": "a@b.com"}})).unwrap();
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 400);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error, json!({"error": "Invalid Payload"}));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_unreachable_backend_asks_for_redelivery() {
    let dead = closed_port().await;
    let relay = start_relay(relay_config(Some(format!("http://{dead}")))).await;

    let body = user_event("user.created");
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 502);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error, json!({"error": "Downstream failure"}));
}

#[tokio::test]
async fn test_backend_refusal_reported_as_not_relayed() {
    let backend = start_mock_backend(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"dup"}"#).await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = user_event("user.created");
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 200);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack, json!({"received": true, "relayed": false}));
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_unknown_provider_not_found() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = user_event("user.created");
    let res = deliver(&relay, "stripe", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 404);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_missing_webhook_secret_is_config_error() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let mut config = relay_config(Some(backend.url()));
    config.webhook.secret = None;
    let relay = start_relay(config).await;

    let body = user_event("user.created");
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 500);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error, json!({"error": "Config Error"}));
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let backend = start_mock_backend(StatusCode::OK, "{}").await;
    let mut config = relay_config(Some(backend.url()));
    config.security.max_webhook_body_bytes = 64;
    let relay = start_relay(config).await;

    let body = user_event("user.created");
    assert!(body.len() > 64);
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 413);
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_missing_api_url_is_config_error_even_for_skipped_events() {
    let relay = start_relay(relay_config(None)).await;

    let body = serde_json::to_vec(&json!({"event": "session.created", "data": {"id": "s1"}})).unwrap();
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 500);
    let error: Value = res.json().await.unwrap();
    assert_eq!(error, json!({"error": "Config Error"}));
}

#[tokio::test]
async fn test_snake_case_delivery_is_relayed() {
    let backend = start_mock_backend(StatusCode::CREATED, "{}").await;
    let relay = start_relay(relay_config(Some(backend.url()))).await;

    let body = serde_json::to_vec(&json!({
        "event": "user.created",
        "data": {"id": "user_01", "email": "a@b.com", "created_at": "2024-01-01T00:00:00Z"}
    }))
    .unwrap();
    let res = deliver(&relay, "workos", body.clone(), signed(&body)).await;

    assert_eq!(res.status(), 200);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack, json!({"received": true, "relayed": true}));

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let relayed: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        relayed,
        json!({"id": "user_01", "email": "a@b.com", "created_at": "2024-01-01T00:00:00Z"})
    );
}
