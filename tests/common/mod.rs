//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use relay_proxy::config::{DeploymentMode, RelayConfig};
use relay_proxy::{HttpServer, Shutdown};

pub const USER_TOKEN: &str = "user-token";
pub const INTERNAL_SECRET: &str = "internal-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// One request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// A backend that records every request and answers with a fixed response.
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });
    (
        state.status,
        [
            ("content-type", "application/json"),
            ("content-encoding", "identity"),
            ("x-backend", "mock"),
        ],
        state.body,
    )
        .into_response()
}

/// Start a recording backend on an ephemeral port.
pub async fn start_mock_backend(status: StatusCode, body: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(record).with_state(MockState {
        status,
        body,
        requests: requests.clone(),
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend { addr, requests }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Development config pointed at `api_url`, with both shared secrets set.
pub fn relay_config(api_url: Option<String>) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.deployment.mode = DeploymentMode::Development;
    config.backend.api_url = api_url;
    config.backend.internal_api_secret = Some(INTERNAL_SECRET.to_string());
    config.webhook.secret = Some(WEBHOOK_SECRET.to_string());
    config
}

/// A relay running in-process. Dropping it shuts the server down.
pub struct TestRelay {
    pub addr: SocketAddr,
    _shutdown: Shutdown,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    TestRelay {
        addr,
        _shutdown: shutdown,
    }
}
