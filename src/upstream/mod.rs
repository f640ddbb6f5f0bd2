//! Outbound calls to the backend service.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → BackendClient::target_url (base URL + endpoint)
//!     → security::headers (forwarded auth / internal key)
//!     → identity (production only, merged with identity precedence)
//!     → proxy.rs  (streamed request/response)
//!     → fetch.rs  (single JSON GET, typed failure)
//!     → relay.rs  (webhook relay, status-range outcome)
//! ```
//!
//! # Design Decisions
//! - One shared `reqwest::Client` (connection pooling, connect timeout)
//! - No retries and no total timeout: failures are terminal for the request
//! - The identity cache is injected, never global

pub mod fetch;
pub mod proxy;
pub mod relay;

use axum::http::{HeaderMap, Method};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DeploymentMode, RelayConfig};
use crate::error::RelayError;
use crate::identity::{IdentityError, IdentityTokenCache};
use crate::security::merge_identity_headers;

pub use fetch::FetchError;
pub use proxy::ForwardedRequest;
pub use relay::RelayOutcome;

/// Methods the proxy routes may forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ProxyMethod {
    pub fn as_method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }

    /// GET and DELETE are forwarded without a body.
    pub fn has_body(self) -> bool {
        !matches!(self, Self::Get | Self::Delete)
    }
}

/// Client for the backend service shared by all routes.
pub struct BackendClient {
    http: reqwest::Client,
    api_url: Option<String>,
    internal_api_secret: Option<String>,
    mode: DeploymentMode,
    identity: Arc<IdentityTokenCache>,
}

impl BackendClient {
    /// Build the HTTP client and the identity cache bound to the backend URL.
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.backend.connect_timeout_secs))
            .build()?;
        let identity = Arc::new(IdentityTokenCache::new(
            &config.identity,
            config.backend.api_url.clone(),
            http.clone(),
        ));
        Ok(Self::with_identity(config, http, identity))
    }

    pub fn with_identity(
        config: &RelayConfig,
        http: reqwest::Client,
        identity: Arc<IdentityTokenCache>,
    ) -> Self {
        Self {
            http,
            api_url: config.backend.api_url.clone(),
            internal_api_secret: config.backend.internal_api_secret.clone(),
            mode: config.deployment.mode,
            identity,
        }
    }

    pub fn identity(&self) -> &Arc<IdentityTokenCache> {
        &self.identity
    }

    pub fn is_production(&self) -> bool {
        self.mode == DeploymentMode::Production
    }

    /// The configured backend base URL.
    pub fn require_base_url(&self) -> Result<&str, RelayError> {
        self.api_url
            .as_deref()
            .ok_or_else(|| RelayError::Configuration("API_URL is not set".into()))
    }

    /// `<base><endpoint>`; fails if the base URL is not configured.
    pub fn target_url(&self, endpoint: &str) -> Result<String, RelayError> {
        Ok(join_url(self.require_base_url()?, endpoint))
    }

    /// In production, merge machine identity headers into `headers`.
    async fn apply_identity(&self, headers: &mut HeaderMap) -> Result<(), IdentityError> {
        if self.is_production() {
            let identity = self.identity.request_headers().await?;
            merge_identity_headers(headers, identity);
        }
        Ok(())
    }
}

/// Concatenate a base URL and an endpoint, normalizing the slash between them.
pub fn join_url(base: &str, endpoint: &str) -> String {
    let base = base.trim_end_matches('/');
    if endpoint.starts_with('/') {
        format!("{base}{endpoint}")
    } else {
        format!("{base}/{endpoint}")
    }
}

/// Whether `segment` can be placed in a URL path as a single segment.
pub fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains("..")
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}
