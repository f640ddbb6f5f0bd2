//! Process-wide machine identity holder.
//!
//! The client is built on first use and kept for the lifetime of the
//! holder. A failed construction is not remembered: the next call tries
//! again. Concurrent first calls are serialized by the `OnceCell`, so at
//! most one client is ever constructed.

use axum::http::HeaderMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::config::IdentityConfig;
use crate::identity::{IdTokenClient, IdentityError, ServiceAccountKey};

pub struct IdentityTokenCache {
    credentials_base64: Option<String>,
    audience: Option<String>,
    refresh_margin: Duration,
    http: reqwest::Client,
    client: OnceCell<Arc<IdTokenClient>>,
    constructions: AtomicUsize,
}

impl IdentityTokenCache {
    /// `audience` is the backend base URL the identity tokens are minted for.
    pub fn new(config: &IdentityConfig, audience: Option<String>, http: reqwest::Client) -> Self {
        Self {
            credentials_base64: config.credentials_base64.clone(),
            audience,
            refresh_margin: Duration::from_secs(config.refresh_margin_secs),
            http,
            client: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    /// The memoized client, constructing it on first use.
    pub async fn client(&self) -> Result<Arc<IdTokenClient>, IdentityError> {
        self.client
            .get_or_try_init(|| async { self.construct() })
            .await
            .cloned()
    }

    /// Machine identity headers for an outbound call.
    pub async fn request_headers(&self) -> Result<HeaderMap, IdentityError> {
        self.client().await?.request_headers().await
    }

    /// Number of clients successfully constructed by this holder.
    pub fn constructions(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    fn construct(&self) -> Result<Arc<IdTokenClient>, IdentityError> {
        let audience = self.audience.as_deref().ok_or(IdentityError::MissingAudience)?;
        let encoded = self
            .credentials_base64
            .as_deref()
            .ok_or(IdentityError::MissingCredential)?;

        let key = ServiceAccountKey::from_base64(encoded)?;
        let client = IdTokenClient::new(key, audience, self.http.clone(), self.refresh_margin)?;
        self.constructions.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            client_email = %client.client_email(),
            audience = %audience,
            "Machine identity client initialized"
        );
        Ok(Arc::new(client))
    }
}
