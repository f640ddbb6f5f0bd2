//! Webhook relay to the backend.

use axum::http::{Method, StatusCode};
use serde::Serialize;

use crate::error::RelayError;
use crate::security::headers::internal_headers;
use crate::upstream::BackendClient;

/// Result of a relay that reached the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayOutcome {
    pub status: StatusCode,
    /// Status in [200, 300).
    pub ok: bool,
}

impl RelayOutcome {
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ok: (200..300).contains(&status.as_u16()),
        }
    }
}

impl BackendClient {
    /// Send a translated webhook payload using machine credentials.
    ///
    /// Always carries `X-Internal-Api-Key`; production also carries a machine
    /// identity token. A non-2xx answer is an outcome, not an error; only
    /// transport failures are.
    pub async fn forward_webhook<B: Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> Result<RelayOutcome, RelayError> {
        let url = self.target_url(endpoint)?;
        let secret = self
            .internal_api_secret
            .as_deref()
            .ok_or_else(|| RelayError::Configuration("INTERNAL_API_SECRET is not set".into()))?;

        let mut headers = internal_headers(secret).ok_or_else(|| {
            RelayError::Configuration("INTERNAL_API_SECRET is not a valid header value".into())
        })?;
        self.apply_identity(&mut headers).await?;

        let payload = serde_json::to_vec(body)
            .map_err(|e| RelayError::InvalidPayload(e.to_string()))?;

        let response = self
            .http
            .request(method.clone(), &url)
            .headers(headers)
            .body(payload)
            .send()
            .await
            .map_err(|e| RelayError::Relay(format!("{method} {endpoint}: {e}")))?;

        let outcome = RelayOutcome::from_status(response.status());
        if outcome.ok {
            tracing::info!(method = %method, endpoint = %endpoint, status = outcome.status.as_u16(), "Webhook relayed");
        } else {
            tracing::warn!(method = %method, endpoint = %endpoint, status = outcome.status.as_u16(), "Backend refused webhook relay");
        }
        Ok(outcome)
    }
}
