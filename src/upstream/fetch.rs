//! Single JSON call on behalf of a user.
//!
//! Failures are typed so callers can tell a missing resource from an
//! unreachable backend or a misconfigured relay.

use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::RelayError;
use crate::identity::IdentityError;
use crate::security::headers::user_headers;
use crate::upstream::BackendClient;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("relay is misconfigured: {0}")]
    Misconfigured(String),

    #[error("machine identity unavailable: {0}")]
    Identity(#[from] IdentityError),

    #[error("caller is not authenticated")]
    Unauthenticated,

    #[error("resource not found")]
    NotFound,

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend rejected request with status {0}")]
    Rejected(StatusCode),

    #[error("backend response could not be decoded: {0}")]
    Decode(String),
}

impl From<FetchError> for RelayError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Misconfigured(msg) => RelayError::Configuration(msg),
            FetchError::Identity(e) => RelayError::Identity(e),
            FetchError::Unauthenticated => RelayError::Unauthorized,
            FetchError::NotFound => RelayError::NotFound,
            other => RelayError::Upstream(other.to_string()),
        }
    }
}

impl BackendClient {
    /// GET `<base><endpoint>` and decode the JSON body.
    ///
    /// The token, when present, is forwarded as `X-Forwarded-Authorization`.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<T, FetchError> {
        let result = self.fetch_json_inner(endpoint, token).await;
        if let Err(e) = &result {
            tracing::warn!(endpoint = %endpoint, error = %e, "Backend fetch failed");
        }
        result
    }

    async fn fetch_json_inner<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<T, FetchError> {
        let url = self
            .target_url(endpoint)
            .map_err(|e| FetchError::Misconfigured(e.to_string()))?;

        let mut headers = user_headers(token).ok_or(FetchError::Unauthenticated)?;
        self.apply_identity(&mut headers).await?;

        let response = self
            .http
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| FetchError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Unauthenticated),
            status => Err(FetchError::Rejected(status)),
        }
    }

    /// Fetch as the user identified by `token`; no token means no call.
    pub async fn fetch_with_user<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<T, FetchError> {
        let Some(token) = token else {
            tracing::warn!(endpoint = %endpoint, "User not authenticated");
            return Err(FetchError::Unauthenticated);
        };
        self.fetch_json(endpoint, Some(token)).await
    }
}
