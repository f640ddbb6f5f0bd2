//! Error taxonomy for the relay and its mapping onto HTTP responses.
//!
//! Every route returns `Result<_, RelayError>`; nothing escapes the HTTP
//! boundary as an unhandled fault. Bodies are `{"error": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::identity::IdentityError;
use crate::webhooks::signature::SignatureError;

/// Errors surfaced by route handlers.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required setting is absent or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Machine identity could not be produced.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// No user session token could be resolved.
    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found")]
    NotFound,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Webhook signature did not verify.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),

    /// A verified webhook carried a payload we could not interpret.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The backend did not respond correctly to a proxied call.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A webhook relay to the backend failed in transport.
    #[error("relay failed: {0}")]
    Relay(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Configuration(_) | RelayError::Identity(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::BadRequest(_)
            | RelayError::Signature(_)
            | RelayError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream(_) | RelayError::Relay(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message exposed to the caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::Configuration(_) => "Config Error".into(),
            RelayError::Identity(_) => "Internal Auth Error".into(),
            RelayError::Unauthorized => "Unauthorized".into(),
            RelayError::Forbidden(msg) | RelayError::BadRequest(msg) => msg.clone(),
            RelayError::NotFound => "Not Found".into(),
            RelayError::Signature(_) => "Invalid Signature".into(),
            RelayError::InvalidPayload(_) => "Invalid Payload".into(),
            RelayError::Upstream(_) => "Bad Gateway".into(),
            RelayError::Relay(_) => "Downstream failure".into(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(serde_json::json!({ "error": self.public_message() }))).into_response()
    }
}
