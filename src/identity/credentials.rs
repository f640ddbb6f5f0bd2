//! Service account credential decoding.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::fmt;

use crate::identity::IdentityError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The fields of a service account key file the relay needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Decode a base64-encoded service account JSON document.
    pub fn from_base64(encoded: &str) -> Result<Self, IdentityError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| IdentityError::Decode(format!("invalid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::Decode(format!("invalid credential JSON: {e}")))
    }
}

// The private key must never reach the logs.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}
