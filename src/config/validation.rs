//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are
//! returned, not just the first. Absent secrets are not errors here: they
//! surface per request as configuration failures.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a loaded configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if let Some(api_url) = &config.backend.api_url {
        match url::Url::parse(api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(ValidationError::new(
                "backend.api_url",
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new("backend.api_url", e.to_string())),
        }
    }

    if config.backend.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("backend.connect_timeout_secs", "must be > 0"));
    }

    let provider = &config.webhook.provider;
    if provider.is_empty() || !provider.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        errors.push(ValidationError::new(
            "webhook.provider",
            "must be a non-empty token of letters, digits, '-' or '_'",
        ));
    }

    if config.webhook.tolerance_secs == 0 {
        errors.push(ValidationError::new("webhook.tolerance_secs", "must be > 0"));
    }

    if config.security.max_webhook_body_bytes == 0 {
        errors.push(ValidationError::new("security.max_webhook_body_bytes", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Human-readable warnings for settings that will fail requests at runtime.
pub fn missing_settings(config: &RelayConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.backend.api_url.is_none() {
        missing.push("backend.api_url (API_URL)");
    }
    if config.webhook.secret.is_none() {
        missing.push("webhook.secret (WEBHOOK_SECRET)");
    }
    if config.backend.internal_api_secret.is_none() {
        missing.push("backend.internal_api_secret (INTERNAL_API_SECRET)");
    }
    if config.is_production() && config.identity.credentials_base64.is_none() {
        missing.push("identity.credentials_base64 (GCP_BASE_64_JSON)");
    }
    missing
}
