//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Deployment mode (drives auth header behavior and bulk-delete guard).
    pub deployment: DeploymentConfig,

    /// Backend service the relay forwards to.
    pub backend: BackendConfig,

    /// Machine identity credential settings.
    pub identity: IdentityConfig,

    /// Inbound webhook settings.
    pub webhook: WebhookConfig,

    /// User session resolution.
    pub session: SessionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

impl RelayConfig {
    /// Whether the relay runs in production mode.
    pub fn is_production(&self) -> bool {
        self.deployment.mode == DeploymentMode::Production
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Deployment mode of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

impl std::str::FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown deployment mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub mode: DeploymentMode,
}

/// Backend service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL every endpoint is appended to (e.g., "https://api.internal").
    pub api_url: Option<String>,

    /// Shared secret sent as `X-Internal-Api-Key` on webhook relays.
    pub internal_api_secret: Option<String>,

    /// TCP connect timeout for outbound calls in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            internal_api_secret: None,
            connect_timeout_secs: 10,
        }
    }
}

/// Machine identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Base64-encoded service account JSON.
    pub credentials_base64: Option<String>,

    /// Refresh identity tokens this many seconds before they expire.
    pub refresh_margin_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            credentials_base64: None,
            refresh_margin_secs: 300,
        }
    }
}

/// Inbound webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Provider name; selects the route segment and the signature header.
    pub provider: String,

    /// Shared signing secret.
    pub secret: Option<String>,

    /// Maximum accepted age (either direction) of a signature timestamp.
    pub tolerance_secs: u64,
}

impl WebhookConfig {
    /// Name of the header carrying the event signature.
    pub fn signature_header(&self) -> String {
        format!("{}-signature", self.provider.to_ascii_lowercase())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            provider: "workos".to_string(),
            secret: None,
            tolerance_secs: 180,
        }
    }
}

/// Session resolution configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie consulted for the access token when no `Authorization` header is sent.
    pub cookie_name: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format; defaults to JSON in production and pretty otherwise.
    pub log_format: Option<LogFormat>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: None,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum webhook body size in bytes (webhook bodies are buffered for verification).
    pub max_webhook_body_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_webhook_body_bytes: 1024 * 1024, // 1MB
        }
    }
}
