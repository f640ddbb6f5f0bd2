//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{DeploymentMode, RelayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: optional TOML file, then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RelayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-sourced values onto `config`.
///
/// Empty values are treated as unset.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(addr) = read("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(mode) = read("DEPLOYMENT_MODE") {
        config.deployment.mode = mode
            .parse::<DeploymentMode>()
            .map_err(|reason| ConfigError::Env { var: "DEPLOYMENT_MODE", reason })?;
    }
    if let Some(url) = read("API_URL") {
        config.backend.api_url = Some(url);
    }
    if let Some(secret) = read("INTERNAL_API_SECRET") {
        config.backend.internal_api_secret = Some(secret);
    }
    if let Some(encoded) = read("GCP_BASE_64_JSON") {
        config.identity.credentials_base64 = Some(encoded);
    }
    if let Some(secret) = read("WEBHOOK_SECRET") {
        config.webhook.secret = Some(secret);
    }

    Ok(())
}
