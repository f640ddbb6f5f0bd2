//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development, unless overridden
//! - `RUST_LOG` wins over the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{DeploymentMode, LogFormat, ObservabilityConfig};

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(config: &ObservabilityConfig, mode: DeploymentMode) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(&config.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    match effective_format(config, mode) {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("relay_proxy={level},tower_http={level}"))
}

fn effective_format(config: &ObservabilityConfig, mode: DeploymentMode) -> LogFormat {
    config.log_format.unwrap_or(match mode {
        DeploymentMode::Production => LogFormat::Json,
        DeploymentMode::Development => LogFormat::Pretty,
    })
}
