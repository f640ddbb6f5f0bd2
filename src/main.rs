//! Relay proxy (v1)
//!
//! Sits between the browser and the backend service, and between the
//! identity provider and the backend.
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 RELAY PROXY                    │
//!   Browser              │  ┌──────────┐   ┌─────────────┐               │
//!   ─────────────────────┼─▶│   api    │──▶│  upstream   │───────────────┼──▶ Backend
//!   /api/workspaces      │  │  routes  │   │ proxy/fetch │   + user auth │
//!                        │  └──────────┘   └──────┬──────┘               │
//!   Identity provider    │  ┌──────────┐   ┌──────▼──────┐               │
//!   ─────────────────────┼─▶│ webhooks │──▶│    relay    │───────────────┼──▶ Backend
//!   /api/webhooks/{p}    │  │  verify  │   │ + identity  │   + internal  │
//!                        │  └──────────┘   └─────────────┘     key       │
//!                        └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use relay_proxy::config::{load_config, validation::missing_settings};
use relay_proxy::lifecycle::signals::spawn_signal_handler;
use relay_proxy::observability::{logging, metrics};
use relay_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "relay-proxy", version)]
#[command(about = "Authenticated reverse proxy and webhook relay", long_about = None)]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    logging::init_logging(&config.observability, config.deployment.mode);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "relay-proxy starting");

    let missing = missing_settings(&config);
    if !missing.is_empty() {
        // Routes that need these fail per request with 500.
        tracing::warn!(missing = ?missing, "Configuration incomplete");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mode = ?config.deployment.mode,
        api_url = config.backend.api_url.as_deref().unwrap_or("<unset>"),
        provider = %config.webhook.provider,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_signal_handler(shutdown.clone());

    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => server.run_tls(&tls, shutdown.subscribe()).await?,
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
