use clap::{Parser, Subcommand};
use reqwest::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::path::PathBuf;

use relay_proxy::webhooks::sign;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Operator CLI for the relay proxy", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check relay liveness
    Health,
    /// Print the signature header for a payload
    Sign {
        #[arg(short, long)]
        secret: String,
        /// File containing the exact payload bytes
        #[arg(short, long)]
        file: PathBuf,
        /// Timestamp in milliseconds (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,
    },
    /// Sign a payload and deliver it to the webhook route
    SendWebhook {
        #[arg(short, long)]
        secret: String,
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long, default_value = "workos")]
        provider: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Sign { secret, file, timestamp } => {
            let body = std::fs::read(file)?;
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            println!("{}", sign(&secret, &body, timestamp));
        }
        Commands::SendWebhook { secret, file, provider } => {
            let body = std::fs::read(file)?;
            let signature = sign(&secret, &body, chrono::Utc::now().timestamp_millis());
            let header = HeaderName::from_bytes(format!("{}-signature", provider.to_ascii_lowercase()).as_bytes())?;

            let res = client
                .post(format!("{}/api/webhooks/{}", cli.url, provider))
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .header(header, HeaderValue::from_str(&signature)?)
                .body(body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
