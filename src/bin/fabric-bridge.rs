#![forbid(unsafe_code)]
//! HTTP bridge in front of a blockchain client SDK

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fabric_bridge::api::{run_api_server, Bridge};
use fabric_bridge::client::{DevNetworkClient, FabricClient};
use fabric_bridge::config::api_port;
use fabric_bridge::lifecycle::{termination_signal, Lifecycle};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Client network profile handed to the SDK client at startup
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fabric_bridge=info")),
        )
        .init();

    info!(config = %cli.config.display(), "using config file");

    let client: Arc<dyn FabricClient> = Arc::new(DevNetworkClient::new());
    let lifecycle = match Lifecycle::start(client, &cli.config).await {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            error!(config = %cli.config.display(), error = %e, "unable to initialize the SDK client");
            std::process::exit(1);
        }
    };

    let bridge = Arc::new(Bridge::new(lifecycle.client()));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", api_port())).await?;

    let _signal_task = lifecycle.spawn_signal_handler(termination_signal(), || {
        std::process::exit(0);
    });

    run_api_server(bridge, listener).await
}
