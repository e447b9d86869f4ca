//! Edge gateway binary.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edge_gateway::config::loader::load_config;
use edge_gateway::{GatewayConfig, HttpServer, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "edge-gateway", about = "Authenticating edge gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edge_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("edge-gateway v0.1.0 starting");

    let args = Args::parse();
    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
        GatewayConfig::default()
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        registration = %config.oidc.registration_id,
        routes = config.routes.len(),
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            edge_gateway::observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
