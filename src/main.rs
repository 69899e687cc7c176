//! IMAI.studio API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   IMAI GATEWAY                    │
//!                    │                                                   │
//!   Client Request   │  ┌────────┐   ┌──────────┐   ┌────────────────┐  │
//!   ─────────────────┼─▶│  http  │──▶│ handlers │──▶│  RateLimiter   │  │
//!                    │  │ server │   │ validate │   │  (advisory)    │  │
//!                    │  └────────┘   └────┬─────┘   └────────────────┘  │
//!                    │                    │                              │
//!                    │                    ▼                              │
//!                    │            ┌──────────────┐   ┌──────────────┐   │
//!                    │            │ RequestQueue │──▶│  providers   │───┼──▶ FAL / OpenAI
//!                    │            │ FIFO + retry │   │  (reqwest)   │   │    / Anthropic
//!                    │            └──────────────┘   └──────────────┘   │
//!                    │                                                   │
//!                    │   config · observability · lifecycle · admin      │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use imai_gateway::config::{default_config, load_config};
use imai_gateway::lifecycle::{signals, Shutdown};
use imai_gateway::observability::{logging, metrics};
use imai_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "imai-gateway", version)]
#[command(about = "API gateway for IMAI.studio's AI tools", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long, env = "IMAI_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "imai-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limit_enforced = config.rate_limit.enabled && config.rate_limit.enforce,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(signals::watch(shutdown.clone()));

    let server = GatewayServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
