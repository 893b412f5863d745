//! Event Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────────┐
//!                 │                      EVENT GATEWAY                       │
//!   emit / HTTP   │  ┌───────────┐    ┌──────────┐    ┌──────────────────┐   │
//!   ──────────────┼─▶│ events API│───▶│  event   │───▶│ routing snapshot │   │
//!                 │  │  (axum)   │    │ parsing  │    │ (sync path tree, │   │
//!                 │  └─────┬─────┘    └──────────┘    │  async index)    │   │
//!                 │        │ sync / invoke            └────────┬─────────┘   │
//!                 │        ▼                                   │ async       │
//!                 │  ┌───────────┐                    ┌────────▼─────────┐   │
//!   ◀─────────────┼──│  invoker  │◀───────────────────│ dispatcher queue │   │
//!   HTTP response │  └─────┬─────┘                    │  + worker pool   │   │
//!                 │        │                          └──────────────────┘   │
//!                 │        ▼                                                 │     HTTP
//!                 │   function call ─────────────────────────────────────────┼───▶ functions
//!                 │                                                          │
//!   config API ───┼─▶ catalog (event types, functions, subscriptions)        │
//!   gateway.toml ─┼─▶ seed + hot reload                                      │
//!                 └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use event_gateway::config::{load_config, watcher::ConfigWatcher, GatewayConfig};
use event_gateway::lifecycle::{signals::shutdown_on_signal, Shutdown};
use event_gateway::observability::{logging, metrics};
use event_gateway::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "event-gateway", version, about = "Event-driven function gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the events API bind address.
    #[arg(long)]
    events_address: Option<String>,

    /// Override the config API bind address.
    #[arg(long)]
    config_address: Option<String>,

    /// Override the log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(addr) = args.events_address {
        config.events.bind_address = addr;
    }
    if let Some(addr) = args.config_address {
        config.config_api.bind_address = addr;
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "event-gateway starting");
    tracing::info!(
        events_address = %config.events.bind_address,
        config_address = %config.config_api.bind_address,
        default_space = %config.default_space,
        workers = config.dispatch.workers,
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

    // Keep the watcher alive for the lifetime of the server.
    let (updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            match watcher.run() {
                Ok(handle) => (updates, Some(handle)),
                Err(e) => {
                    tracing::warn!(error = %e, "Config hot reload disabled");
                    (updates, None)
                }
            }
        }
        None => (mpsc::unbounded_channel().1, None),
    };

    let events_listener = TcpListener::bind(&config.events.bind_address).await?;
    let config_listener = TcpListener::bind(&config.config_api.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let run = server.run(events_listener, config_listener, updates, shutdown.signal());
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result?,
        _ = shutdown_on_signal(&shutdown) => run.await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
