//! Mock users service.
//!
//! Serves the user functions over HTTP so they can be registered with the
//! gateway as `http` functions.

use clap::Parser;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use event_gateway::config::ObservabilityConfig;
use event_gateway::lifecycle::{signals::shutdown_on_signal, Shutdown};
use event_gateway::observability::logging;
use event_gateway::users;

#[derive(Parser, Debug)]
#[command(name = "users-service", about = "Mock user functions for the event gateway")]
struct Args {
    /// Bind address.
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    bind: String,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init_logging(&ObservabilityConfig {
        log_level: args.log_level,
        ..ObservabilityConfig::default()
    });

    let listener = TcpListener::bind(&args.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "users-service listening");

    let shutdown = Shutdown::new();
    let stopped = shutdown.signal();
    tokio::spawn(async move { shutdown_on_signal(&shutdown).await });

    let app = users::router().layer(TraceLayer::new_for_http());
    axum::serve(listener, app).with_graceful_shutdown(stopped.wait()).await?;

    tracing::info!("users-service stopped");
    Ok(())
}
