//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the catalog and seed it from config
//! - Start the async dispatcher
//! - Create the events and config API routers
//! - Wire up middleware (tracing, limits, request ID, timeouts)
//! - Apply reloaded config while running
//! - Drain the dispatcher on shutdown

use axum::{routing::any, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_config_router;
use crate::catalog::Catalog;
use crate::config::GatewayConfig;
use crate::dispatch::{Dispatcher, Invoker};
use crate::function::FunctionCaller;
use crate::http::events::{handle_event, EventsState};
use crate::lifecycle::ShutdownSignal;
use crate::resilience::RetryPolicy;

/// The gateway's two HTTP surfaces and the services behind them.
pub struct HttpServer {
    config: GatewayConfig,
    catalog: Arc<Catalog>,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create the server, seed the catalog and start the dispatcher workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: GatewayConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        catalog.apply_seed(&config.seed, &config.default_space);

        let caller = FunctionCaller::new(Duration::from_secs(config.timeouts.function_call_secs));
        let invoker = Arc::new(Invoker::new(catalog.clone(), caller));
        let dispatcher = Dispatcher::start(invoker, &config.dispatch, RetryPolicy::from(&config.retries));

        Self {
            config,
            catalog,
            dispatcher,
        }
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Router for emitted events and sync HTTP subscriptions.
    pub fn events_router(&self) -> Router {
        let state = EventsState {
            catalog: self.catalog.clone(),
            dispatcher: self.dispatcher.clone(),
            default_space: Arc::from(self.config.default_space.as_str()),
            max_body_size: self.config.limits.max_body_size,
        };

        let router = Router::new()
            .route("/", any(handle_event))
            .route("/{*path}", any(handle_event))
            .with_state(state);
        self.with_layers(router)
    }

    /// Router for the configuration API.
    pub fn config_router(&self) -> Router {
        let router = setup_config_router(self.catalog.clone(), self.config.admin.api_key.clone());
        self.with_layers(router)
    }

    #[allow(deprecated)]
    fn with_layers(&self, router: Router) -> Router {
        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(RequestBodyLimitLayer::new(self.config.limits.max_body_size))
                .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs))),
        )
    }

    /// Serve both APIs until shutdown, then drain queued deliveries.
    pub async fn run(
        self,
        events_listener: TcpListener,
        config_listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %events_listener.local_addr()?, "Events API starting");
        tracing::info!(address = %config_listener.local_addr()?, "Config API starting");

        let catalog = self.catalog.clone();
        let reloader = tokio::spawn(async move {
            while let Some(updated) = config_updates.recv().await {
                let rejected = catalog.apply_seed(&updated.seed, &updated.default_space);
                tracing::info!(rejected = rejected.len(), "Reloaded configuration applied");
            }
        });

        let dispatcher = self.dispatcher.clone();
        let events_stop = shutdown.clone();
        let events = axum::serve(events_listener, self.events_router()).with_graceful_shutdown(async move {
            events_stop.wait().await;
            dispatcher.close_intake();
        });
        let config_api = axum::serve(config_listener, self.config_router()).with_graceful_shutdown(shutdown.wait());

        let served = tokio::try_join!(
            async { events.await },
            async { config_api.await },
        );
        reloader.abort();

        self.dispatcher
            .drain(Duration::from_secs(self.config.dispatch.drain_timeout_secs))
            .await;

        served?;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
