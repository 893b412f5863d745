//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use event_gateway::dispatch::Dispatcher;
use event_gateway::{Catalog, GatewayConfig, HttpServer, Shutdown};

/// A request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone, Default)]
pub struct Requests(Arc<Mutex<Vec<Captured>>>);

impl Requests {
    pub fn all(&self) -> Vec<Captured> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// Wait until at least `n` requests arrived.
    pub async fn wait_for(&self, n: usize) -> Vec<Captured> {
        let requests = self.clone();
        wait_until(Duration::from_secs(5), move || requests.len() >= n).await;
        self.all()
    }
}

type Responder = Arc<dyn Fn(usize) -> (u16, String) + Send + Sync>;

#[derive(Clone)]
struct BackendState {
    requests: Requests,
    respond: Responder,
}

async fn capture(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let n = {
        let mut requests = state.requests.0.lock().unwrap();
        requests.push(Captured { method, path: uri.path().to_string(), headers, body });
        requests.len()
    };
    let (status, body) = (state.respond)(n);
    (StatusCode::from_u16(status).unwrap(), body)
}

/// Start a mock backend whose answer depends on the 1-based call number.
pub async fn start_programmable_backend<F>(respond: F) -> (SocketAddr, Requests)
where
    F: Fn(usize) -> (u16, String) + Send + Sync + 'static,
{
    let requests = Requests::default();
    let state = BackendState { requests: requests.clone(), respond: Arc::new(respond) };
    let app = Router::new().fallback(capture).with_state(state);
    let addr = serve(app).await;
    (addr, requests)
}

/// Start a mock backend that always returns 200 with a fixed body.
pub async fn start_mock_backend(response: &'static str) -> (SocketAddr, Requests) {
    start_programmable_backend(move |_| (200, response.to_string())).await
}

/// Serve an arbitrary router on a loopback port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub struct TestGateway {
    pub events_url: String,
    pub config_url: String,
    pub catalog: Arc<Catalog>,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestGateway {
    pub fn space_url(&self, space: &str) -> String {
        format!("{}/v1/spaces/{}", self.config_url, space)
    }
}

/// Gateway settings suited for tests: few workers, fast retries.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.dispatch.workers = 4;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.timeouts.function_call_secs = 2;
    config.dispatch.drain_timeout_secs = 2;
    config
}

/// Run a gateway on loopback ports.
pub async fn spawn_gateway(config: GatewayConfig) -> TestGateway {
    let events = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config_api = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let events_url = format!("http://{}", events.local_addr().unwrap());
    let config_url = format!("http://{}", config_api.local_addr().unwrap());

    let server = HttpServer::new(config);
    let catalog = server.catalog();
    let dispatcher = server.dispatcher();
    let shutdown = Shutdown::new();
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    let handle = tokio::spawn(server.run(events, config_api, updates, shutdown.signal()));

    TestGateway { events_url, config_url, catalog, dispatcher, shutdown, handle }
}

/// Poll `condition` until it holds, panicking after `timeout`.
pub async fn wait_until<F>(timeout: Duration, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Run `f` with a timeout so a stuck test fails instead of hanging.
pub async fn within<T>(f: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), f).await.expect("test timed out")
}
