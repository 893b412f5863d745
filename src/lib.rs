//! Event gateway library.
//!
//! Routes events to functions: custom events fan out asynchronously to
//! subscribed functions, `http.request` events are answered synchronously by
//! the function behind a matching path, and `invoke` calls a function by id.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod event;
pub mod function;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod subscription;
pub mod users;

pub use catalog::Catalog;
pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
