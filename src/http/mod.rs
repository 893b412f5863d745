//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Events listener
//!     → server.rs (Axum setup, middleware)
//!     → events.rs (request → event, pick invoke / sync / async path)
//!     → cors.rs (preflight and allow-origin)
//!     → response.rs (function HTTP response object → client)
//!
//! Config API listener
//!     → server.rs → admin router
//! ```

pub mod cors;
pub mod events;
pub mod response;
pub mod server;

pub use response::HttpResponse;
pub use server::HttpServer;
