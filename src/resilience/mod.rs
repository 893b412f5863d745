//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Async delivery to a function:
//!     → function call timeout (FunctionCaller client)
//!     → On transport or runtime error: RetryPolicy delay (retry.rs), then retry
//!     → After the last attempt: gateway.function.invocationFailed
//! ```
//!
//! # Design Decisions
//! - Only async deliveries retry; sync calls answer the client right away
//! - Backoff doubles per attempt up to a cap, with up to 10% jitter

pub mod retry;

pub use retry::RetryPolicy;
