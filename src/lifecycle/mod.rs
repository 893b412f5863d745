//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     ShutdownSignal resolves → events API closes intake (503)
//!     → both listeners stop accepting → dispatcher drains → exit
//! ```
//!
//! # Design Decisions
//! - The shutdown flag is sticky, late waiters resolve immediately
//! - Drain has a timeout: queued deliveries past the deadline are lost

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
