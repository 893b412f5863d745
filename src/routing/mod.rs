//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Catalog change
//!     → table.rs (compile all subscriptions)
//!     → tree.rs (one path tree per space + method + event type)
//!     → Freeze as immutable RoutingTable, swapped in atomically
//!
//! Incoming event (space, method, path, event type)
//!     → RoutingTable::sync_target (request/response delivery)
//!     → RoutingTable::subscribers (background fan-out)
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt, never patched; configuration changes are rare
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route

pub mod table;
pub mod tree;

pub use table::{RoutingTable, SyncTarget};
pub use tree::{Params, PathTree, RouteError};
