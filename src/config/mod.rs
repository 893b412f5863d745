//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (listeners, dispatch, retries, seed)
//!     → seed applied to the catalog
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server re-applies the seed to the catalog
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Listener, worker and logging settings only take effect on restart
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, DispatchConfig, GatewayConfig, LimitsConfig, ListenerConfig, ObservabilityConfig,
    RetryConfig, TimeoutConfig,
};
