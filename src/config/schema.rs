//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::catalog::Seed;

/// Root configuration for the event gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Events API listener (emitted events and sync HTTP subscriptions).
    pub events: ListenerConfig,

    /// Configuration API listener.
    pub config_api: ListenerConfig,

    /// Space used when a request carries no `Space` header.
    pub default_space: String,

    /// Async delivery worker pool.
    pub dispatch: DispatchConfig,

    /// Retry policy for async deliveries.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Configuration API access.
    pub admin: AdminConfig,

    /// Event types, functions and subscriptions registered at startup.
    #[serde(flatten)]
    pub seed: Seed,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            events: ListenerConfig::default(),
            config_api: ListenerConfig {
                bind_address: "127.0.0.1:4001".to_string(),
            },
            default_space: "default".to_string(),
            dispatch: DispatchConfig::default(),
            retries: RetryConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            seed: Seed::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Async worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Number of delivery workers.
    pub workers: usize,

    /// Bounded queue size. Defaults to twice the worker count.
    pub queue_capacity: Option<usize>,

    /// Seconds to wait for in-flight deliveries on shutdown.
    pub drain_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            queue_capacity: None,
            drain_timeout_secs: 30,
        }
    }
}

impl DispatchConfig {
    pub fn capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers * 2).max(1)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per delivery, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn attempts(&self) -> u32 {
        if self.enabled { self.max_attempts.max(1) } else { 1 }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Timeout of a single function call in seconds.
    pub function_call_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            function_call_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Configuration API access.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bearer token required on the configuration API. Open when unset.
    pub api_key: Option<String>,
}
