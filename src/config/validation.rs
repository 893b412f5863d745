//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (workers > 0, addresses parse)
//! - Check seeded entries for obviously broken fields
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Referential checks on seeded entries are left to the catalog

use std::net::SocketAddr;

use crate::catalog::validate_space;
use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, addr) in [
        ("events.bind_address", &config.events.bind_address),
        ("config_api.bind_address", &config.config_api.bind_address),
    ] {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(field, format!("invalid socket address {:?}", addr)));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address {:?}", config.observability.metrics_address),
        ));
    }

    if let Err(e) = validate_space(&config.default_space) {
        errors.push(ValidationError::new("default_space", e.to_string()));
    }

    if config.dispatch.workers == 0 {
        errors.push(ValidationError::new("dispatch.workers", "must be greater than 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.function_call_secs == 0 {
        errors.push(ValidationError::new("timeouts.function_call_secs", "must be greater than 0"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new("retries.base_delay_ms", "must not exceed max_delay_ms"));
    }

    for (i, function) in config.seed.functions.iter().enumerate() {
        if let Err(message) = function.provider.validate() {
            errors.push(ValidationError::new(format!("functions[{}]", i), message));
        }
    }

    if let Some(key) = &config.admin.api_key {
        if key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty when set"));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
