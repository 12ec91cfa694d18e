//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Check addresses parse before any subsystem starts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::SidecarConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("application.ip: invalid IP address {0:?}")]
    InvalidIp(String),

    #[error("application.port must be set")]
    MissingPort,

    #[error("registration.service must not be empty")]
    MissingService,

    #[error("directory.server_addresses must list at least one server")]
    NoDirectoryServers,

    #[error("registration.weight must be positive, got {0}")]
    InvalidWeight(f64),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Validate a fully merged configuration.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.application.ip.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidIp(config.application.ip.clone()));
    }

    if config.application.port == 0 {
        errors.push(ValidationError::MissingPort);
    }

    if config.registration.service.trim().is_empty() {
        errors.push(ValidationError::MissingService);
    }

    if !(config.registration.weight > 0.0) {
        errors.push(ValidationError::InvalidWeight(config.registration.weight));
    }

    if config.directory.server_addresses.is_empty() {
        errors.push(ValidationError::NoDirectoryServers);
    }

    let durations = [
        ("directory.timeout_ms", config.directory.timeout_ms),
        ("directory.beat_interval_ms", config.directory.beat_interval_ms),
        ("lifecycle.probe_interval_ms", config.lifecycle.probe_interval_ms),
        ("lifecycle.probe_timeout_ms", config.lifecycle.probe_timeout_ms),
        ("lifecycle.retry_interval_ms", config.lifecycle.retry_interval_ms),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
