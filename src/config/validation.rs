//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, ports and the target authority
//! - Validate value ranges (timeouts > 0, message limit floor)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{ProxyConfig, MIN_MESSAGE_BYTES};
use crate::routing::Target;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("target.host must not be empty")]
    EmptyTargetHost,

    #[error("target.port must not be 0")]
    ZeroTargetPort,

    #[error("target `{0}` is not a valid URI authority")]
    InvalidTargetAuthority(String),

    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    #[error("websocket.max_message_bytes must be at least {min} (got {actual})")]
    MessageLimitTooSmall { min: usize, actual: usize },

    #[error("admin.bind_address must differ from listener.bind_address")]
    AdminAddressConflict,

    #[error("admin.restart_command must not be empty")]
    EmptyRestartCommand,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(
        &mut errors,
        "listener.bind_address",
        &config.listener.bind_address,
    );

    if config.target.host.trim().is_empty() {
        errors.push(ValidationError::EmptyTargetHost);
    }
    if config.target.port == 0 {
        errors.push(ValidationError::ZeroTargetPort);
    }
    if !config.target.host.trim().is_empty() && Target::from_config(&config.target).is_err() {
        errors.push(ValidationError::InvalidTargetAuthority(format!(
            "{}:{}",
            config.target.host, config.target.port
        )));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    if config.websocket.max_message_bytes < MIN_MESSAGE_BYTES {
        errors.push(ValidationError::MessageLimitTooSmall {
            min: MIN_MESSAGE_BYTES,
            actual: config.websocket.max_message_bytes,
        });
    }

    if config.websocket.close_timeout_secs == 0 {
        errors.push(ValidationError::Zero("websocket.close_timeout_secs"));
    }

    if config.limits.max_request_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_request_body_bytes"));
    }
    if config.limits.max_response_body_bytes == 0 {
        errors.push(ValidationError::Zero("limits.max_response_body_bytes"));
    }

    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.bind_address == config.listener.bind_address {
            errors.push(ValidationError::AdminAddressConflict);
        }
        if config.admin.restart_command.is_empty() {
            errors.push(ValidationError::EmptyRestartCommand);
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
