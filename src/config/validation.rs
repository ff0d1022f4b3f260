//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (drain timeout > 0, address resolves)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::ToSocketAddrs;
use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a resolvable host:port address")]
    InvalidBindAddress(String),

    #[error("listener.tls.cert_path must not be empty")]
    EmptyCertPath,

    #[error("listener.tls.key_path must not be empty")]
    EmptyKeyPath,

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let resolves = config
        .listener
        .bind_address
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false);
    if !resolves {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.tls.cert_path.trim().is_empty() {
        errors.push(ValidationError::EmptyCertPath);
    }
    if config.listener.tls.key_path.trim().is_empty() {
        errors.push(ValidationError::EmptyKeyPath);
    }
    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
