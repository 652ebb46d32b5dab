//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (grace period > 0, ports valid)
//! - Detect conflicting per-user ports
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.per_user_ip '{0}' is not an IP address")]
    PerUserIp(String),

    #[error("per-user port for '{0}' must not be 0")]
    ZeroPort(String),

    #[error("per-user port {port} is assigned to both '{first}' and '{second}'")]
    DuplicatePort {
        port: u16,
        first: String,
        second: String,
    },

    #[error("shutdown.grace_period_secs must be greater than 0")]
    GracePeriod,

    #[error("timeouts.request_secs must be greater than 0")]
    RequestTimeout,
}

/// Check a parsed configuration, collecting every problem.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if !config.listener.per_user_ports.is_empty()
        && config.listener.per_user_ip.parse::<IpAddr>().is_err()
    {
        errors.push(ValidationError::PerUserIp(config.listener.per_user_ip.clone()));
    }

    let mut seen: HashSet<u16> = HashSet::new();
    for entry in &config.listener.per_user_ports {
        if entry.port == 0 {
            errors.push(ValidationError::ZeroPort(entry.user.clone()));
            continue;
        }
        if !seen.insert(entry.port) {
            let first = config
                .listener
                .per_user_ports
                .iter()
                .find(|p| p.port == entry.port)
                .map(|p| p.user.clone())
                .unwrap_or_default();
            errors.push(ValidationError::DuplicatePort {
                port: entry.port,
                first,
                second: entry.user.clone(),
            });
        }
    }

    if config.shutdown.grace_period_secs == 0 {
        errors.push(ValidationError::GracePeriod);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PerUserPort;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServerConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.shutdown.grace_period_secs = 0;
        config.listener.per_user_ports = vec![
            PerUserPort { user: "alice".into(), port: 7001 },
            PerUserPort { user: "bob".into(), port: 7001 },
            PerUserPort { user: "carol".into(), port: 0 },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::GracePeriod));
        assert!(errors.contains(&ValidationError::DuplicatePort {
            port: 7001,
            first: "alice".into(),
            second: "bob".into(),
        }));
        assert!(errors.contains(&ValidationError::ZeroPort("carol".into())));
    }
}
