//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
///
/// A published `ServerConfig` is never mutated; a reload builds a new one.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported by the request handler and the admin status endpoint.
    pub server_name: String,

    /// Listener configuration (main address, per-user ports).
    pub listener: ListenerConfig,

    /// Log sink destinations, reopened on every reload.
    pub logs: LogConfig,

    /// Process identity file, written at startup and removed when shutdown begins.
    pub pid_file: Option<PathBuf>,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "reloadable-server".to_string(),
            listener: ListenerConfig::default(),
            logs: LogConfig::default(),
            pid_file: None,
            shutdown: ShutdownConfig::default(),
            timeouts: TimeoutConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address for the main listener (e.g., "0.0.0.0:8080").
    ///
    /// Only read at startup; changing it requires a restart.
    pub bind_address: String,

    /// IP address the per-user ports bind to.
    pub per_user_ip: String,

    /// Extra ports dedicated to a single user. New entries are opened on reload.
    pub per_user_ports: Vec<PerUserPort>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            per_user_ip: "0.0.0.0".to_string(),
            per_user_ports: Vec::new(),
        }
    }
}

/// A listener port whose traffic is attributed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PerUserPort {
    pub user: String,
    pub port: u16,
}

/// Log sink paths. An empty path disables the sink.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LogConfig {
    /// Access log, one line per request.
    pub access_log: String,

    /// TLS session log.
    pub tls_log: String,

    /// Directory holding the content log; the index lives at `index.csv` inside it.
    pub content_log_dir: String,

    /// Script/audit log.
    pub script_log: String,

    /// Authentication log.
    pub auth_log: String,
}

/// File name of the content index inside `content_log_dir`.
pub const CONTENT_INDEX_FILE: &str = "index.csv";

impl LogConfig {
    /// Path of the content index, or an empty path when no directory is configured.
    pub fn content_index_path(&self) -> PathBuf {
        if self.content_log_dir.is_empty() {
            PathBuf::new()
        } else {
            PathBuf::from(&self.content_log_dir).join(CONTENT_INDEX_FILE)
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Maximum time in seconds allowed for in-flight work to drain.
    ///
    /// Read once at startup.
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 20,
        }
    }
}

/// Timeout configuration for request handling.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the `/admin` routes on the main listener.
    pub enabled: bool,

    /// API key for authentication (Bearer token). Empty disables the check.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Emit process logs as JSON lines.
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
