//! Per-user listener ports.
//!
//! # Responsibilities
//! - Bind the per-user ports named in the configuration
//! - Open ports added by a reload without touching ones already open
//! - Tag every request on a per-user port with its owner
//! - Stop accepting when shutdown begins
//!
//! # Design Decisions
//! - Ports removed from the configuration stay open until restart
//! - A port that fails to bind is logged and retried on the next reload

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{Extension, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{PerUserPort, ServerConfig};
use crate::lifecycle::reload::ReloadHook;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid per-user ip '{0}'")]
    InvalidIp(String),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
}

/// The user a per-user port belongs to, attached to each request as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOwner(pub String);

/// Reload hook that keeps the per-user ports open.
pub struct PortManager {
    app: Router,
    shutdown: CancellationToken,
    open: Mutex<HashMap<u16, SocketAddr>>,
}

impl PortManager {
    /// `app` is served on every per-user port; it should not expose admin routes.
    pub fn new(app: Router, shutdown: CancellationToken) -> Self {
        Self {
            app,
            shutdown,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Addresses of the ports currently being served.
    pub fn open_ports(&self) -> Vec<SocketAddr> {
        let open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        let mut addrs: Vec<SocketAddr> = open.values().copied().collect();
        addrs.sort();
        addrs
    }

    /// Open every configured port that is not already open.
    pub fn sync(&self, config: &ServerConfig) -> Vec<ListenerError> {
        let ip: IpAddr = match config.listener.per_user_ip.parse() {
            Ok(ip) => ip,
            Err(_) if config.listener.per_user_ports.is_empty() => return Vec::new(),
            Err(_) => {
                return vec![ListenerError::InvalidIp(
                    config.listener.per_user_ip.clone(),
                )]
            }
        };

        let mut errors = Vec::new();
        let mut open = self.open.lock().unwrap_or_else(|e| e.into_inner());
        for entry in &config.listener.per_user_ports {
            if open.contains_key(&entry.port) {
                continue;
            }
            match self.serve(ip, entry) {
                Ok(addr) => {
                    open.insert(entry.port, addr);
                }
                Err(e) => errors.push(e),
            }
        }
        errors
    }

    fn serve(&self, ip: IpAddr, entry: &PerUserPort) -> Result<SocketAddr, ListenerError> {
        let addr = SocketAddr::new(ip, entry.port);
        let bind = |source| ListenerError::Bind { addr, source };

        let std_listener = std::net::TcpListener::bind(addr).map_err(bind)?;
        std_listener.set_nonblocking(true).map_err(bind)?;
        let listener = TcpListener::from_std(std_listener).map_err(bind)?;

        let app = self
            .app
            .clone()
            .layer(Extension(PortOwner(entry.user.clone())));
        let token = self.shutdown.clone();
        let user = entry.user.clone();

        tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            match served {
                Ok(()) => tracing::info!(user = %user, address = %addr, "Per-user port closed"),
                Err(e) => tracing::error!(user = %user, address = %addr, error = %e, "Per-user port failed"),
            }
        });

        tracing::info!(user = %entry.user, address = %addr, "Per-user port opened");
        Ok(addr)
    }
}

impl ReloadHook for PortManager {
    fn name(&self) -> &str {
        "per_user_ports"
    }

    fn on_reload(&self, config: &Arc<ServerConfig>) {
        for error in self.sync(config) {
            tracing::error!(error = %error, "Failed to open per-user port");
        }
    }
}
