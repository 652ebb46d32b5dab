//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the shared server context once, before any signal is handled
//! - Wire the reload sequencer, shutdown coordinator and signal router
//! - Install the first configuration through the reload path
//! - Write the pid file
//!
//! # Design Decisions
//! - Every component receives the context (or the parts it needs); nothing
//!   reaches for process globals
//! - Subsystems initialize in order, not concurrently

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigLoader, ConfigStore, ServerConfig};
use crate::http::server::{app_router, AppState};
use crate::lifecycle::pidfile;
use crate::lifecycle::reload::{ReloadReport, ReloadSequencer};
use crate::lifecycle::shutdown::{process_exit, ExitAction, ShutdownCoordinator, DEFAULT_GRACE_PERIOD};
use crate::lifecycle::signals::{ControlHandle, SignalRouter};
use crate::logsink::LogSinks;
use crate::net::listener::PortManager;

/// Settings fixed for the life of the process.
pub struct StartupOptions {
    pub grace_period: Duration,
    pub request_timeout: Duration,
    pub exit: ExitAction,
}

impl StartupOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            grace_period: Duration::from_secs(config.shutdown.grace_period_secs),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
            exit: process_exit(),
        }
    }

    pub fn with_exit_action(mut self, exit: ExitAction) -> Self {
        self.exit = exit;
        self
    }
}

impl Default for StartupOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            request_timeout: Duration::from_secs(30),
            exit: process_exit(),
        }
    }
}

/// Shared process state, cloned into every component that needs it.
#[derive(Clone)]
pub struct ServerContext {
    pub config: Arc<ConfigStore>,
    pub sinks: Arc<LogSinks>,
    pub shutdown: Arc<ShutdownCoordinator>,
    pub reloader: Arc<ReloadSequencer>,
    pub ports: Arc<PortManager>,
    pub control: ControlHandle,
    pub request_timeout: Duration,
}

impl ServerContext {
    /// Build the context and the signal router that feeds it.
    ///
    /// The store is empty until [`ServerContext::start`] runs.
    pub fn bootstrap(loader: Arc<dyn ConfigLoader>, options: StartupOptions) -> (Self, SignalRouter) {
        let config = Arc::new(ConfigStore::new());
        let sinks = Arc::new(LogSinks::new());
        let shutdown = Arc::new(ShutdownCoordinator::with_exit_action(
            Arc::clone(&config),
            options.grace_period,
            options.exit,
        ));

        let app_state = AppState {
            config: Arc::clone(&config),
            sinks: Arc::clone(&sinks),
            shutdown: Arc::clone(&shutdown),
        };
        let ports = Arc::new(PortManager::new(
            app_router(app_state, options.request_timeout),
            shutdown.token(),
        ));

        let reloader = Arc::new(
            ReloadSequencer::new(loader, Arc::clone(&config), Arc::clone(&sinks))
                .with_hook(ports.clone()),
        );
        let router = SignalRouter::new(Arc::clone(&reloader), Arc::clone(&shutdown));

        let ctx = Self {
            config,
            sinks,
            shutdown,
            reloader,
            ports,
            control: router.handle(),
            request_timeout: options.request_timeout,
        };
        (ctx, router)
    }

    /// Install the first configuration and write the pid file.
    pub async fn start(&self, initial: ServerConfig) -> io::Result<ReloadReport> {
        let pid_file = initial.pid_file.clone();
        let report = self.reloader.install(initial).await;
        if let Some(path) = pid_file {
            pidfile::write_pid_file(&path)?;
        }
        Ok(report)
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            config: Arc::clone(&self.config),
            sinks: Arc::clone(&self.sinks),
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}
