//! Configuration reload sequencing.
//!
//! # Sequence
//! ```text
//! take reload token (queue behind any running reload)
//!     → load candidate config      (failure: abort, nothing changed)
//!     → publish into ConfigStore
//!     → reopen fixed log sinks     (per-sink failures logged, not fatal)
//!     → reopen custom log sinks
//!     → run reload hooks           (see the new config)
//! release token
//! ```
//!
//! The token only serializes whole sequences. The pointer swap itself is
//! protected by the store.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::{ConfigError, ConfigLoader, ConfigStore, ServerConfig};
use crate::logsink::{LogSinks, SinkFailure};
use crate::observability::metrics;

/// Error type for a reload attempt.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The candidate configuration could not be built; the old one stays active.
    #[error(transparent)]
    Load(#[from] ConfigError),
}

/// A side effect that must follow configuration changes.
///
/// Hooks run after the swap, while the reload token is still held.
pub trait ReloadHook: Send + Sync {
    fn name(&self) -> &str;

    fn on_reload(&self, config: &Arc<ServerConfig>);
}

/// What a successful reload did.
#[derive(Debug)]
pub struct ReloadReport {
    /// Generation of the configuration that is now active.
    pub generation: u64,
    /// Sinks that kept their previous target.
    pub sink_failures: Vec<SinkFailure>,
}

impl ReloadReport {
    pub fn is_clean(&self) -> bool {
        self.sink_failures.is_empty()
    }
}

/// Serializes reloads and applies each one as a unit.
pub struct ReloadSequencer {
    token: Mutex<()>,
    loader: Arc<dyn ConfigLoader>,
    store: Arc<ConfigStore>,
    sinks: Arc<LogSinks>,
    hooks: Vec<Arc<dyn ReloadHook>>,
}

impl ReloadSequencer {
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        store: Arc<ConfigStore>,
        sinks: Arc<LogSinks>,
    ) -> Self {
        Self {
            token: Mutex::new(()),
            loader,
            store,
            sinks,
            hooks: Vec::new(),
        }
    }

    /// Add a hook. Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn ReloadHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Load a fresh configuration and make it active.
    ///
    /// Waits for any reload already running. On load failure nothing is
    /// changed and the error is returned.
    pub async fn reload(&self) -> Result<ReloadReport, ReloadError> {
        let _token = self.token.lock().await;
        let started = Instant::now();

        let config = match self.loader.load() {
            Ok(config) => Arc::new(config),
            Err(e) => {
                tracing::error!(error = %e, "Error reloading configuration");
                metrics::record_reload("failure");
                return Err(ReloadError::Load(e));
            }
        };

        let report = self.apply(config);
        metrics::record_reload("success");
        tracing::info!(
            generation = report.generation,
            sink_failures = report.sink_failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reloaded configuration"
        );
        Ok(report)
    }

    /// Make an already loaded configuration active, as a reload would.
    ///
    /// Used at startup so the first configuration goes through the same steps.
    pub async fn install(&self, config: ServerConfig) -> ReloadReport {
        let _token = self.token.lock().await;
        let report = self.apply(Arc::new(config));
        tracing::info!(generation = report.generation, "Configuration installed");
        report
    }

    fn apply(&self, config: Arc<ServerConfig>) -> ReloadReport {
        let generation = self.store.publish(Arc::clone(&config));

        let mut sink_failures = self.sinks.reopen_fixed(&config);
        sink_failures.extend(self.sinks.reopen_custom());

        for hook in &self.hooks {
            tracing::debug!(hook = hook.name(), "Running reload hook");
            hook.on_reload(&config);
        }

        ReloadReport {
            generation,
            sink_failures,
        }
    }
}

impl fmt::Debug for ReloadSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadSequencer")
            .field("hooks", &self.hooks.iter().map(|h| h.name()).collect::<Vec<_>>())
            .finish()
    }
}
