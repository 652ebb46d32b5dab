//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGHUP, SIGTERM)
//! - Translate signals to internal control events
//! - Dispatch events to the reload sequencer and shutdown coordinator
//!
//! # Design Decisions
//! - Signal delivery only enqueues an event; a single dispatcher task does
//!   the work, which may block for a long time
//! - SIGHUP triggers config reload, not shutdown
//! - Once shutdown has begun, reload events are ignored

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::reload::ReloadSequencer;
use crate::lifecycle::shutdown::ShutdownCoordinator;

/// An action requested from outside the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Reload configuration (SIGHUP).
    Reload,
    /// Graceful shutdown (SIGTERM).
    Shutdown,
}

/// Cheap handle for submitting control events.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl ControlHandle {
    /// Queue an event without blocking. Returns false if the router is gone.
    pub fn send(&self, event: ControlEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Consumes control events and routes them to the lifecycle subsystems.
pub struct SignalRouter {
    rx: mpsc::UnboundedReceiver<ControlEvent>,
    handle: ControlHandle,
    reloader: Arc<ReloadSequencer>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl SignalRouter {
    pub fn new(reloader: Arc<ReloadSequencer>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            rx,
            handle: ControlHandle { tx },
            reloader,
            shutdown,
        }
    }

    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    /// Run the dispatcher on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process events until every handle is dropped.
    ///
    /// The router keeps its own handle, so in practice this runs for the
    /// life of the process.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event).await;
        }
    }

    async fn dispatch(&self, event: ControlEvent) {
        match event {
            ControlEvent::Reload => {
                if self.shutdown.is_shutting_down() {
                    tracing::info!("Ignoring reload request, shutdown in progress");
                    return;
                }
                // the sequencer logs both outcomes and every sink failure
                let _ = self.reloader.reload().await;
            }
            ControlEvent::Shutdown => {
                let outcome = self.shutdown.begin_shutdown().await;
                tracing::debug!(?outcome, "Shutdown event handled");
            }
        }
    }
}

/// Forward SIGHUP and SIGTERM to the control channel.
///
/// The spawned task only enqueues events and never blocks on them.
#[cfg(unix)]
pub fn listen_os_signals(control: ControlHandle) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(()) = hangup.recv() => {
                    tracing::info!("Received SIGHUP");
                    ControlEvent::Reload
                }
                Some(()) = terminate.recv() => {
                    tracing::info!("Received SIGTERM");
                    ControlEvent::Shutdown
                }
                else => break,
            };
            if !control.send(event) {
                break;
            }
        }
    }))
}

/// Without Unix signals, Ctrl+C stands in for SIGTERM.
#[cfg(not(unix))]
pub fn listen_os_signals(control: ControlHandle) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C");
            if !control.send(ControlEvent::Shutdown) {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ConfigStore, ServerConfig};
    use crate::lifecycle::shutdown::{ExitAction, ShutdownOutcome, ShutdownState};
    use crate::logsink::LogSinks;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Harness {
        handle: ControlHandle,
        shutdown: Arc<ShutdownCoordinator>,
        store: Arc<ConfigStore>,
        loads: Arc<AtomicUsize>,
        exits: Arc<AtomicUsize>,
    }

    fn harness() -> Harness {
        let store = Arc::new(ConfigStore::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let exits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&loads);
        let reloader = Arc::new(ReloadSequencer::new(
            Arc::new(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok::<_, ConfigError>(ServerConfig {
                    server_name: format!("reload-{n}"),
                    ..ServerConfig::default()
                })
            }),
            Arc::clone(&store),
            Arc::new(LogSinks::new()),
        ));
        let exit_counter = Arc::clone(&exits);
        let exit: ExitAction = Arc::new(move |_| {
            exit_counter.fetch_add(1, Ordering::SeqCst);
        });
        let shutdown = Arc::new(ShutdownCoordinator::with_exit_action(
            Arc::clone(&store),
            Duration::from_secs(1),
            exit,
        ));

        let router = SignalRouter::new(reloader, Arc::clone(&shutdown));
        let handle = router.handle();
        router.spawn();

        Harness {
            handle,
            shutdown,
            store,
            loads,
            exits,
        }
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn reload_events_reach_the_sequencer() {
        let h = harness();
        assert!(h.handle.send(ControlEvent::Reload));
        assert!(h.handle.send(ControlEvent::Reload));
        settle().await;

        assert_eq!(h.loads.load(Ordering::SeqCst), 2);
        assert_eq!(h.store.current().unwrap().server_name, "reload-2");
    }

    #[tokio::test]
    async fn reload_after_shutdown_is_ignored() {
        let h = harness();
        h.handle.send(ControlEvent::Reload);
        h.handle.send(ControlEvent::Shutdown);
        h.handle.send(ControlEvent::Reload);
        h.handle.send(ControlEvent::Shutdown);

        assert_eq!(h.shutdown.terminated().await, ShutdownOutcome::Drained);
        settle().await;

        assert_eq!(h.loads.load(Ordering::SeqCst), 1);
        assert_eq!(h.shutdown.state(), ShutdownState::Terminated);
        assert_eq!(h.exits.load(Ordering::SeqCst), 1);
    }
}
