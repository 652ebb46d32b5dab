//! Shutdown coordination for the server.
//!
//! # States
//! ```text
//! Running → Draining → Terminated
//! ```
//! `Running → Draining` happens once, on the first `begin_shutdown`.
//! `Draining → Terminated` happens when in-flight work reaches zero or the
//! grace period runs out, whichever comes first. There is no way back.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::ConfigStore;
use crate::lifecycle::pidfile;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};

/// Grace period used when the configuration does not override it.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(20);

/// Lifecycle state of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    Draining = 1,
    Terminated = 2,
}

impl ShutdownState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ShutdownState::Running,
            1 => ShutdownState::Draining,
            _ => ShutdownState::Terminated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownState::Running => "running",
            ShutdownState::Draining => "draining",
            ShutdownState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// All in-flight work finished.
    Drained,
    /// The grace period elapsed with work still in flight.
    TimedOut,
}

/// Called once when the coordinator reaches `Terminated`.
pub type ExitAction = Arc<dyn Fn(ShutdownOutcome) + Send + Sync>;

/// Exit action used in production: terminate the process with status 0.
pub fn process_exit() -> ExitAction {
    Arc::new(|outcome| {
        tracing::info!(?outcome, "Shutdown complete, exiting");
        std::process::exit(0);
    })
}

/// Coordinator for graceful shutdown.
///
/// Owns the one-shot shutdown signal and the in-flight work counter.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    state: AtomicU8,
    tracker: ConnectionTracker,
    grace_period: Duration,
    config: Arc<ConfigStore>,
    outcome: watch::Sender<Option<ShutdownOutcome>>,
    exit: ExitAction,
}

impl ShutdownCoordinator {
    /// Create a coordinator that exits the process when it terminates.
    pub fn new(config: Arc<ConfigStore>, grace_period: Duration) -> Self {
        Self::with_exit_action(config, grace_period, process_exit())
    }

    pub fn with_exit_action(
        config: Arc<ConfigStore>,
        grace_period: Duration,
        exit: ExitAction,
    ) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            token: CancellationToken::new(),
            state: AtomicU8::new(ShutdownState::Running as u8),
            tracker: ConnectionTracker::new(),
            grace_period,
            config,
            outcome,
            exit,
        }
    }

    /// Register a unit of work. Dropping the guard completes it.
    pub fn register_work(&self) -> ConnectionGuard {
        self.tracker.track()
    }

    pub fn active_work(&self) -> u64 {
        self.tracker.active_count()
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// True once shutdown has begun. New work should be refused.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// A clone of the shutdown token for tasks that stop on shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Resolves once shutdown has begun; immediately if it already has.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Begin shutdown and wait for it to finish.
    ///
    /// The first caller raises the signal, removes the pid file, races the
    /// drain against the grace period and runs the exit action. Every other
    /// caller, concurrent or later, waits for that same outcome.
    pub async fn begin_shutdown(&self) -> ShutdownOutcome {
        let won = self
            .state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::Draining as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if !won {
            tracing::debug!("Shutdown already in progress");
            return self.terminated().await;
        }

        tracing::info!(
            active = self.tracker.active_count(),
            grace_period_secs = self.grace_period.as_secs_f64(),
            "Shutting down, draining in-flight work"
        );
        self.token.cancel();

        if let Some(path) = self.config.current().and_then(|c| c.pid_file.clone()) {
            pidfile::remove_pid_file(&path);
        }

        let outcome = tokio::select! {
            biased;
            _ = self.tracker.wait_idle() => ShutdownOutcome::Drained,
            _ = tokio::time::sleep(self.grace_period) => ShutdownOutcome::TimedOut,
        };

        match outcome {
            ShutdownOutcome::Drained => tracing::info!("All in-flight work finished"),
            ShutdownOutcome::TimedOut => tracing::warn!(
                remaining = self.tracker.active_count(),
                "Grace period elapsed with work still in flight"
            ),
        }

        self.state
            .store(ShutdownState::Terminated as u8, Ordering::SeqCst);
        self.outcome.send_replace(Some(outcome));
        (self.exit)(outcome);
        outcome
    }

    /// Wait until the coordinator reaches `Terminated`.
    pub async fn terminated(&self) -> ShutdownOutcome {
        let mut rx = self.outcome.subscribe();
        let result = rx.wait_for(Option::is_some).await;
        match result {
            Ok(outcome) => (*outcome).unwrap_or(ShutdownOutcome::TimedOut),
            Err(_) => ShutdownOutcome::TimedOut,
        }
    }
}

impl fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("state", &self.state())
            .field("active", &self.tracker.active_count())
            .field("grace_period", &self.grace_period)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::Instant;

    fn coordinator(grace: Duration) -> (Arc<ShutdownCoordinator>, Arc<AtomicUsize>) {
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);
        let exit: ExitAction = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let store = Arc::new(ConfigStore::new());
        (
            Arc::new(ShutdownCoordinator::with_exit_action(store, grace, exit)),
            exits,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn idle_server_terminates_immediately() {
        let (shutdown, exits) = coordinator(DEFAULT_GRACE_PERIOD);
        {
            let _a = shutdown.register_work();
            let _b = shutdown.register_work();
        }

        let start = Instant::now();
        let outcome = shutdown.begin_shutdown().await;

        assert_eq!(outcome, ShutdownOutcome::Drained);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(shutdown.state(), ShutdownState::Terminated);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_work_is_cut_off_at_grace_period() {
        let (shutdown, exits) = coordinator(Duration::from_secs(20));
        let _stuck = shutdown.register_work();

        let start = Instant::now();
        let outcome = shutdown.begin_shutdown().await;

        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_finishing_early_wins_the_race() {
        let (shutdown, _) = coordinator(Duration::from_secs(20));
        let guard = shutdown.register_work();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            drop(guard);
        });

        let start = Instant::now();
        assert_eq!(shutdown.begin_shutdown().await, ShutdownOutcome::Drained);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_triggers_transition_once() {
        let (shutdown, exits) = coordinator(Duration::from_secs(5));
        let guard = shutdown.register_work();

        let callers: Vec<_> = (0..8)
            .map(|_| {
                let shutdown = Arc::clone(&shutdown);
                tokio::spawn(async move { shutdown.begin_shutdown().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(shutdown.state(), ShutdownState::Draining);
        assert!(shutdown.is_shutting_down());
        drop(guard);

        for caller in callers {
            assert_eq!(caller.await.unwrap(), ShutdownOutcome::Drained);
        }
        assert_eq!(exits.load(Ordering::SeqCst), 1);

        // a late trigger observes the same terminal outcome
        assert_eq!(shutdown.begin_shutdown().await, ShutdownOutcome::Drained);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn token_is_broadcast_to_every_waiter() {
        let (shutdown, _) = coordinator(Duration::from_secs(1));
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let token = shutdown.token();
                tokio::spawn(async move { token.cancelled().await })
            })
            .collect();

        shutdown.begin_shutdown().await;
        for waiter in waiters {
            waiter.await.unwrap();
        }
        // already raised: resolves without waiting
        shutdown.cancelled().await;
    }

    #[tokio::test]
    async fn pid_file_is_removed_when_shutdown_begins() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("server.pid");
        pidfile::write_pid_file(&pid_path).unwrap();

        let store = Arc::new(ConfigStore::new());
        store.publish(ServerConfig {
            pid_file: Some(pid_path.clone()),
            ..ServerConfig::default()
        });
        let shutdown = ShutdownCoordinator::with_exit_action(
            store,
            Duration::from_secs(1),
            Arc::new(|_| {}),
        );

        shutdown.begin_shutdown().await;
        assert!(!pid_path.exists());
    }

    #[tokio::test]
    async fn shutdown_before_config_is_loaded() {
        let (shutdown, exits) = coordinator(Duration::from_secs(1));
        assert_eq!(shutdown.begin_shutdown().await, ShutdownOutcome::Drained);
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }
}
