//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build context → Install first config → Write pid file → Start listeners
//!
//! Reload (reload.rs):
//!     SIGHUP / admin endpoint / file watcher
//!     → take reload token → load → swap → reopen sinks → hooks
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM → raise shutdown signal → remove pid file
//!     → race (drain to zero, grace period) → exit
//!
//! Signals (signals.rs):
//!     SIGHUP → ControlEvent::Reload
//!     SIGTERM → ControlEvent::Shutdown
//! ```
//!
//! # Design Decisions
//! - Lock nesting is one-directional: the reload token wraps the config swap
//! - Shutdown has timeout: forced exit after the grace period
//! - Shutdown is irreversible; reload events after it are ignored

pub mod pidfile;
pub mod reload;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use reload::{ReloadError, ReloadHook, ReloadReport, ReloadSequencer};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownState};
pub use signals::{ControlEvent, ControlHandle, SignalRouter};
pub use startup::{ServerContext, StartupOptions};
