//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Main listener (http::server) and per-user ports (listener.rs)
//!     → connection.rs (work tracking for graceful shutdown)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Each unit of work is tracked by an RAII guard
//! - Listeners stop accepting as soon as the shutdown token fires

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ListenerError, PortManager, PortOwner};
