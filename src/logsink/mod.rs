//! Log sink subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers / subsystems
//!     → registry.rs (pick fixed or custom sink)
//!     → sink.rs (append line under the sink's lock)
//!
//! On reload:
//!     lifecycle::reload
//!     → registry.rs reopen_fixed (paths from the new config)
//!     → registry.rs reopen_custom (paths from registration)
//! ```

pub mod registry;
pub mod sink;

pub use registry::{LogSinks, SinkFailure, SinkKind};
pub use sink::{LogSink, SinkError};
