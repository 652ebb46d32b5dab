//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (main listener or per-user port)
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (assign request ID)
//!     → server.rs track_work (refuse during shutdown, count in-flight work)
//!     → server.rs serve_request (read current config, write access log)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
