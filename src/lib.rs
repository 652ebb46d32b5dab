//! Reloadable Server Library
//!
//! Live reconfiguration and graceful shutdown for a long-running HTTP server.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod logsink;
pub mod net;
pub mod observability;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::{ServerContext, StartupOptions};
