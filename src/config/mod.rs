//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → store.rs (published as Arc, read on every request)
//!
//! On reload trigger (SIGHUP, admin endpoint, watcher.rs):
//!     lifecycle::reload takes the reload token
//!     → loader.rs loads new config
//!     → store.rs swaps the Arc<ServerConfig>
//!     → subsystems observe new config on their next read
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Loading happens outside the store; the store only swaps pointers

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigLoader, FileConfigLoader};
pub use schema::{
    AdminConfig, ListenerConfig, LogConfig, ObservabilityConfig, PerUserPort, ServerConfig,
};
pub use store::ConfigStore;
