//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("{0}")]
    Other(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Source of fresh configuration snapshots.
///
/// Implementations must be safe to call repeatedly and must build a new
/// value on every call.
pub trait ConfigLoader: Send + Sync {
    fn load(&self) -> Result<ServerConfig, ConfigError>;
}

impl<F> ConfigLoader for F
where
    F: Fn() -> Result<ServerConfig, ConfigError> + Send + Sync,
{
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        self()
    }
}

/// Loads and validates configuration from a TOML file.
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    path: PathBuf,
    allow_missing: bool,
}

impl FileConfigLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            allow_missing: false,
        }
    }

    /// Treat a missing file as an empty one (all defaults).
    pub fn allow_missing(mut self, allow: bool) -> Self {
        self.allow_missing = allow;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigLoader for FileConfigLoader {
    fn load(&self) -> Result<ServerConfig, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_config(&self.path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound && self.allow_missing => {
                tracing::warn!(path = %self.path.display(), "Config file missing, using defaults");
                Ok(ServerConfig::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Parse and validate configuration text that was read from `path`.
pub fn parse_config(path: &Path, content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
