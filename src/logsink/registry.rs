//! Process-wide registry of log sinks.
//!
//! # Sinks
//! - Fixed: access, TLS, content index, script/audit, auth. Their paths come
//!   from the active configuration.
//! - Custom: extra sinks registered at runtime, keyed by their own path. The
//!   configuration does not name them; they are reopened at the same path.
//!
//! # Design Decisions
//! - The registry lives as long as the process; reload changes where sinks
//!   write, never the registry itself
//! - The custom map has its own lock; a reopen pass snapshots it and does
//!   the file I/O with the lock released

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::schema::ServerConfig;
use crate::logsink::sink::{LogSink, SinkError};
use crate::observability::metrics;

/// The sinks every server has, independent of runtime registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Access,
    Tls,
    ContentIndex,
    Script,
    Auth,
}

impl SinkKind {
    pub const ALL: [SinkKind; 5] = [
        SinkKind::Access,
        SinkKind::Tls,
        SinkKind::ContentIndex,
        SinkKind::Script,
        SinkKind::Auth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Access => "access",
            SinkKind::Tls => "tls",
            SinkKind::ContentIndex => "content_index",
            SinkKind::Script => "script",
            SinkKind::Auth => "auth",
        }
    }

    /// Where this sink should write under `config`.
    pub fn configured_path(&self, config: &ServerConfig) -> PathBuf {
        let logs = &config.logs;
        match self {
            SinkKind::Access => PathBuf::from(&logs.access_log),
            SinkKind::Tls => PathBuf::from(&logs.tls_log),
            SinkKind::ContentIndex => logs.content_index_path(),
            SinkKind::Script => PathBuf::from(&logs.script_log),
            SinkKind::Auth => PathBuf::from(&logs.auth_log),
        }
    }
}

/// One sink that could not be reopened during a reload.
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub error: SinkError,
}

impl fmt::Display for SinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink {}: {}", self.sink, self.error)
    }
}

/// All log sinks of the process.
#[derive(Debug)]
pub struct LogSinks {
    access: LogSink,
    tls: LogSink,
    content_index: LogSink,
    script: LogSink,
    auth: LogSink,
    custom: RwLock<HashMap<PathBuf, Arc<LogSink>>>,
}

impl LogSinks {
    pub fn new() -> Self {
        Self {
            access: LogSink::new(SinkKind::Access.as_str()),
            tls: LogSink::new(SinkKind::Tls.as_str()),
            content_index: LogSink::new(SinkKind::ContentIndex.as_str()),
            script: LogSink::new(SinkKind::Script.as_str()),
            auth: LogSink::new(SinkKind::Auth.as_str()),
            custom: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, kind: SinkKind) -> &LogSink {
        match kind {
            SinkKind::Access => &self.access,
            SinkKind::Tls => &self.tls,
            SinkKind::ContentIndex => &self.content_index,
            SinkKind::Script => &self.script,
            SinkKind::Auth => &self.auth,
        }
    }

    /// Return the custom sink for `path`, opening it on first use.
    pub fn register(&self, path: impl AsRef<Path>) -> Result<Arc<LogSink>, SinkError> {
        let path = path.as_ref();
        if let Some(existing) = self.custom(path) {
            return Ok(existing);
        }

        let mut custom = self.custom.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = custom.get(path) {
            return Ok(Arc::clone(existing));
        }
        let sink = Arc::new(LogSink::new(path.display().to_string()));
        sink.open(path)?;
        custom.insert(path.to_path_buf(), Arc::clone(&sink));
        Ok(sink)
    }

    pub fn custom(&self, path: impl AsRef<Path>) -> Option<Arc<LogSink>> {
        let custom = self.custom.read().unwrap_or_else(|e| e.into_inner());
        custom.get(path.as_ref()).cloned()
    }

    pub fn custom_paths(&self) -> Vec<PathBuf> {
        let custom = self.custom.read().unwrap_or_else(|e| e.into_inner());
        custom.keys().cloned().collect()
    }

    /// Reopen the fixed sinks at the paths named by `config`.
    ///
    /// Every sink is attempted; failures are logged and returned.
    pub fn reopen_fixed(&self, config: &ServerConfig) -> Vec<SinkFailure> {
        let mut failures = Vec::new();
        for kind in SinkKind::ALL {
            let path = kind.configured_path(config);
            if let Err(error) = self.get(kind).open(&path) {
                failures.push(report_failure(kind.as_str(), error));
            }
        }
        failures
    }

    /// Reopen every custom sink at its registered path.
    pub fn reopen_custom(&self) -> Vec<SinkFailure> {
        let snapshot: Vec<(PathBuf, Arc<LogSink>)> = {
            let custom = self.custom.read().unwrap_or_else(|e| e.into_inner());
            custom
                .iter()
                .map(|(path, sink)| (path.clone(), Arc::clone(sink)))
                .collect()
        };

        let mut failures = Vec::new();
        for (path, sink) in snapshot {
            if let Err(error) = sink.open(&path) {
                failures.push(report_failure(sink.name(), error));
            }
        }
        failures
    }

    /// Write a line to a fixed sink, logging instead of failing.
    pub fn write(&self, kind: SinkKind, line: &str) {
        if let Err(e) = self.get(kind).write_line(line) {
            tracing::warn!(sink = kind.as_str(), error = %e, "Failed to write log line");
        }
    }
}

impl Default for LogSinks {
    fn default() -> Self {
        Self::new()
    }
}

fn report_failure(sink: &str, error: SinkError) -> SinkFailure {
    tracing::warn!(sink = %sink, error = %error, "Failed to reopen log sink");
    metrics::record_sink_failure(sink);
    SinkFailure {
        sink: sink.to_string(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn fixed_sinks_follow_config() {
        let dir = tempfile::tempdir().unwrap();
        let content_dir = dir.path().join("content");
        fs::create_dir(&content_dir).unwrap();

        let mut config = ServerConfig::default();
        config.logs.access_log = dir.path().join("access.log").display().to_string();
        config.logs.auth_log = dir.path().join("auth.log").display().to_string();
        config.logs.content_log_dir = content_dir.display().to_string();

        let sinks = LogSinks::new();
        assert!(sinks.reopen_fixed(&config).is_empty());

        assert_eq!(
            sinks.get(SinkKind::Access).path(),
            Some(dir.path().join("access.log"))
        );
        assert_eq!(
            sinks.get(SinkKind::ContentIndex).path(),
            Some(content_dir.join("index.csv"))
        );
        assert!(!sinks.get(SinkKind::Tls).is_open());
    }

    #[test]
    fn one_bad_path_does_not_stop_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.logs.access_log = dir.path().join("nope").join("access.log").display().to_string();
        config.logs.auth_log = dir.path().join("auth.log").display().to_string();

        let sinks = LogSinks::new();
        let failures = sinks.reopen_fixed(&config);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sink, "access");
        assert!(sinks.get(SinkKind::Auth).is_open());
    }

    #[test]
    fn register_is_get_or_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.log");
        let sinks = LogSinks::new();

        let first = sinks.register(&path).unwrap();
        let second = sinks.register(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sinks.custom_paths(), vec![path]);
    }

    #[test]
    fn custom_sinks_reopen_at_their_own_path() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("x.log");
        let sinks = LogSinks::new();
        let sink = sinks.register(&x).unwrap();
        sink.write_line("old").unwrap();

        fs::rename(&x, dir.path().join("x.log.1")).unwrap();
        assert!(sinks.reopen_custom().is_empty());
        sink.write_line("new").unwrap();

        assert_eq!(fs::read_to_string(&x).unwrap(), "new\n");
    }
}
