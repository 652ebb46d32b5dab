//! A single reopenable log file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

/// Error type for sink operations.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
}

#[derive(Debug, Default)]
struct SinkState {
    path: Option<PathBuf>,
    file: Option<File>,
}

/// A named, append-only log destination that can be pointed at a new path
/// while other threads are writing to it.
///
/// `open` builds the new handle first and swaps it in under the lock, so a
/// writer either finishes on the old file or starts on the new one. The old
/// handle is closed when it is replaced.
#[derive(Debug)]
pub struct LogSink {
    name: String,
    state: Mutex<SinkState>,
}

impl LogSink {
    /// Create a closed sink. Writes are discarded until it is opened.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(SinkState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open or reopen the sink at `path`. An empty path closes it.
    ///
    /// On failure the previous handle stays in place.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<(), SinkError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            let mut state = self.lock();
            state.file = None;
            state.path = None;
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| SinkError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let previous = {
            let mut state = self.lock();
            state.path = Some(path.to_path_buf());
            state.file.replace(file)
        };
        drop(previous);

        tracing::debug!(sink = %self.name, path = %path.display(), "Log sink opened");
        Ok(())
    }

    /// Append one line. A closed sink silently drops the line.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut state = self.lock();
        match state.file.as_mut() {
            Some(file) => {
                let mut buf = Vec::with_capacity(line.len() + 1);
                buf.extend_from_slice(line.as_bytes());
                buf.push(b'\n');
                file.write_all(&buf)
            }
            None => Ok(()),
        }
    }

    /// Path the sink currently writes to.
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    pub fn is_open(&self) -> bool {
        self.lock().file.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // a writer that panicked mid-line leaves nothing worth protecting
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
