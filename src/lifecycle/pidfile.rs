//! Process identity file.

use std::fs;
use std::io;
use std::path::Path;

/// Write the current process id to `path`, replacing any stale file.
pub fn write_pid_file(path: &Path) -> io::Result<()> {
    fs::write(path, format!("{}\n", std::process::id()))?;
    tracing::info!(path = %path.display(), pid = std::process::id(), "PID file written");
    Ok(())
}

/// Remove the pid file. A file that is already gone is not an error.
pub fn remove_pid_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "PID file removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "PID file already absent");
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove PID file"),
    }
}
