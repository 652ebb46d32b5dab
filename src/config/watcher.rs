//! Configuration file watcher for hot reload.
//!
//! The watcher never loads configuration itself. It only asks for a reload
//! through the control channel, so file edits go through the same serialized
//! sequence as SIGHUP and the admin endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::lifecycle::signals::{ControlEvent, ControlHandle};

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    control: ControlHandle,
}

impl ConfigWatcher {
    pub fn new(path: &Path, control: ControlHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            control,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let control = self.control.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, requesting reload");
                        if !control.send(ControlEvent::Reload) {
                            tracing::warn!("Control channel closed, ignoring config change");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
