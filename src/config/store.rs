//! The active configuration slot.
//!
//! Readers call [`ConfigStore::current`] on every request; the only writer is
//! the reload sequencer. The slot holds an `Arc` that is replaced in a single
//! atomic store, so a reader sees either the old snapshot or the new one.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::schema::ServerConfig;

/// What the slot points at: the configuration plus the publish counter.
#[derive(Debug)]
struct Published {
    generation: u64,
    config: Arc<ServerConfig>,
}

/// Holds the currently active [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ConfigStore {
    slot: ArcSwapOption<Published>,
}

impl ConfigStore {
    /// Create an empty store. `current()` returns `None` until the first publish.
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently published configuration, or `None` before initialization.
    pub fn current(&self) -> Option<Arc<ServerConfig>> {
        self.slot.load().as_ref().map(|p| Arc::clone(&p.config))
    }

    /// Replace the active configuration and return its generation number.
    ///
    /// Generations start at 1 and increase by one per publish.
    pub fn publish(&self, config: impl Into<Arc<ServerConfig>>) -> u64 {
        let config = config.into();
        let previous = self.slot.rcu(|prev| {
            let generation = prev.as_ref().map_or(0, |p| p.generation) + 1;
            Some(Arc::new(Published {
                generation,
                config: Arc::clone(&config),
            }))
        });
        previous.as_ref().map_or(0, |p| p.generation) + 1
    }

    /// Generation of the active configuration; 0 before initialization.
    pub fn generation(&self) -> u64 {
        self.slot.load().as_ref().map_or(0, |p| p.generation)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.load().is_some()
    }
}
