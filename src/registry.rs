//! Coordinators shared between measures, keyed by player name.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Weak},
};

use anyhow::{Context as _, Result};
use parking_lot::Mutex;

use crate::{
    backend::Backend,
    config::Config,
    coordinator::{Capabilities, Coordinator},
    lyrics::LyricsProvider,
    player::{Command, PlayerSnapshot},
};

#[cfg(test)]
mod tests;

type Table = Mutex<HashMap<String, Arc<Coordinator>>>;

/// Hands out [`Measure`]s sharing one [`Coordinator`] per player.
///
/// A coordinator is created by the first attach to its player and destroyed
/// once its last measure detaches.
pub struct Registry {
    config: Config,
    lyrics_provider: Arc<dyn LyricsProvider>,
    table: Arc<Table>,
}

impl Registry {
    #[must_use]
    pub fn new(config: Config, lyrics_provider: Arc<dyn LyricsProvider>) -> Self {
        Self {
            config,
            lyrics_provider,
            table: Arc::default(),
        }
    }

    /// Attach a measure to the coordinator of `player`. `backend` is only
    /// called when that coordinator doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend of a new coordinator can't be created.
    pub fn attach<F>(&self, player: &str, backend: F) -> Result<Measure>
    where
        F: FnOnce() -> Result<Box<dyn Backend>>,
    {
        let mut table = self.table.lock();
        let coordinator = match table.entry(player.to_owned()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let backend =
                    backend().with_context(|| format!("Failed to create backend for {player}"))?;
                tracing::info!(player, "Creating coordinator");
                let coordinator = Coordinator::new(
                    player.to_owned(),
                    backend,
                    &self.config,
                    Arc::clone(&self.lyrics_provider),
                );
                Arc::clone(entry.insert(Arc::new(coordinator)))
            }
        };
        let instances = coordinator.attach();
        tracing::debug!(player, instances, "Measure attached");

        Ok(Measure {
            coordinator,
            table: Arc::downgrade(&self.table),
        })
    }

    #[must_use]
    pub fn is_attached(&self, player: &str) -> bool {
        self.table.lock().contains_key(player)
    }

    /// Number of live coordinators
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One polling caller of a shared [`Coordinator`].
///
/// Dropping the measure detaches it; the last detach destroys the coordinator.
pub struct Measure {
    coordinator: Arc<Coordinator>,
    table: Weak<Table>,
}

impl Measure {
    #[must_use]
    pub fn player(&self) -> &str {
        self.coordinator.name()
    }

    pub fn register(&self, capabilities: Capabilities) {
        self.coordinator.register(capabilities);
    }

    /// See [`Coordinator::poll`].
    pub fn poll(&self) -> bool {
        self.coordinator.poll()
    }

    #[must_use]
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.coordinator.snapshot()
    }

    pub fn execute(&self, command: Command) {
        self.coordinator.execute(command);
    }

    /// Detach from the coordinator, consuming the measure.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for Measure {
    fn drop(&mut self) {
        // Held across the count so a concurrent attach can't revive a dying coordinator
        let table = self.table.upgrade();
        let mut table = table.as_ref().map(|t| t.lock());

        let remaining = self.coordinator.detach();
        tracing::debug!(player = self.coordinator.name(), remaining, "Measure detached");
        if remaining > 0 {
            return;
        }

        if let Some(table) = table.as_mut() {
            let name = self.coordinator.name();
            if table
                .get(name)
                .is_some_and(|c| Arc::ptr_eq(c, &self.coordinator))
            {
                table.remove(name);
                tracing::info!(player = name, "Last measure detached");
            }
        }
    }
}
