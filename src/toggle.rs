use crate::store::{decode, KeyValueStore, PendingWrites};
use log::{error, info};
use std::sync::Arc;

/// Progress of the one-time load from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    AwaitingInitialLoad,
    Ready,
}

/// A boolean mirrored into the store under a fixed key.
///
/// The in-memory value is authoritative for the session; every change is
/// written back without waiting for the write to finish.
pub struct PersistedToggle {
    key: &'static str,
    value: bool,
    state: LoadState,
    writes: PendingWrites,
}

impl PersistedToggle {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str, default: bool) -> Self {
        Self {
            key,
            value: default,
            state: LoadState::AwaitingInitialLoad,
            writes: PendingWrites::new(store, key),
        }
    }

    /// Loads the stored value, replacing whatever the toggle holds now.
    ///
    /// Toggles made before this call are overwritten by a stored value.
    pub async fn init(&mut self) {
        match self.writes.store().get(self.key).await {
            Ok(Some(raw)) => match decode::<bool>(&raw) {
                Ok(value) => {
                    info!("Loaded '{}' = {} from storage", self.key, value);
                    self.value = value;
                }
                Err(e) => error!("Failed to load value from storage for '{}': {}", self.key, e),
            },
            Ok(None) => info!("No stored value for '{}', using {}", self.key, self.value),
            Err(e) => error!("Failed to load value from storage for '{}': {}", self.key, e),
        }

        self.state = LoadState::Ready;
        self.persist();
    }

    pub fn value(&self) -> bool {
        self.value
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn toggle(&mut self) {
        self.value = !self.value;
        self.persist();
    }

    pub async fn flush(&mut self) {
        self.writes.flush().await;
    }

    fn persist(&mut self) {
        self.writes.schedule(&self.value);
    }
}
