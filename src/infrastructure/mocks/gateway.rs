//! In-memory persistence gateway for testing.

use crate::application::ports::{ConfigReadError, ConfigWriteError, PersistenceGateway};
use crate::domain::entry::SnapshotEntry;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct GatewayState {
    stored: Vec<SnapshotEntry>,
    saved: Option<Vec<SnapshotEntry>>,
    load_failure: Option<String>,
    save_failure: Option<String>,
    loads: usize,
    saves: usize,
}

/// Persistence gateway keeping the snapshot in memory.
///
/// A successful save replaces what subsequent loads return. Failures can be
/// injected for either direction. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MemoryGateway {
    /// Create a gateway holding an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a gateway whose loads return `entries`.
    pub fn with_entries(entries: Vec<SnapshotEntry>) -> Self {
        let gateway = Self::new();
        gateway.lock().stored = entries;
        gateway
    }

    fn lock(&self) -> MutexGuard<'_, GatewayState> {
        self.state
            .lock()
            .expect("MemoryGateway mutex poisoned - a test thread panicked while holding the lock")
    }

    /// Make every following load fail with `reason`.
    pub fn fail_loads(&self, reason: impl Into<String>) {
        self.lock().load_failure = Some(reason.into());
    }

    /// Make every following save fail with `reason`.
    pub fn fail_saves(&self, reason: impl Into<String>) {
        self.lock().save_failure = Some(reason.into());
    }

    /// Snapshot passed to the last successful save.
    pub fn saved(&self) -> Option<Vec<SnapshotEntry>> {
        self.lock().saved.clone()
    }

    /// Number of load attempts.
    pub fn load_count(&self) -> usize {
        self.lock().loads
    }

    /// Number of save attempts.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }
}

impl PersistenceGateway for MemoryGateway {
    fn load(&self) -> Result<Vec<SnapshotEntry>, ConfigReadError> {
        let mut state = self.lock();
        state.loads += 1;

        match &state.load_failure {
            Some(reason) => Err(ConfigReadError::Backend(reason.clone())),
            None => Ok(state.stored.clone()),
        }
    }

    fn save(&self, entries: &[SnapshotEntry]) -> Result<(), ConfigWriteError> {
        let mut state = self.lock();
        state.saves += 1;

        if let Some(reason) = &state.save_failure {
            return Err(ConfigWriteError::Backend(reason.clone()));
        }
        state.stored = entries.to_vec();
        state.saved = Some(entries.to_vec());
        Ok(())
    }
}
