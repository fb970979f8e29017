//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::entry::SnapshotEntry;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::path::PathBuf;
use thiserror::Error;

/// Port for obtaining the current wall-clock time.
///
/// Must be wall-clock time: expiries are persisted and sweeps align to minute
/// boundaries. Infrastructure provides `SystemClock` and `MockClock`.
pub trait Clock: Send + Sync + Debug {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Error raised when a persisted snapshot cannot be loaded.
///
/// A failed load never leaves partially loaded state behind.
#[derive(Debug, Error)]
pub enum ConfigReadError {
    /// The backing file exists but could not be read
    #[error("unable to read suppression configuration from \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The content is not a valid suppression configuration
    #[error("malformed suppression configuration in \"{}\": {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    /// Any other backend failure
    #[error("unable to read suppression configuration: {0}")]
    Backend(String),
}

/// Error raised when a snapshot cannot be persisted.
///
/// The in-memory store is unaffected; only durability is lost.
#[derive(Debug, Error)]
pub enum ConfigWriteError {
    /// Writing the backing file failed
    #[error("unable to save suppression configuration to \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The snapshot could not be encoded
    #[error("unable to encode suppression configuration: {0}")]
    Encode(String),
    /// Any other backend failure
    #[error("unable to save suppression configuration: {0}")]
    Backend(String),
}

/// Port for loading and saving store snapshots.
///
/// Infrastructure provides `JsonFileGateway`; tests use `MemoryGateway`.
pub trait PersistenceGateway: Send + Sync + Debug {
    /// Load the persisted snapshot.
    ///
    /// # Errors
    /// Returns `ConfigReadError` when the backing store is unreadable or
    /// its content is malformed.
    fn load(&self) -> Result<Vec<SnapshotEntry>, ConfigReadError>;

    /// Persist a snapshot, replacing whatever was stored before.
    ///
    /// # Errors
    /// Returns `ConfigWriteError` on I/O or encoding failure.
    fn save(&self, entries: &[SnapshotEntry]) -> Result<(), ConfigWriteError>;
}
