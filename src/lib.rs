//! # alert-mute
//!
//! Per-channel alert suppression for monitoring dashboards.
//!
//! A dashboard shows telemetry *sources* grouped by *channel* and alerts when
//! a source reaches a worrying level. Operators can mute a source within one
//! channel until a given time. This crate keeps track of those mutes, lifts
//! them once they expire, persists them across restarts, and tells observers
//! about every mute and unmute.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alert_mute::{
//!     ExpirySweeper, JsonFileGateway, SourceType, SuppressionKey, SuppressionStore,
//!     SweeperConfig, SystemClock,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let store = Arc::new(SuppressionStore::new(Arc::new(SystemClock::new())));
//!
//! // Observers learn about every transition
//! let _subscription = store.subscribe(|event| println!("{:?}", event));
//!
//! // Restore mutes saved by the previous run
//! let gateway = JsonFileGateway::new("mutes.json");
//! if let Err(e) = store.restore(&gateway) {
//!     eprintln!("starting without saved mutes: {}", e);
//! }
//!
//! // Lift expired mutes once a minute, on the minute
//! let sweeper = ExpirySweeper::new(Arc::clone(&store), SweeperConfig::default()).start();
//!
//! let key = SuppressionKey::new(SourceType::Double, "core0", "Temperature");
//! store.suppress_for(key.clone(), "cpu", Duration::from_secs(15 * 60));
//! assert!(store.is_suppressed(&key, "cpu"));
//!
//! // On shutdown
//! sweeper.shutdown().await.expect("shutdown failed");
//! store.persist(&gateway).ok();
//! # }
//! ```
//!
//! ## Semantics
//!
//! - Mutes are scoped per channel: the same source can be muted in one
//!   channel and not in another.
//! - Muting an already muted source only changes its expiry and emits no
//!   new event.
//! - Expiry is lazy. A mute whose time has passed still counts until the next
//!   sweep, so state only changes on sweep ticks or explicit calls.
//! - The sweeper's first tick is aligned to the next wall-clock minute, then
//!   it ticks once per period (one minute by default).
//! - On restore, mutes that expired while the application was down are
//!   swept (emitting `Unsuppressed`) before the survivors are replayed as
//!   `Suppressed`.
//!
//! ## Features
//!
//! - `async` (default): tokio-driven `ExpirySweeper::start`
//! - `test-helpers`: `MockClock`, `MemoryGateway` and `MockCaptureLayer`
//!   under `infrastructure::mocks`

// Domain layer - pure values
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    entry::{SnapshotEntry, SuppressionEntry},
    event::SuppressionEvent,
    key::{SourceType, SuppressionKey, UnknownSourceType},
};

pub use application::{
    metrics::{MetricsSnapshot, StoreMetrics},
    notifications::{EventHandler, NotificationBus, Subscription},
    ports::{Clock, ConfigReadError, ConfigWriteError, PersistenceGateway},
    store::SuppressionStore,
    sweeper::{
        until_next_minute, ExpirySweeper, ShutdownError, SweeperConfig, SweeperConfigError,
        SweeperState,
    },
};

#[cfg(feature = "async")]
pub use application::sweeper::SweeperHandle;

pub use infrastructure::{clock::SystemClock, config_file::JsonFileGateway};
