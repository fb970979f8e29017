//! Periodic removal of expired suppressions.
//!
//! The sweeper calls `SuppressionStore::sweep` once per period. The first call
//! is aligned to the next wall-clock minute boundary (started at :37, the
//! first sweep runs 23 seconds later), so mutes lift at predictable times
//! rather than relative to process start.
//!
//! Lifecycle: `Created` until the alignment delay elapses, then `Running`
//! until stopped. `Stopped` is final.

use crate::application::store::SuppressionStore;
use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

#[cfg(feature = "async")]
use std::sync::atomic::{AtomicU8, Ordering};
#[cfg(feature = "async")]
use tokio::sync::Notify;
#[cfg(feature = "async")]
use tokio::time::{interval, sleep, MissedTickBehavior};

const MINUTE: Duration = Duration::from_secs(60);

/// Error returned when sweeper configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperConfigError {
    /// Sweep period must be greater than zero
    #[error("sweep period must be greater than 0")]
    ZeroPeriod,
}

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between two sweeps
    pub period: Duration,
    /// Whether the first sweep waits for the next minute boundary
    pub align_to_minute: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            period: MINUTE,
            align_to_minute: true,
        }
    }
}

impl SweeperConfig {
    /// Create a config with the given period, aligned to minute boundaries.
    ///
    /// # Errors
    /// Returns `SweeperConfigError::ZeroPeriod` if `period` is zero.
    pub fn new(period: Duration) -> Result<Self, SweeperConfigError> {
        if period.is_zero() {
            return Err(SweeperConfigError::ZeroPeriod);
        }
        Ok(Self {
            period,
            align_to_minute: true,
        })
    }

    /// Enable or disable minute alignment of the first sweep.
    pub fn with_alignment(mut self, align_to_minute: bool) -> Self {
        self.align_to_minute = align_to_minute;
        self
    }
}

/// Sweeper lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Waiting for the first, aligned tick
    Created = 0,
    /// Sweeping once per period
    Running = 1,
    /// No further ticks will fire
    Stopped = 2,
}

impl From<u8> for SweeperState {
    fn from(value: u8) -> Self {
        match value {
            0 => SweeperState::Created,
            1 => SweeperState::Running,
            _ => SweeperState::Stopped,
        }
    }
}

/// Time from `now` to the next minute boundary, strictly after `now`.
///
/// Exactly on a boundary this is a full minute.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    // nanosecond() exceeds 1e9 during a leap second.
    let nanos = now.nanosecond() % 1_000_000_000;
    MINUTE - Duration::new(u64::from(now.second()), nanos)
}

/// Drives periodic sweeps of a `SuppressionStore`.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    store: Arc<SuppressionStore>,
    config: SweeperConfig,
}

impl ExpirySweeper {
    /// Create a sweeper for `store`.
    pub fn new(store: Arc<SuppressionStore>, config: SweeperConfig) -> Self {
        Self { store, config }
    }

    /// Delay before the first sweep when started at `now`.
    pub fn initial_delay(&self, now: DateTime<Utc>) -> Duration {
        if self.config.align_to_minute {
            until_next_minute(now)
        } else {
            self.config.period
        }
    }

    /// Sweep once at the store clock's current time.
    ///
    /// Returns the number of entries removed.
    pub fn tick(&self) -> usize {
        let now = self.store.clock().now();
        let removed = self.store.sweep(now);
        trace!(now = %now, removed, "expiry sweep");
        removed
    }

    /// Get the sweeper configuration.
    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Get the swept store.
    pub fn store(&self) -> &Arc<SuppressionStore> {
        &self.store
    }

    /// Start sweeping on the current tokio runtime.
    ///
    /// Dropping the returned handle does not stop the task; call `stop` or
    /// `shutdown`.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweeperHandle {
        let state = Arc::new(AtomicU8::new(SweeperState::Created as u8));
        let stop_signal = Arc::new(Notify::new());
        let delay = self.initial_delay(self.store.clock().now());

        let task_state = Arc::clone(&state);
        let task_signal = Arc::clone(&stop_signal);

        let join_handle = tokio::spawn(async move {
            tokio::select! {
                _ = sleep(delay) => {}
                _ = task_signal.notified() => return,
            }

            let started = task_state.compare_exchange(
                SweeperState::Created as u8,
                SweeperState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            if started.is_err() {
                return;
            }

            // The first interval tick completes immediately: that is the aligned sweep.
            let mut ticker = interval(self.config.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_signal.notified() => break,
                    _ = ticker.tick() => {
                        let state = SweeperState::from(task_state.load(Ordering::Acquire));
                        if state == SweeperState::Stopped {
                            break;
                        }
                        self.tick();
                    }
                }
            }
        });

        SweeperHandle {
            state,
            stop_signal,
            join_handle: Some(join_handle),
        }
    }
}

/// Error returned when waiting for the sweeper task fails.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The sweeper task panicked
    #[error("sweeper task panicked")]
    TaskPanicked,
    /// The sweeper task was cancelled before it finished
    #[error("sweeper task was cancelled")]
    TaskCancelled,
}

/// Handle to a running sweeper task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    state: Arc<AtomicU8>,
    stop_signal: Arc<Notify>,
    join_handle: Option<tokio::task::JoinHandle<()>>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> SweeperState {
        SweeperState::from(self.state.load(Ordering::Acquire))
    }

    /// Prevent any further tick. Calling it again has no effect.
    pub fn stop(&self) {
        let previous = self.state.swap(SweeperState::Stopped as u8, Ordering::AcqRel);
        if SweeperState::from(previous) != SweeperState::Stopped {
            // notify_one stores a permit if the task is busy sweeping.
            self.stop_signal.notify_one();
        }
    }

    /// Whether the background task has exited.
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Stop the sweeper and wait for its task to exit.
    ///
    /// # Errors
    /// Returns `ShutdownError` if the task panicked or was cancelled.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        self.stop();

        let Some(handle) = self.join_handle.take() else {
            return Ok(());
        };
        handle.await.map_err(|e| {
            if e.is_panic() {
                ShutdownError::TaskPanicked
            } else {
                ShutdownError::TaskCancelled
            }
        })
    }
}
