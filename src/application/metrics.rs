//! Counters describing mute activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters of mute state transitions.
///
/// Counters are atomic and can be read at any time. Clones share the same
/// counters.
#[derive(Debug, Clone)]
pub struct StoreMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    /// Entries newly created by `suppress`
    suppressions: AtomicU64,
    /// Entries removed by `unsuppress`
    unsuppressions: AtomicU64,
    /// Entries removed by a sweep
    expirations: AtomicU64,
}

impl StoreMetrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                suppressions: AtomicU64::new(0),
                unsuppressions: AtomicU64::new(0),
                expirations: AtomicU64::new(0),
            }),
        }
    }

    pub(crate) fn record_suppression(&self) {
        self.inner.suppressions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unsuppression(&self) {
        self.inner.unsuppressions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expirations(&self, count: u64) {
        self.inner.expirations.fetch_add(count, Ordering::Relaxed);
    }

    /// Number of sources muted since creation or the last reset.
    pub fn suppressions(&self) -> u64 {
        self.inner.suppressions.load(Ordering::Relaxed)
    }

    /// Number of sources unmuted explicitly.
    pub fn unsuppressions(&self) -> u64 {
        self.inner.unsuppressions.load(Ordering::Relaxed)
    }

    /// Number of sources unmuted by expiry sweeps.
    pub fn expirations(&self) -> u64 {
        self.inner.expirations.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            suppressions: self.suppressions(),
            unsuppressions: self.unsuppressions(),
            expirations: self.expirations(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.suppressions.store(0, Ordering::Relaxed);
        self.inner.unsuppressions.store(0, Ordering::Relaxed);
        self.inner.expirations.store(0, Ordering::Relaxed);
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub suppressions: u64,
    pub unsuppressions: u64,
    pub expirations: u64,
}

impl MetricsSnapshot {
    /// Total number of unmute transitions, explicit or by expiry.
    pub fn total_unmuted(&self) -> u64 {
        self.unsuppressions.saturating_add(self.expirations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = StoreMetrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot() {
        let metrics = StoreMetrics::new();
        metrics.record_suppression();
        metrics.record_suppression();
        metrics.record_unsuppression();
        metrics.record_expirations(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.suppressions, 2);
        assert_eq!(snapshot.unsuppressions, 1);
        assert_eq!(snapshot.expirations, 3);
        assert_eq!(snapshot.total_unmuted(), 4);
    }

    #[test]
    fn test_reset() {
        let metrics = StoreMetrics::new();
        metrics.record_suppression();
        metrics.record_unsuppression();
        metrics.record_expirations(1);

        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_clone_shares_counters() {
        let metrics1 = StoreMetrics::new();
        metrics1.record_suppression();

        let metrics2 = metrics1.clone();
        metrics2.record_suppression();

        assert_eq!(metrics1.suppressions(), 2);
        assert_eq!(metrics2.suppressions(), 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = StoreMetrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_suppression();
                    m.record_expirations(1);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.suppressions(), 1000);
        assert_eq!(metrics.expirations(), 1000);
    }
}
