//! Registry of muted sources, partitioned by channel.
//!
//! The store maps a channel name to the set of sources muted in that channel,
//! each with the time its mute expires. Expiry is lazy: an entry whose time
//! has passed is still reported as muted until the next `sweep`, so mute state
//! only changes at sweep ticks or through explicit calls.
//!
//! Every transition is announced on the store's `NotificationBus`:
//!
//! - `suppress` of a source not yet muted in the channel emits `Suppressed`
//! - `suppress` of an already muted source only moves its expiry, silently
//! - `unsuppress` and `sweep` emit one `Unsuppressed` per removed entry
//! - `load_snapshot` emits nothing; `replay_as_notifications` announces the
//!   whole current state
//!
//! ## Concurrency
//!
//! All partitions live behind a single mutex. Events are numbered and queued
//! while that mutex is held and delivered after it is released, so handlers
//! may query the store. One thread at a time hands queued events to the bus;
//! a mutating call returns only once its own events have been delivered.
//! Delivery order always matches mutation order. A handler that mutates the
//! store itself sees its events delivered after it returns.

use crate::application::metrics::StoreMetrics;
use crate::application::notifications::{NotificationBus, Subscription};
use crate::application::ports::{Clock, ConfigReadError, ConfigWriteError, PersistenceGateway};
use crate::domain::entry::{SnapshotEntry, SuppressionEntry};
use crate::domain::event::SuppressionEvent;
use crate::domain::key::SuppressionKey;
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{debug, error, info};

type Partition = AHashMap<SuppressionKey, DateTime<Utc>>;
type Partitions = AHashMap<String, Partition>;

/// Events waiting to be handed to the bus, numbered in mutation order.
#[derive(Default)]
struct EventQueue {
    pending: VecDeque<(u64, SuppressionEvent)>,
    /// Sequence number of the last queued event
    queued: u64,
    /// Sequence number of the last delivered event
    delivered: u64,
    /// Thread currently handing events to the bus
    drainer: Option<ThreadId>,
}

impl EventQueue {
    /// Queue `events` and return the sequence number of the last one.
    fn push(&mut self, events: Vec<SuppressionEvent>) -> u64 {
        for event in events {
            self.queued += 1;
            self.pending.push_back((self.queued, event));
        }
        self.queued
    }
}

/// Releases the drainer role even if delivery unwinds.
struct DrainGuard<'a> {
    store: &'a SuppressionStore,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.store.lock_queue().drainer = None;
        self.store.delivery.notify_all();
    }
}

/// Per-channel registry of muted sources.
///
/// Construct one per application and share it via `Arc`.
pub struct SuppressionStore {
    partitions: Mutex<Partitions>,
    queue: Mutex<EventQueue>,
    delivery: Condvar,
    bus: NotificationBus,
    clock: Arc<dyn Clock>,
    metrics: StoreMetrics,
}

impl SuppressionStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_bus(clock, NotificationBus::new())
    }

    /// Create an empty store publishing on an existing bus.
    pub fn with_bus(clock: Arc<dyn Clock>, bus: NotificationBus) -> Self {
        Self {
            partitions: Mutex::new(Partitions::default()),
            queue: Mutex::new(EventQueue::default()),
            delivery: Condvar::new(),
            bus,
            clock,
            metrics: StoreMetrics::new(),
        }
    }

    /// Register a handler for mute transitions.
    #[must_use = "dropping the subscription immediately unregisters the handler"]
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SuppressionEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    /// The bus events are published on.
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// The clock used for `suppress_for`, `restore` and sweeps.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Transition counters.
    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Whether `key` is muted in `channel`.
    ///
    /// Entries past their expiry still count until the next sweep.
    pub fn is_suppressed(&self, key: &SuppressionKey, channel: &str) -> bool {
        self.lock_partitions()
            .get(channel)
            .is_some_and(|partition| partition.contains_key(key))
    }

    /// Expiry of `key`'s mute in `channel`, if muted.
    pub fn expires_at(&self, key: &SuppressionKey, channel: &str) -> Option<DateTime<Utc>> {
        self.lock_partitions()
            .get(channel)
            .and_then(|partition| partition.get(key).copied())
    }

    /// Mute `key` in `channel` until `until`.
    ///
    /// A new entry emits `Suppressed`. For an already muted source only the
    /// expiry is replaced and nothing is emitted. A past `until` is accepted;
    /// the entry is removed by the next sweep.
    pub fn suppress(&self, key: SuppressionKey, channel: &str, until: DateTime<Utc>) {
        self.mutate(|partitions, events| {
            let partition = partitions.entry(channel.to_string()).or_default();

            if let Some(expires_at) = partition.get_mut(&key) {
                debug!(channel, source = %key, until = %until, "suppression expiry updated");
                *expires_at = until;
                return;
            }

            debug!(channel, source = %key, until = %until, "source suppressed");
            partition.insert(key.clone(), until);
            self.metrics.record_suppression();
            events.push(SuppressionEvent::Suppressed {
                key,
                channel: channel.to_string(),
                expires_at: until,
            });
        });
    }

    /// Mute `key` in `channel` for `duration` from now.
    ///
    /// Returns the expiry that was set.
    pub fn suppress_for(
        &self,
        key: SuppressionKey,
        channel: &str,
        duration: Duration,
    ) -> DateTime<Utc> {
        let now = self.clock.now();
        let until = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.suppress(key, channel, until);
        until
    }

    /// Lift the mute of `key` in `channel`. No-op if not muted.
    pub fn unsuppress(&self, key: &SuppressionKey, channel: &str) {
        self.mutate(|partitions, events| {
            let Some(partition) = partitions.get_mut(channel) else {
                return;
            };
            if partition.remove(key).is_none() {
                return;
            }
            if partition.is_empty() {
                partitions.remove(channel);
            }

            debug!(channel, source = %key, "source unsuppressed");
            self.metrics.record_unsuppression();
            events.push(SuppressionEvent::Unsuppressed {
                key: key.clone(),
                channel: channel.to_string(),
            });
        });
    }

    /// Remove every entry with `expires_at <= now`, in every channel.
    ///
    /// Emits one `Unsuppressed` per removed entry and returns how many were
    /// removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = self.mutate(|partitions, events| {
            let mut removed = 0;

            partitions.retain(|channel, partition| {
                let mut expired: Vec<SuppressionKey> = partition
                    .iter()
                    .filter(|(_, expires_at)| **expires_at <= now)
                    .map(|(key, _)| key.clone())
                    .collect();
                expired.sort();

                for key in expired {
                    partition.remove(&key);
                    removed += 1;
                    debug!(channel = channel.as_str(), source = %key, "suppression expired");
                    events.push(SuppressionEvent::Unsuppressed {
                        key,
                        channel: channel.clone(),
                    });
                }

                !partition.is_empty()
            });

            removed
        });

        if removed > 0 {
            self.metrics.record_expirations(removed as u64);
            debug!(count = removed, now = %now, "expired suppressions removed");
        }
        removed
    }

    /// Replace the whole content with `entries`, without emitting events.
    ///
    /// Later duplicates of the same `(channel, key)` win.
    pub fn load_snapshot(&self, entries: Vec<SnapshotEntry>) {
        let mut loaded = Partitions::default();
        for entry in entries {
            loaded
                .entry(entry.channel)
                .or_default()
                .insert(entry.key, entry.expires_at);
        }

        *self.lock_partitions() = loaded;
    }

    /// Full content, sorted by channel then key.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        let partitions = self.lock_partitions();
        let mut entries: Vec<SnapshotEntry> = partitions
            .iter()
            .flat_map(|(channel, partition)| {
                partition.iter().map(move |(key, expires_at)| {
                    SnapshotEntry::new(channel.clone(), key.clone(), *expires_at)
                })
            })
            .collect();
        drop(partitions);

        entries.sort();
        entries
    }

    /// Emit `Suppressed` for every stored entry.
    pub fn replay_as_notifications(&self) {
        self.mutate(|partitions, events| {
            let mut replay: Vec<SuppressionEvent> = partitions
                .iter()
                .flat_map(|(channel, partition)| {
                    partition.iter().map(move |(key, expires_at)| SuppressionEvent::Suppressed {
                        key: key.clone(),
                        channel: channel.clone(),
                        expires_at: *expires_at,
                    })
                })
                .collect();
            replay.sort_by(|a, b| (a.channel(), a.key()).cmp(&(b.channel(), b.key())));
            events.extend(replay);
        });
    }

    /// Entries muted in `channel`, sorted by key.
    pub fn suppressed_in(&self, channel: &str) -> Vec<SuppressionEntry> {
        let mut entries: Vec<SuppressionEntry> = self
            .lock_partitions()
            .get(channel)
            .map(|partition| {
                partition
                    .iter()
                    .map(|(key, expires_at)| SuppressionEntry::new(key.clone(), *expires_at))
                    .collect()
            })
            .unwrap_or_default();

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Channels with at least one muted source, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.lock_partitions().keys().cloned().collect();
        channels.sort();
        channels
    }

    /// Total number of entries across all channels.
    pub fn len(&self) -> usize {
        self.lock_partitions().values().map(|p| p.len()).sum()
    }

    /// Whether no source is muted in any channel.
    pub fn is_empty(&self) -> bool {
        self.lock_partitions().values().all(|p| p.is_empty())
    }

    /// Startup sequence: load the persisted snapshot, sweep what expired
    /// while the application was down, then announce what remains.
    ///
    /// # Errors
    /// Returns the gateway's `ConfigReadError`; the store is left untouched.
    pub fn restore(&self, gateway: &dyn PersistenceGateway) -> Result<(), ConfigReadError> {
        let entries = match gateway.load() {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, gateway = ?gateway, "unable to read suppression configuration");
                return Err(e);
            }
        };

        let count = entries.len();
        self.load_snapshot(entries);
        info!(entries = count, gateway = ?gateway, "suppression configuration loaded");

        self.sweep(self.clock.now());
        self.replay_as_notifications();
        Ok(())
    }

    /// Save the current snapshot through `gateway`.
    ///
    /// # Errors
    /// Returns the gateway's `ConfigWriteError`; in-memory state is unchanged.
    pub fn persist(&self, gateway: &dyn PersistenceGateway) -> Result<(), ConfigWriteError> {
        let entries = self.snapshot();

        match gateway.save(&entries) {
            Ok(()) => {
                info!(
                    entries = entries.len(),
                    gateway = ?gateway,
                    "suppression configuration saved"
                );
                Ok(())
            }
            Err(e) => {
                error!(error = %e, gateway = ?gateway, "unable to save suppression configuration");
                Err(e)
            }
        }
    }

    fn lock_partitions(&self) -> MutexGuard<'_, Partitions> {
        self.partitions.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn lock_queue(&self) -> MutexGuard<'_, EventQueue> {
        self.queue.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Run `f` under the partition lock, enqueue its events before releasing
    /// it, then deliver them.
    fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Partitions, &mut Vec<SuppressionEvent>) -> R,
    {
        let mut events = Vec::new();
        let (result, last) = {
            let mut partitions = self.lock_partitions();
            let result = f(&mut partitions, &mut events);
            let last = (!events.is_empty()).then(|| self.lock_queue().push(events));
            (result, last)
        };

        if let Some(last) = last {
            self.deliver_through(last);
        }
        result
    }

    /// Block until every event up to `seq` has been delivered, draining the
    /// queue on this thread if nobody else is.
    fn deliver_through(&self, seq: u64) {
        let current = thread::current().id();
        let mut queue = self.lock_queue();
        loop {
            if queue.delivered >= seq {
                return;
            }
            match queue.drainer {
                // Called from a handler: the enclosing drain delivers it next.
                Some(drainer) if drainer == current => return,
                Some(_) => {
                    queue = self
                        .delivery
                        .wait(queue)
                        .unwrap_or_else(|err| err.into_inner());
                }
                None => break,
            }
        }
        queue.drainer = Some(current);
        drop(queue);

        let _guard = DrainGuard { store: self };
        loop {
            let next = self.lock_queue().pending.pop_front();
            let Some((number, event)) = next else {
                return;
            };
            self.bus.publish(&event);
            self.lock_queue().delivered = number;
            self.delivery.notify_all();
        }
    }
}

impl fmt::Debug for SuppressionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuppressionStore")
            .field("entries", &self.len())
            .field("bus", &self.bus)
            .field("clock", &self.clock)
            .finish()
    }
}
