//! Suppression entries as stored in memory and exchanged with persistence.

use crate::domain::key::SuppressionKey;
use chrono::{DateTime, Utc};

/// A muted source within one channel partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionEntry {
    /// Muted source
    pub key: SuppressionKey,
    /// Instant at which the next sweep may lift the mute
    pub expires_at: DateTime<Utc>,
}

impl SuppressionEntry {
    /// Create a new entry.
    pub fn new(key: SuppressionKey, expires_at: DateTime<Utc>) -> Self {
        Self { key, expires_at }
    }

    /// Whether a sweep at `now` removes this entry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Flat `(channel, key, expires_at)` record of a store snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotEntry {
    /// Channel partition the entry belongs to
    pub channel: String,
    /// Muted source
    pub key: SuppressionKey,
    /// Expiry of the mute
    pub expires_at: DateTime<Utc>,
}

impl SnapshotEntry {
    /// Create a new snapshot record.
    pub fn new(channel: impl Into<String>, key: SuppressionKey, expires_at: DateTime<Utc>) -> Self {
        Self {
            channel: channel.into(),
            key,
            expires_at,
        }
    }
}
