//! Mute state transitions announced to observers.

use crate::domain::key::SuppressionKey;
use chrono::{DateTime, Utc};

/// A transition of a source's mute state within a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressionEvent {
    /// The source became muted in the channel until `expires_at`.
    Suppressed {
        key: SuppressionKey,
        channel: String,
        expires_at: DateTime<Utc>,
    },
    /// The source is no longer muted in the channel.
    Unsuppressed { key: SuppressionKey, channel: String },
}

impl SuppressionEvent {
    /// Source the event refers to.
    pub fn key(&self) -> &SuppressionKey {
        match self {
            SuppressionEvent::Suppressed { key, .. }
            | SuppressionEvent::Unsuppressed { key, .. } => key,
        }
    }

    /// Channel the event refers to.
    pub fn channel(&self) -> &str {
        match self {
            SuppressionEvent::Suppressed { channel, .. }
            | SuppressionEvent::Unsuppressed { channel, .. } => channel,
        }
    }

    /// Whether this is a `Suppressed` event.
    pub fn is_suppressed(&self) -> bool {
        matches!(self, SuppressionEvent::Suppressed { .. })
    }
}
