//! Domain layer - pure values with no scheduling or I/O.
//!
//! - Source identity used as the suppression key
//! - Suppression entries and snapshot records
//! - Mute/unmute transition events

pub mod entry;
pub mod event;
pub mod key;
