//! Application layer - orchestration of domain logic.
//!
//! This layer owns the runtime behavior:
//! - Suppression store (per-channel mute state and its transitions)
//! - Expiry sweeper (minute-aligned periodic sweeps)
//! - Notification bus (observers of mute transitions)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod metrics;
pub mod notifications;
pub mod ports;
pub mod store;
pub mod sweeper;
