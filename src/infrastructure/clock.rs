//! Wall-clock adapter.
//!
//! Expiry times are absolute UTC instants and survive restarts, so the
//! production clock reads the system's real time rather than a monotonic
//! counter. A jump of the system clock therefore shifts when mutes lift.
//! Tests use `MockClock` from `crate::infrastructure::mocks`.

use crate::application::ports::Clock;
use chrono::{DateTime, Utc};

/// `Clock` backed by the operating system's UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
