//! Injected dependencies for time.
//!
//! All timestamp reads go through the [`Clock`] trait so the reservation TTL
//! and reconciliation logic are deterministic under test. Production code
//! uses [`SystemClock`]; tests use the manual clock in `gatehouse-testing`.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
