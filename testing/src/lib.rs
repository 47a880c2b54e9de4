//! # Gatehouse Testing
//!
//! Deterministic test doubles for the Gatehouse ledgers.
//!
//! - [`ManualClock`]: a movable clock so TTL expiry and reconciliation
//!   ordering are exact, not sleep-based
//! - Scripted payment gateways that approve, decline, or fail a fixed
//!   number of times before succeeding; outcomes are always explicit,
//!   never random
//! - Fixture builders for tiers and ledgers
//!
//! ## Example
//!
//! ```ignore
//! let clock = Arc::new(ManualClock::at_test_epoch());
//! let ledger = InventoryLedger::new(clock.clone(), Duration::minutes(10), 500);
//! let session = ledger.reserve(tier_id, buyer, 2)?;
//!
//! clock.advance(Duration::minutes(11));
//! assert!(matches!(ledger.commit(session.id, "X"), Err(CommitError::SessionExpired(_))));
//! ```

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::future::BoxFuture;
use gatehouse_core::{BuyerId, Clock, Money, SessionId};
use gatehouse_engine::{PaymentError, PaymentGateway, PaymentTransaction};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Mock clocks for deterministic time.
pub mod clock {
    use super::{Clock, DateTime, Duration, Mutex, PoisonError, TimeZone, Utc};

    /// A clock that only moves when the test says so.
    ///
    /// Shared via `Arc`; `advance` affects every holder, so a ledger and
    /// the test observe the same instant.
    #[derive(Debug)]
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Creates a clock frozen at the given time
        #[must_use]
        pub const fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        /// Creates a clock at the conventional test epoch
        /// (2026-06-01 12:00:00 UTC)
        #[must_use]
        pub fn at_test_epoch() -> Self {
            Self::new(
                Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0)
                    .single()
                    .unwrap_or_default(),
            )
        }

        /// Moves the clock forward
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now += by;
        }

        /// Sets the clock to an absolute instant
        pub fn set(&self, to: DateTime<Utc>) {
            let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
            *now = to;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

/// Scripted payment gateways. Every outcome is explicit, no randomness.
pub mod gateways {
    use super::{
        AtomicU64, AtomicUsize, BoxFuture, BuyerId, Money, Ordering, PaymentError, PaymentGateway,
        PaymentTransaction, SessionId,
    };

    /// Approves every charge and refund.
    #[derive(Debug, Default)]
    pub struct ApprovingGateway {
        charges: AtomicU64,
    }

    impl ApprovingGateway {
        /// Creates an approving gateway
        #[must_use]
        pub const fn new() -> Self {
            Self {
                charges: AtomicU64::new(0),
            }
        }

        /// Number of charges taken so far
        #[must_use]
        pub fn charge_count(&self) -> u64 {
            self.charges.load(Ordering::SeqCst)
        }
    }

    impl PaymentGateway for ApprovingGateway {
        fn charge(
            &self,
            session_id: SessionId,
            _buyer: BuyerId,
            amount: Money,
        ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
            let seq = self.charges.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Ok(PaymentTransaction {
                    session_id,
                    transaction_id: format!("txn-{session_id}-{seq}"),
                    amount,
                })
            })
        }

        fn refund(
            &self,
            transaction_id: &str,
            _amount: Money,
        ) -> BoxFuture<'_, Result<String, PaymentError>> {
            let refund_id = format!("refund-{transaction_id}");
            Box::pin(async move { Ok(refund_id) })
        }
    }

    /// Declines every charge with a fixed reason.
    #[derive(Debug)]
    pub struct DecliningGateway {
        reason: String,
    }

    impl DecliningGateway {
        /// Creates a gateway that declines with `reason`
        #[must_use]
        pub fn new(reason: impl Into<String>) -> Self {
            Self {
                reason: reason.into(),
            }
        }
    }

    impl PaymentGateway for DecliningGateway {
        fn charge(
            &self,
            _session_id: SessionId,
            _buyer: BuyerId,
            _amount: Money,
        ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
            let reason = self.reason.clone();
            Box::pin(async move { Err(PaymentError::Declined { reason }) })
        }

        fn refund(
            &self,
            _transaction_id: &str,
            _amount: Money,
        ) -> BoxFuture<'_, Result<String, PaymentError>> {
            Box::pin(async move {
                Err(PaymentError::Unavailable {
                    message: "nothing to refund".to_owned(),
                })
            })
        }
    }

    /// Fails a fixed number of charges with a transient error, then
    /// approves, which exercises the retry path deterministically.
    #[derive(Debug)]
    pub struct FlakyGateway {
        failures_remaining: AtomicUsize,
        attempts: AtomicUsize,
    }

    impl FlakyGateway {
        /// Creates a gateway whose first `failures` charges time out
        #[must_use]
        pub const fn failing_first(failures: usize) -> Self {
            Self {
                failures_remaining: AtomicUsize::new(failures),
                attempts: AtomicUsize::new(0),
            }
        }

        /// Charges attempted so far (failures included)
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl PaymentGateway for FlakyGateway {
        fn charge(
            &self,
            session_id: SessionId,
            _buyer: BuyerId,
            amount: Money,
        ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let fail = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                    remaining.checked_sub(1)
                })
                .is_ok();
            Box::pin(async move {
                if fail {
                    Err(PaymentError::Timeout)
                } else {
                    Ok(PaymentTransaction {
                        session_id,
                        transaction_id: format!("txn-{session_id}"),
                        amount,
                    })
                }
            })
        }

        fn refund(
            &self,
            transaction_id: &str,
            _amount: Money,
        ) -> BoxFuture<'_, Result<String, PaymentError>> {
            let refund_id = format!("refund-{transaction_id}");
            Box::pin(async move { Ok(refund_id) })
        }
    }
}

/// Fixture builders for common test setups.
pub mod fixtures {
    use gatehouse_core::{Capacity, EventId, Money, TicketTier};

    /// A tier with the given capacity and per-order limit at $50.00/unit.
    #[must_use]
    pub fn tier(event_id: EventId, name: &str, capacity: u32, max_per_order: u32) -> TicketTier {
        TicketTier::new(
            event_id,
            name,
            Capacity::new(capacity),
            Money::from_dollars(50),
            max_per_order,
        )
    }
}

pub use clock::ManualClock;
pub use gateways::{ApprovingGateway, DecliningGateway, FlakyGateway};
pub use fixtures::tier;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::at_test_epoch();
        let before = clock.now();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now() - before, Duration::seconds(90));
    }
}
