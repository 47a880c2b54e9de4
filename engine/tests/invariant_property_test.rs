//! Property-based invariant tests.
//!
//! For every randomized sequence of reserve/commit/cancel/advance/sweep
//! operations, the tier snapshot must satisfy `sold + held ≤ capacity` and
//! availability must never go negative (which the u32 representation makes
//! an underflow, caught by `is_consistent` plus the arithmetic itself).
//!
//! Run with: `cargo test --test invariant_property_test`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use chrono::Duration;
use gatehouse_core::{BuyerId, Clock, EventId, SessionId};
use gatehouse_engine::InventoryLedger;
use gatehouse_testing::{tier, ManualClock};
use proptest::prelude::*;
use std::sync::Arc;

const CAPACITY: u32 = 10;
const MAX_PER_ORDER: u32 = 4;
const TTL_SECS: i64 = 120;

#[derive(Clone, Debug)]
enum Op {
    /// Attempt a hold (may legitimately fail out-of-stock)
    Reserve { quantity: u32 },
    /// Commit the n-th session created so far (wrapping)
    Commit { pick: usize },
    /// Cancel the n-th session created so far (wrapping)
    Cancel { pick: usize },
    /// Move the clock forward
    Advance { secs: u32 },
    /// Run an expiry sweep
    Sweep,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1..=MAX_PER_ORDER).prop_map(|quantity| Op::Reserve { quantity }),
        (0usize..16).prop_map(|pick| Op::Commit { pick }),
        (0usize..16).prop_map(|pick| Op::Cancel { pick }),
        (0u32..300).prop_map(|secs| Op::Advance { secs }),
        Just(Op::Sweep),
    ]
}

fn pick_session(sessions: &[SessionId], pick: usize) -> Option<SessionId> {
    if sessions.is_empty() {
        None
    } else {
        Some(sessions[pick % sessions.len()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn capacity_invariant_holds_under_random_interleavings(
        ops in proptest::collection::vec(op_strategy(), 1..80)
    ) {
        let clock = Arc::new(ManualClock::at_test_epoch());
        let ledger = InventoryLedger::new(
            clock.clone(),
            Duration::seconds(TTL_SECS),
            500,
        );
        let tier_id = ledger
            .register_tier(tier(EventId::new(), "General", CAPACITY, MAX_PER_ORDER))
            .unwrap();

        let mut sessions: Vec<SessionId> = Vec::new();
        let mut sold_floor = 0u32;

        for op in ops {
            match op {
                Op::Reserve { quantity } => {
                    if let Ok(session) = ledger.reserve(tier_id, BuyerId::new(), quantity) {
                        sessions.push(session.id);
                    }
                }
                Op::Commit { pick } => {
                    if let Some(id) = pick_session(&sessions, pick) {
                        if let Ok(committed) = ledger.commit(id, "Prop T.") {
                            sold_floor = sold_floor.max(committed.order.line.quantity);
                        }
                    }
                }
                Op::Cancel { pick } => {
                    if let Some(id) = pick_session(&sessions, pick) {
                        let _ = ledger.cancel(id);
                    }
                }
                Op::Advance { secs } => {
                    clock.advance(Duration::seconds(i64::from(secs)));
                }
                Op::Sweep => {
                    let _ = ledger.sweep_expired(clock.now());
                }
            }

            let snapshot = ledger.availability(tier_id).unwrap();
            prop_assert!(
                snapshot.is_consistent(),
                "sold {} + held {} exceeds capacity {}",
                snapshot.sold,
                snapshot.held,
                snapshot.capacity
            );
            prop_assert!(snapshot.sold + snapshot.held + snapshot.available() == snapshot.capacity);
            prop_assert!(snapshot.sold >= sold_floor,
                "committed sales must never be un-sold");
        }
    }

    /// Committing the same session repeatedly anywhere in a random
    /// sequence never double-counts `sold`.
    #[test]
    fn repeated_commits_are_idempotent(
        extra_commits in 1usize..6,
        advance_between in 0u32..200,
    ) {
        let clock = Arc::new(ManualClock::at_test_epoch());
        let ledger = InventoryLedger::new(clock.clone(), Duration::seconds(TTL_SECS), 500);
        let tier_id = ledger
            .register_tier(tier(EventId::new(), "General", CAPACITY, MAX_PER_ORDER))
            .unwrap();

        let session = ledger.reserve(tier_id, BuyerId::new(), 2).unwrap();
        let first = ledger.commit(session.id, "Prop T.").unwrap();

        for _ in 0..extra_commits {
            clock.advance(Duration::seconds(i64::from(advance_between)));
            let replay = ledger.commit(session.id, "Prop T.").unwrap();
            prop_assert_eq!(&replay.tickets, &first.tickets);
            prop_assert_eq!(replay.order.id, first.order.id);
        }

        let snapshot = ledger.availability(tier_id).unwrap();
        prop_assert_eq!(snapshot.sold, 2);
        prop_assert!(snapshot.is_consistent());
    }
}
