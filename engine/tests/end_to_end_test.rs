//! End-to-end purchase and check-in scenarios.
//!
//! Drives the full reserve → charge → commit → scan pipeline through the
//! checkout flow with scripted gateways: approvals, declines, transient
//! failures with retry, and holds that lapse mid-payment.
//!
//! Run with: `cargo test --test end_to_end_test`

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use chrono::Duration;
use futures::future::BoxFuture;
use gatehouse_core::{
    BuyerId, Clock, CommitError, EventId, Money, ReserveError, ScanOutcome, SessionId, TerminalId,
};
use gatehouse_engine::{
    spawn_sweeper, CheckInLedger, CheckoutError, CheckoutFlow, InventoryLedger, PaymentError,
    PaymentGateway, PaymentTransaction, RetryPolicy,
};
use gatehouse_testing::{tier, ApprovingGateway, DecliningGateway, FlakyGateway, ManualClock};
use std::sync::Arc;
use std::time::Duration as StdDuration;

struct Harness {
    clock: Arc<ManualClock>,
    inventory: Arc<InventoryLedger>,
    checkin: Arc<CheckInLedger>,
    event_id: EventId,
}

fn harness(capacity: u32, max_per_order: u32, ttl: Duration) -> (Harness, gatehouse_core::TierId) {
    let clock = Arc::new(ManualClock::at_test_epoch());
    let inventory = Arc::new(InventoryLedger::new(clock.clone(), ttl, 500));
    let checkin = Arc::new(CheckInLedger::new(clock.clone()));
    let event_id = EventId::new();
    let tier_id = inventory
        .register_tier(tier(event_id, "VIP", capacity, max_per_order))
        .unwrap();
    (
        Harness {
            clock,
            inventory,
            checkin,
            event_id,
        },
        tier_id,
    )
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(3)
        .with_initial_delay(StdDuration::from_millis(1))
        .with_max_delay(StdDuration::from_millis(2))
}

/// Tier capacity 2, max-per-order 2: one buyer holds both units, a rival
/// is refused, the purchase completes, and each ticket admits exactly once.
#[tokio::test]
async fn sellout_purchase_and_single_use_scans() {
    let (h, tier_id) = harness(2, 2, Duration::minutes(10));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 2).unwrap();
    assert_eq!(h.inventory.availability(tier_id).unwrap().available(), 0);

    // A concurrent buyer is told the truth: nothing left
    assert!(matches!(
        h.inventory.reserve(tier_id, BuyerId::new(), 1),
        Err(ReserveError::OutOfStock {
            requested: 1,
            available: 0
        })
    ));

    let checkout = CheckoutFlow::new(
        h.inventory.clone(),
        h.checkin.clone(),
        Arc::new(ApprovingGateway::new()),
        fast_retry(),
    );
    let purchase = checkout.purchase(session.id, "Aline U.").await.unwrap();
    assert_eq!(purchase.tickets.len(), 2);
    // $50 × 2 + 5% fee
    assert_eq!(purchase.order.pricing.total.cents(), 10_500);

    let gate = TerminalId::new("gate-main");
    for ticket in &purchase.tickets {
        assert!(matches!(
            h.checkin.validate(&ticket.scan_code, &gate, h.event_id),
            ScanOutcome::Admit(_)
        ));
        assert!(matches!(
            h.checkin.validate(&ticket.scan_code, &gate, h.event_id),
            ScanOutcome::Duplicate { .. }
        ));
    }

    let report = h.checkin.event_report(h.event_id);
    assert_eq!(report.registered, 2);
    assert_eq!(report.admitted, 2);
}

/// Reserve with a 1-second TTL, wait past it: the sweep restores the full
/// capacity and a late commit fails expired.
#[tokio::test]
async fn expired_hold_is_swept_and_uncommittable() {
    let (h, tier_id) = harness(3, 3, Duration::seconds(1));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 1).unwrap();
    h.clock.advance(Duration::seconds(2));

    assert_eq!(h.inventory.sweep_expired(h.clock.now()), 1);
    assert_eq!(h.inventory.availability(tier_id).unwrap().available(), 3);

    assert!(matches!(
        h.inventory.commit(session.id, "Late L."),
        Err(CommitError::SessionExpired(_))
    ));
}

/// The background sweeper reclaims abandoned holds on its own.
#[tokio::test]
async fn background_sweeper_reclaims_capacity() {
    let (h, tier_id) = harness(3, 3, Duration::seconds(1));

    h.inventory.reserve(tier_id, BuyerId::new(), 2).unwrap();
    h.clock.advance(Duration::seconds(5));

    let sweeper = spawn_sweeper(
        h.inventory.clone(),
        h.clock.clone(),
        StdDuration::from_millis(20),
    );
    // Give the sweeper a couple of ticks
    tokio::time::sleep(StdDuration::from_millis(80)).await;
    sweeper.shutdown().await;

    assert_eq!(h.inventory.availability(tier_id).unwrap().available(), 3);
}

/// A decline releases the hold so the units go back on sale.
#[tokio::test]
async fn declined_payment_releases_the_hold() {
    let (h, tier_id) = harness(2, 2, Duration::minutes(10));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 2).unwrap();
    let checkout = CheckoutFlow::new(
        h.inventory.clone(),
        h.checkin.clone(),
        Arc::new(DecliningGateway::new("do not honor")),
        fast_retry(),
    );

    let error = checkout.purchase(session.id, "Aline U.").await.unwrap_err();
    assert!(matches!(
        error,
        CheckoutError::Payment(PaymentError::Declined { .. })
    ));

    let snapshot = h.inventory.availability(tier_id).unwrap();
    assert_eq!(snapshot.held, 0);
    assert_eq!(snapshot.available(), 2);
    // No tickets reached the gate
    assert_eq!(h.checkin.event_report(h.event_id).registered, 0);
}

/// Transient gateway failures are retried; the purchase still lands.
#[tokio::test]
async fn transient_gateway_failures_are_retried() {
    let (h, tier_id) = harness(2, 2, Duration::minutes(10));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 1).unwrap();
    let gateway = Arc::new(FlakyGateway::failing_first(2));
    let checkout = CheckoutFlow::new(
        h.inventory.clone(),
        h.checkin.clone(),
        gateway.clone(),
        fast_retry(),
    );

    let purchase = checkout.purchase(session.id, "Aline U.").await.unwrap();
    assert_eq!(purchase.tickets.len(), 1);
    assert_eq!(gateway.attempts(), 3, "two timeouts then a success");
}

/// Exhausting the retry budget surfaces the transient error and frees the
/// hold.
#[tokio::test]
async fn exhausted_retries_surface_the_gateway_error() {
    let (h, tier_id) = harness(2, 2, Duration::minutes(10));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 1).unwrap();
    let gateway = Arc::new(FlakyGateway::failing_first(10));
    let checkout = CheckoutFlow::new(
        h.inventory.clone(),
        h.checkin.clone(),
        gateway.clone(),
        fast_retry(),
    );

    let error = checkout.purchase(session.id, "Aline U.").await.unwrap_err();
    assert!(matches!(
        error,
        CheckoutError::Payment(PaymentError::Timeout)
    ));
    assert_eq!(gateway.attempts(), 3, "bounded by the retry policy");
    assert_eq!(h.inventory.availability(tier_id).unwrap().available(), 2);
}

/// Gateway that approves the charge but moves the clock past the TTL
/// first, so the hold lapses while the provider is deciding.
struct SlowProviderGateway {
    inner: ApprovingGateway,
    clock: Arc<ManualClock>,
    delay: Duration,
}

impl PaymentGateway for SlowProviderGateway {
    fn charge(
        &self,
        session_id: SessionId,
        buyer: BuyerId,
        amount: Money,
    ) -> BoxFuture<'_, Result<PaymentTransaction, PaymentError>> {
        self.clock.advance(self.delay);
        self.inner.charge(session_id, buyer, amount)
    }

    fn refund(
        &self,
        transaction_id: &str,
        amount: Money,
    ) -> BoxFuture<'_, Result<String, PaymentError>> {
        self.inner.refund(transaction_id, amount)
    }
}

/// A charge that settles after the hold expired is refunded and the buyer
/// is told to re-reserve.
#[tokio::test]
async fn hold_expiring_mid_payment_refunds_the_charge() {
    let (h, tier_id) = harness(2, 2, Duration::minutes(10));

    let session = h.inventory.reserve(tier_id, BuyerId::new(), 1).unwrap();
    let checkout = CheckoutFlow::new(
        h.inventory.clone(),
        h.checkin.clone(),
        Arc::new(SlowProviderGateway {
            inner: ApprovingGateway::new(),
            clock: h.clock.clone(),
            delay: Duration::minutes(11),
        }),
        fast_retry(),
    );

    let error = checkout.purchase(session.id, "Aline U.").await.unwrap_err();
    assert!(matches!(
        error,
        CheckoutError::Session(CommitError::SessionExpired(_))
    ));

    // The lapsed hold was released and nothing was sold
    let snapshot = h.inventory.availability(tier_id).unwrap();
    assert_eq!(snapshot.sold, 0);
    assert_eq!(snapshot.available(), 2);
    assert_eq!(h.checkin.event_report(h.event_id).registered, 0);
}
