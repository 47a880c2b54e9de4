//! Business metrics for the reservation and check-in ledgers.
//!
//! ## Exported metrics
//!
//! ### Counters
//! - `gatehouse_reservations_total{status}` - reservations by status
//!   (created, committed, cancelled, expired)
//! - `gatehouse_tickets_sold_total` - tickets minted
//! - `gatehouse_payments_total{status}` - payments by status
//! - `gatehouse_payment_revenue_cents_total` - revenue in cents
//! - `gatehouse_payment_refunds_cents_total` - refunds in cents
//! - `gatehouse_scans_total{outcome}` - gate scans by outcome
//!   (admit, duplicate, demoted, invalid, voided)
//! - `gatehouse_tickets_voided_total` - organizer voids
//! - `gatehouse_integrity_faults_total{operation}` - violated invariants;
//!   any non-zero value is an alerting condition
//!
//! ### Gauges
//! - `gatehouse_active_holds` - reservations pending payment
//!
//! ### Histograms
//! - `gatehouse_hold_duration_seconds` - time from hold to commit
//! - `gatehouse_payment_duration_seconds` - gateway round-trip time

use metrics::{describe_counter, describe_gauge, describe_histogram};

use crate::payment::PaymentError;

/// Registers metric descriptions. Call once at startup, before recording.
pub fn register_metrics() {
    describe_counter!(
        "gatehouse_reservations_total",
        "Total reservations by status (created, committed, cancelled, expired)"
    );
    describe_gauge!(
        "gatehouse_active_holds",
        "Current reservations pending payment"
    );
    describe_histogram!(
        "gatehouse_hold_duration_seconds",
        "Time from hold creation to commit"
    );

    describe_counter!(
        "gatehouse_payments_total",
        "Total payments by status (succeeded, failed, refunded)"
    );
    describe_counter!(
        "gatehouse_payment_revenue_cents_total",
        "Revenue from successful charges in cents"
    );
    describe_counter!(
        "gatehouse_payment_refunds_cents_total",
        "Refunds issued in cents"
    );
    describe_histogram!(
        "gatehouse_payment_duration_seconds",
        "Gateway round-trip time for a charge"
    );

    describe_counter!("gatehouse_tickets_sold_total", "Tickets minted");
    describe_counter!(
        "gatehouse_scans_total",
        "Gate scans by outcome (admit, duplicate, demoted, invalid, voided)"
    );
    describe_counter!("gatehouse_tickets_voided_total", "Tickets voided by organizers");
    describe_counter!(
        "gatehouse_integrity_faults_total",
        "Violated ledger invariants by operation; alert on any increase"
    );

    tracing::info!("gatehouse metrics registered");
}

/// Record a hold placed.
pub fn record_reservation_created(quantity: u32) {
    metrics::counter!("gatehouse_reservations_total", "status" => "created").increment(1);
    metrics::gauge!("gatehouse_active_holds").increment(1.0);
    tracing::debug!(quantity, "recorded reservation_created");
}

/// Record a hold committed into a sale.
pub fn record_reservation_committed(quantity: u32, held_secs: f64) {
    metrics::counter!("gatehouse_reservations_total", "status" => "committed").increment(1);
    metrics::gauge!("gatehouse_active_holds").decrement(1.0);
    metrics::histogram!("gatehouse_hold_duration_seconds").record(held_secs);
    metrics::counter!("gatehouse_tickets_sold_total").increment(u64::from(quantity));
}

/// Record a hold cancelled by the buyer.
pub fn record_reservation_cancelled() {
    metrics::counter!("gatehouse_reservations_total", "status" => "cancelled").increment(1);
    metrics::gauge!("gatehouse_active_holds").decrement(1.0);
}

/// Record holds released by expiry (lazy or swept).
pub fn record_reservations_expired(count: usize) {
    metrics::counter!("gatehouse_reservations_total", "status" => "expired")
        .increment(count as u64);
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!("gatehouse_active_holds").decrement(count as f64);
}

/// Record a settled charge.
pub fn record_payment_succeeded(amount_cents: u64, duration_secs: f64) {
    metrics::counter!("gatehouse_payments_total", "status" => "succeeded").increment(1);
    metrics::counter!("gatehouse_payment_revenue_cents_total").increment(amount_cents);
    metrics::histogram!("gatehouse_payment_duration_seconds").record(duration_secs);
}

/// Record a failed charge.
pub fn record_payment_failed(error: &PaymentError) {
    let reason = match error {
        PaymentError::Declined { .. } => "declined",
        PaymentError::InsufficientFunds => "insufficient_funds",
        PaymentError::Timeout => "timeout",
        PaymentError::Unavailable { .. } => "unavailable",
    };
    metrics::counter!("gatehouse_payments_total", "status" => "failed", "reason" => reason)
        .increment(1);
}

/// Record a refund.
pub fn record_payment_refunded(amount_cents: u64) {
    metrics::counter!("gatehouse_payments_total", "status" => "refunded").increment(1);
    metrics::counter!("gatehouse_payment_refunds_cents_total").increment(amount_cents);
}

/// Record a gate scan by outcome label.
pub fn record_scan(outcome: &'static str) {
    metrics::counter!("gatehouse_scans_total", "outcome" => outcome).increment(1);
}

/// Record an organizer void.
pub fn record_ticket_voided() {
    metrics::counter!("gatehouse_tickets_voided_total").increment(1);
}

/// Record a violated invariant. Any increase is an alerting condition.
pub fn record_integrity_fault(operation: &'static str) {
    metrics::counter!("gatehouse_integrity_faults_total", "operation" => operation).increment(1);
}
