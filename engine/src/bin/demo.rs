//! End-to-end walkthrough of the Gatehouse ledgers.
//!
//! Registers two tiers, runs a purchase through reserve → charge → commit,
//! scans the minted tickets at an online terminal, then replays an offline
//! terminal's queue through reconciliation.
//!
//! Run with: `cargo run --bin demo`

use gatehouse_core::{
    BuyerId, Capacity, Clock, EventId, Money, SystemClock, TerminalId, TicketTier,
};
use gatehouse_engine::{
    metrics::register_metrics, spawn_sweeper, CheckInLedger, CheckoutFlow, Config, InventoryLedger,
    MockPaymentGateway, ScannerTerminal,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    config.init_tracing();
    register_metrics();

    let clock = Arc::new(SystemClock);
    let inventory = Arc::new(InventoryLedger::new(
        clock.clone(),
        config.reservation_ttl(),
        config.service_fee_bps,
    ));
    let checkin = Arc::new(CheckInLedger::new(clock.clone()));
    let sweeper = spawn_sweeper(inventory.clone(), clock.clone(), config.sweep_interval());

    // An event with two tiers
    let event_id = EventId::new();
    let vip = inventory.register_tier(TicketTier::new(
        event_id,
        "VIP",
        Capacity::new(50),
        Money::from_dollars(120),
        4,
    ))?;
    inventory.register_tier(TicketTier::new(
        event_id,
        "General Admission",
        Capacity::new(500),
        Money::from_dollars(35),
        8,
    ))?;

    // Buyer holds two VIP tickets and completes payment
    let buyer = BuyerId::new();
    let session = inventory.reserve(vip, buyer, 2)?;
    println!(
        "hold placed: session {} for {} units, expires {}",
        session.id, session.quantity, session.expires_at
    );

    let checkout = CheckoutFlow::new(
        inventory.clone(),
        checkin.clone(),
        MockPaymentGateway::shared(),
        config.retry_policy(),
    );
    let purchase = checkout.purchase(session.id, "Aline Uwase").await?;
    println!(
        "order {} charged {} for {} tickets",
        purchase.order.id,
        purchase.order.pricing.total,
        purchase.tickets.len()
    );

    // Online scan at the gate: first admits, second is a duplicate
    let gate = TerminalId::new("gate-main");
    for ticket in &purchase.tickets {
        let outcome = checkin.validate(&ticket.scan_code, &gate, event_id);
        println!("scan {} -> {outcome:?}", ticket.scan_code);
    }
    let duplicate = checkin.validate(&purchase.tickets[0].scan_code, &gate, event_id);
    println!("re-scan -> {duplicate:?}");

    // An offline terminal queues a scan it already admitted online above,
    // then reconciles: the earlier online scan keeps the admission.
    let mut offline_gate = ScannerTerminal::new(TerminalId::new("gate-side"), event_id);
    offline_gate.sync(&checkin);
    let provisional = offline_gate.scan_offline(&purchase.tickets[1].scan_code, clock.now());
    println!("offline scan -> {provisional:?}");
    for outcome in checkin.reconcile(offline_gate.drain()) {
        println!("reconciled {} -> {:?}", outcome.scan.code, outcome.outcome);
    }

    for report in inventory.tier_report(event_id) {
        println!(
            "{}: {}/{} sold, {} held, {} available",
            report.name, report.sold, report.capacity, report.held, report.available
        );
    }
    let gate_report = checkin.event_report(event_id);
    println!(
        "check-in: {}/{} admitted",
        gate_report.admitted, gate_report.registered
    );

    sweeper.shutdown().await;
    Ok(())
}
