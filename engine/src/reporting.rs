//! Read-only aggregation views for organizer and admin dashboards.
//!
//! These are reporting snapshots, not part of the arbitration contract:
//! nothing outside the ledgers mutates `sold`, `held`, or check-in state.

use gatehouse_core::{EventId, Money, TierId};
use serde::{Deserialize, Serialize};

/// Sales position of one tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSalesReport {
    /// Tier identifier
    pub tier_id: TierId,
    /// Tier display name
    pub name: String,
    /// Configured capacity
    pub capacity: u32,
    /// Units sold
    pub sold: u32,
    /// Units under active hold
    pub held: u32,
    /// Units still purchasable
    pub available: u32,
    /// Price per unit
    pub unit_price: Money,
}

impl TierSalesReport {
    /// Gross revenue for this tier (unit price × sold), saturating on
    /// overflow (a display figure, not an accounting one).
    #[must_use]
    pub const fn gross_revenue(&self) -> Money {
        match self.unit_price.checked_multiply(self.sold) {
            Some(revenue) => revenue,
            None => Money::from_cents(u64::MAX),
        }
    }
}

/// Check-in position of one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCheckInReport {
    /// Event identifier
    pub event_id: EventId,
    /// Tickets registered at the gate
    pub registered: usize,
    /// Attendees admitted
    pub admitted: usize,
    /// Tickets voided after issuance
    pub voided: usize,
    /// Tickets not yet scanned
    pub pending: usize,
}
