//! Minted tickets.

use crate::ids::{BuyerId, EventId, OrderId, ScanCode, TicketId, TierId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// One admission unit, minted exactly once when a reservation commits.
///
/// The ticket value itself is immutable; its admission state lives in the
/// check-in ledger, keyed by `scan_code`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket identifier
    pub id: TicketId,
    /// Tier this ticket was sold from
    pub tier_id: TierId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Order that minted this ticket
    pub order_id: OrderId,
    /// Buyer who owns the ticket
    pub holder: BuyerId,
    /// Display name shown to the gate operator on scan
    pub holder_name: String,
    /// Unique QR payload
    pub scan_code: ScanCode,
    /// Price paid for this unit
    pub unit_price: Money,
}

impl Ticket {
    /// Mints one ticket per purchased unit, each with its own scan code.
    #[must_use]
    pub fn mint_batch(
        quantity: u32,
        tier_id: TierId,
        event_id: EventId,
        order_id: OrderId,
        holder: BuyerId,
        holder_name: &str,
        unit_price: Money,
    ) -> Vec<Self> {
        (0..quantity)
            .map(|_| Self {
                id: TicketId::new(),
                tier_id,
                event_id,
                order_id,
                holder,
                holder_name: holder_name.to_owned(),
                scan_code: ScanCode::mint(),
                unit_price,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn mint_batch_issues_one_ticket_per_unit() {
        let tickets = Ticket::mint_batch(
            3,
            TierId::new(),
            EventId::new(),
            OrderId::new(),
            BuyerId::new(),
            "Aline U.",
            Money::from_dollars(25),
        );
        assert_eq!(tickets.len(), 3);

        let codes: HashSet<_> = tickets.iter().map(|t| t.scan_code.clone()).collect();
        assert_eq!(codes.len(), 3, "scan codes must be unique per ticket");

        let ids: HashSet<_> = tickets.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
    }
}
