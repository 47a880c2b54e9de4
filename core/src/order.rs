//! Orders created when a reservation commits.

use crate::ids::{BuyerId, EventId, OrderId, SessionId, TierId};
use crate::money::{Money, OrderPricing};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One purchased line: a quantity of a single tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// Tier purchased
    pub tier_id: TierId,
    /// Tier display name at time of purchase
    pub tier_name: String,
    /// Units purchased
    pub quantity: u32,
    /// Price per unit at time of purchase
    pub unit_price: Money,
}

/// A completed purchase, created exactly once per committed session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Session this order was committed from
    pub session_id: SessionId,
    /// Buyer who paid
    pub buyer: BuyerId,
    /// Event the tickets admit to
    pub event_id: EventId,
    /// Purchased line (one tier per session)
    pub line: OrderLine,
    /// Subtotal, service fee, and charged total
    pub pricing: OrderPricing,
    /// When the commit was applied
    pub created_at: DateTime<Utc>,
}
