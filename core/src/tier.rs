//! Ticket tiers and per-tier inventory snapshots.
//!
//! The snapshot is the arbitration record for one tier: committed sales,
//! active holds, and the derived availability. The critical rule, the one
//! that prevents overselling under concurrent reservation attempts, is that
//! availability subtracts BOTH `sold` and `held`:
//!
//! ```text
//! available = capacity - sold - held
//! ```
//!
//! All transitions are checked. A transition that would break
//! `sold + held ≤ capacity` or drive a counter negative returns an
//! [`IntegrityFault`] instead of clamping.

use crate::error::IntegrityFault;
use crate::ids::{EventId, TierId};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Total capacity of a tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capacity(u32);

impl Capacity {
    /// Creates a new `Capacity`
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the capacity value
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named class of ticket (e.g., VIP, General) with its own price,
/// capacity, and per-order limit. Belongs to exactly one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTier {
    /// Tier identifier
    pub id: TierId,
    /// Owning event
    pub event_id: EventId,
    /// Display name (e.g., "VIP", "General Admission")
    pub name: String,
    /// Total units that can ever be sold
    pub capacity: Capacity,
    /// Price per unit
    pub unit_price: Money,
    /// Maximum units a single order may claim
    pub max_per_order: u32,
}

impl TicketTier {
    /// Creates a tier with a fresh id
    #[must_use]
    pub fn new(
        event_id: EventId,
        name: impl Into<String>,
        capacity: Capacity,
        unit_price: Money,
        max_per_order: u32,
    ) -> Self {
        Self {
            id: TierId::new(),
            event_id,
            name: name.into(),
            capacity,
            unit_price,
            max_per_order,
        }
    }
}

/// Mutable arbitration state for one tier.
///
/// Exclusively owned by the inventory ledger; nothing else may mutate
/// `sold` or `held`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Configured capacity
    pub capacity: u32,
    /// Units permanently sold (committed reservations)
    pub sold: u32,
    /// Units claimed by active reservations pending payment
    pub held: u32,
}

impl InventorySnapshot {
    /// A fresh snapshot with nothing sold or held
    #[must_use]
    pub const fn new(capacity: Capacity) -> Self {
        Self {
            capacity: capacity.value(),
            sold: 0,
            held: 0,
        }
    }

    /// Units still available: `capacity - sold - held`
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.capacity - self.sold - self.held
    }

    /// Whether a request for `quantity` units can be satisfied right now
    #[must_use]
    pub const fn can_hold(&self, quantity: u32) -> bool {
        self.available() >= quantity
    }

    /// Claims `quantity` units into `held`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityFault::CapacityExceeded`] if the hold would push
    /// `sold + held` past capacity. Callers check [`Self::can_hold`] first;
    /// reaching the fault means the per-tier serialization was bypassed.
    pub fn hold(&mut self, tier: TierId, quantity: u32) -> Result<(), IntegrityFault> {
        if !self.can_hold(quantity) {
            return Err(IntegrityFault::CapacityExceeded {
                tier,
                capacity: self.capacity,
                sold: self.sold,
                held: self.held,
                quantity,
            });
        }
        self.held += quantity;
        Ok(())
    }

    /// Releases `quantity` units from `held` back to available
    /// (cancellation or expiry).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityFault::HeldUnderflow`] if fewer than `quantity`
    /// units are currently held.
    pub fn release(&mut self, tier: TierId, quantity: u32) -> Result<(), IntegrityFault> {
        if self.held < quantity {
            return Err(IntegrityFault::HeldUnderflow {
                tier,
                held: self.held,
                quantity,
            });
        }
        self.held -= quantity;
        Ok(())
    }

    /// Moves `quantity` units from `held` to `sold` (successful commit).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityFault::HeldUnderflow`] if fewer than `quantity`
    /// units are currently held.
    pub fn commit(&mut self, tier: TierId, quantity: u32) -> Result<(), IntegrityFault> {
        if self.held < quantity {
            return Err(IntegrityFault::HeldUnderflow {
                tier,
                held: self.held,
                quantity,
            });
        }
        self.held -= quantity;
        self.sold += quantity;
        Ok(())
    }

    /// Invariant check: `sold + held ≤ capacity`
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.sold + self.held <= self.capacity
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot(capacity: u32) -> (TierId, InventorySnapshot) {
        (TierId::new(), InventorySnapshot::new(Capacity::new(capacity)))
    }

    #[test]
    fn hold_commit_release_cycle() {
        let (tier, mut snap) = snapshot(10);

        snap.hold(tier, 4).unwrap();
        assert_eq!(snap.held, 4);
        assert_eq!(snap.available(), 6);

        snap.commit(tier, 4).unwrap();
        assert_eq!(snap.held, 0);
        assert_eq!(snap.sold, 4);
        assert_eq!(snap.available(), 6);

        snap.hold(tier, 2).unwrap();
        snap.release(tier, 2).unwrap();
        assert_eq!(snap.available(), 6);
        assert!(snap.is_consistent());
    }

    #[test]
    fn hold_beyond_capacity_is_a_fault() {
        let (tier, mut snap) = snapshot(3);
        snap.hold(tier, 2).unwrap();

        let fault = snap.hold(tier, 2).unwrap_err();
        assert!(matches!(fault, IntegrityFault::CapacityExceeded { held: 2, .. }));
        // The snapshot is untouched by the failed transition
        assert_eq!(snap.held, 2);
        assert!(snap.is_consistent());
    }

    #[test]
    fn release_more_than_held_is_a_fault() {
        let (tier, mut snap) = snapshot(5);
        snap.hold(tier, 1).unwrap();

        let fault = snap.release(tier, 2).unwrap_err();
        assert_eq!(
            fault,
            IntegrityFault::HeldUnderflow {
                tier,
                held: 1,
                quantity: 2
            }
        );
        assert_eq!(snap.held, 1);
    }

    #[test]
    fn commit_without_hold_is_a_fault() {
        let (tier, mut snap) = snapshot(5);
        assert!(matches!(
            snap.commit(tier, 1),
            Err(IntegrityFault::HeldUnderflow { .. })
        ));
        assert_eq!(snap.sold, 0);
    }

    #[test]
    fn available_counts_both_sold_and_held() {
        let (tier, mut snap) = snapshot(10);
        snap.hold(tier, 3).unwrap();
        snap.commit(tier, 3).unwrap();
        snap.hold(tier, 2).unwrap();

        // 10 - 3 sold - 2 held
        assert_eq!(snap.available(), 5);
        assert!(!snap.can_hold(6));
        assert!(snap.can_hold(5));
    }
}
