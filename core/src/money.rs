//! Money and order pricing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from whole dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (`dollars * 100 > u64::MAX`).
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two amounts (`None` if the result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Computes a basis-point fraction of the amount, rounded half-up.
    ///
    /// `Money::from_cents(10_000).checked_fee_bps(500)` is 500 cents (5%).
    #[must_use]
    pub const fn checked_fee_bps(self, basis_points: u32) -> Option<Self> {
        match self.0.checked_mul(basis_points as u64) {
            // Half-up rounding over the 10_000 bps denominator
            Some(product) => match product.checked_add(5_000) {
                Some(shifted) => Some(Self(shifted / 10_000)),
                None => None,
            },
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Priced totals for an order: subtotal, service fee, and total.
///
/// The service fee is a basis-point rate applied to the subtotal (the
/// platform charges 5% = 500 bps by default).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPricing {
    /// Sum of unit price × quantity across the order
    pub subtotal: Money,
    /// Platform service fee
    pub service_fee: Money,
    /// Amount actually charged: subtotal + fee
    pub total: Money,
}

impl OrderPricing {
    /// Prices an order of `quantity` units at `unit_price`, applying the
    /// service fee rate in basis points.
    ///
    /// Returns `None` if any step of the arithmetic would overflow.
    #[must_use]
    pub const fn quote(unit_price: Money, quantity: u32, fee_bps: u32) -> Option<Self> {
        let subtotal = match unit_price.checked_multiply(quantity) {
            Some(s) => s,
            None => return None,
        };
        let service_fee = match subtotal.checked_fee_bps(fee_bps) {
            Some(f) => f,
            None => return None,
        };
        match subtotal.checked_add(service_fee) {
            Some(total) => Some(Self {
                subtotal,
                service_fee,
                total,
            }),
            None => None,
        }
    }
}
