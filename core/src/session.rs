//! Reservation session lifecycle.
//!
//! A session is a temporary claim on `quantity` units of a tier while the
//! buyer completes payment:
//!
//! ```text
//! Active ──commit──▶ Committed
//!   │ ────cancel──▶ Cancelled
//!   └────TTL up───▶ Expired
//! ```
//!
//! All three right-hand states are terminal and immutable. Expiry is
//! evaluated lazily against the injected clock on every touch; the
//! background sweeper only bounds how long an abandoned hold can block
//! capacity reporting.

use crate::ids::{BuyerId, SessionId, TierId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a reservation session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Hold is live; the buyer may still pay
    Active,
    /// Payment confirmed, quantity moved to `sold`, tickets minted
    Committed,
    /// TTL elapsed before payment; quantity released
    Expired,
    /// Buyer abandoned checkout; quantity released
    Cancelled,
}

impl SessionState {
    /// Whether this state admits no further transitions
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Committed => write!(f, "committed"),
            Self::Expired => write!(f, "expired"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A short-lived hold on inventory pending payment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationSession {
    /// Session identifier
    pub id: SessionId,
    /// Tier the hold is against
    pub tier_id: TierId,
    /// Buyer who requested the hold
    pub buyer: BuyerId,
    /// Units held
    pub quantity: u32,
    /// When the hold was created
    pub created_at: DateTime<Utc>,
    /// When the hold lapses if not committed
    pub expires_at: DateTime<Utc>,
    /// Current lifecycle state
    pub state: SessionState,
}

impl ReservationSession {
    /// Creates an active session with a fresh id; `expires_at` is
    /// `created_at + ttl`.
    #[must_use]
    pub fn create(
        tier_id: TierId,
        buyer: BuyerId,
        quantity: u32,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        Self {
            id: SessionId::new(),
            tier_id,
            buyer,
            quantity,
            created_at,
            expires_at: created_at + ttl,
            state: SessionState::Active,
        }
    }

    /// Whether the TTL has elapsed. Only meaningful for active sessions;
    /// terminal sessions keep their state regardless of the clock.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.state == SessionState::Active && now >= self.expires_at
    }

    /// Marks the session committed. Ledger-internal: the caller holds the
    /// per-tier lock and has already rejected overdue and terminal sessions.
    pub fn mark_committed(&mut self) {
        debug_assert_eq!(self.state, SessionState::Active);
        self.state = SessionState::Committed;
    }

    /// Marks the session cancelled. Ledger-internal, see [`Self::mark_committed`].
    pub fn mark_cancelled(&mut self) {
        debug_assert_eq!(self.state, SessionState::Active);
        self.state = SessionState::Cancelled;
    }

    /// Marks the session expired. Ledger-internal, see [`Self::mark_committed`].
    pub fn mark_expired(&mut self) {
        debug_assert_eq!(self.state, SessionState::Active);
        self.state = SessionState::Expired;
    }
}
