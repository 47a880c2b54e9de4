//! Error taxonomy for ledger operations.
//!
//! Three categories with different handling rules:
//!
//! - **Capacity errors** ([`ReserveError`]) are expected user-facing
//!   outcomes: the buyer picks a smaller quantity or another tier.
//! - **Session errors** ([`CommitError`], [`CancelError`]) mean the buyer
//!   must restart the reservation flow.
//! - **Integrity faults** ([`IntegrityFault`]) are defects: an invariant
//!   like `sold + held ≤ capacity` was about to be violated. They abort the
//!   operation, must be surfaced loudly, and must not be retried blindly.
//!
//! Scan-time outcomes (duplicate, voided, unknown code) are values, not
//! errors; see [`crate::checkin::ScanOutcome`].

use crate::ids::{ScanCode, SessionId, TicketId, TierId};
use crate::session::SessionState;
use thiserror::Error;

/// A broken ledger invariant. Never clamped, never silently recovered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityFault {
    /// Releasing or committing more units than are currently held
    #[error("tier {tier}: cannot move {quantity} units out of hold, only {held} held")]
    HeldUnderflow {
        /// Tier whose snapshot would underflow
        tier: TierId,
        /// Units currently held
        held: u32,
        /// Units the operation tried to move
        quantity: u32,
    },

    /// A hold or sale would push `sold + held` past capacity
    #[error("tier {tier}: {sold} sold + {held} held + {quantity} requested exceeds capacity {capacity}")]
    CapacityExceeded {
        /// Tier whose snapshot would overflow
        tier: TierId,
        /// Configured capacity
        capacity: u32,
        /// Committed sales
        sold: u32,
        /// Active holds
        held: u32,
        /// Units the operation tried to add
        quantity: u32,
    },

    /// A session points at a tier the ledger no longer knows
    #[error("session {session} references unknown tier {tier}")]
    TierVanished {
        /// The orphaned session
        session: SessionId,
        /// The missing tier
        tier: TierId,
    },

    /// A scan code was registered twice
    #[error("scan code {code} is already registered")]
    DuplicateScanCode {
        /// The colliding code
        code: ScanCode,
    },

    /// Order pricing arithmetic overflowed
    #[error("order pricing overflowed for session {session}")]
    PricingOverflow {
        /// Session being committed
        session: SessionId,
    },

    /// A tier id was registered twice
    #[error("tier {tier} is already registered")]
    DuplicateTier {
        /// The colliding tier id
        tier: TierId,
    },
}

/// Why a reservation request was refused. Expected outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReserveError {
    /// The tier id is not registered with this ledger
    #[error("unknown tier {0}")]
    UnknownTier(TierId),

    /// Quantity must be at least one
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// The request exceeds the tier's per-order limit
    #[error("requested {requested} exceeds the per-order limit of {max_per_order}")]
    LimitExceeded {
        /// Units requested
        requested: u32,
        /// Tier per-order limit
        max_per_order: u32,
    },

    /// Not enough units left after committed sales and active holds
    #[error("requested {requested} but only {available} available")]
    OutOfStock {
        /// Units requested
        requested: u32,
        /// Units currently available
        available: u32,
    },

    /// An invariant was violated while applying the hold
    #[error(transparent)]
    Integrity(#[from] IntegrityFault),
}

/// Why a commit failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// No session with this id was ever created
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The hold timed out before payment completed; the buyer must
    /// re-reserve. A hold is never silently re-extended.
    #[error("session {0} expired before commit")]
    SessionExpired(SessionId),

    /// The session already reached a terminal state other than committed
    #[error("session {session} is already {state}")]
    AlreadyTerminal {
        /// Session being committed
        session: SessionId,
        /// Its terminal state
        state: SessionState,
    },

    /// An invariant was violated while applying the commit
    #[error(transparent)]
    Integrity(#[from] IntegrityFault),
}

/// Why a cancellation failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    /// No session with this id was ever created
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    /// The session already reached a terminal state
    #[error("session {session} is already {state}")]
    AlreadyTerminal {
        /// Session being cancelled
        session: SessionId,
        /// Its terminal state
        state: SessionState,
    },

    /// An invariant was violated while releasing the hold
    #[error(transparent)]
    Integrity(#[from] IntegrityFault),
}

/// Why an organizer-initiated void was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoidError {
    /// No ticket with this id is registered
    #[error("ticket {0} not found")]
    NotFound(TicketId),

    /// The attendee was already admitted; voiding after admission needs a
    /// manual-override path, not this one
    #[error("ticket {0} was already used for admission")]
    AlreadyUsed(TicketId),
}
