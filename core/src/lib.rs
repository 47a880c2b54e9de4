//! # Gatehouse Core
//!
//! Pure domain model for the Gatehouse ticketing engine: inventory
//! arbitration, reservation lifecycle, and check-in reconciliation.
//!
//! Everything in this crate is side-effect free. State transitions are
//! expressed as fallible methods on owned values; the concurrent ledgers in
//! `gatehouse-engine` wrap them with per-key serialization and I/O.
//!
//! ## Core Concepts
//!
//! - **`TicketTier`** / **`InventorySnapshot`**: per-tier capacity
//!   arbitration with the invariant `sold + held ≤ capacity`
//! - **`ReservationSession`**: a short-lived hold on inventory while a buyer
//!   completes payment (`Active → Committed | Expired | Cancelled`)
//! - **`Ticket`** / **`Order`**: minted exactly once when a hold commits
//! - **`CheckInRecord`**: single-use admission state for one ticket,
//!   tolerant of offline scans reconciled after the fact
//!
//! Expected outcomes (sold out, duplicate scan) are modeled as values;
//! violated invariants surface as [`IntegrityFault`] and are never clamped.

pub mod checkin;
pub mod environment;
pub mod error;
pub mod ids;
pub mod money;
pub mod order;
pub mod session;
pub mod ticket;
pub mod tier;

pub use checkin::{CheckInRecord, CheckInState, InvalidReason, ScanDisposition, ScanOutcome, ScanRecord};
pub use environment::{Clock, SystemClock};
pub use error::{CancelError, CommitError, IntegrityFault, ReserveError, VoidError};
pub use ids::{BuyerId, EventId, OrderId, ScanCode, SessionId, TerminalId, TicketId, TierId};
pub use money::{Money, OrderPricing};
pub use order::{Order, OrderLine};
pub use session::{ReservationSession, SessionState};
pub use ticket::Ticket;
pub use tier::{Capacity, InventorySnapshot, TicketTier};
