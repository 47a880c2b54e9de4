//! Check-in state machine for a single ticket.
//!
//! A ticket is admitted at most once:
//!
//! ```text
//! Valid ──first successful scan──▶ Used
//!   └────organizer void──────────▶ Void
//! ```
//!
//! `Used` and `Void` are terminal for entry purposes, but scanning a used
//! ticket again reports a duplicate (with the prior scan's details) rather
//! than an error: the operator turns the attendee away without breaking
//! the queue.
//!
//! ## Offline reconciliation
//!
//! Terminals may scan while disconnected and submit their queues later.
//! The admission always belongs to the chronologically **first** scan by
//! client timestamp (ties broken by terminal id, then per-terminal
//! sequence), regardless of arrival order: applying an earlier-stamped scan
//! to an already-used record *supersedes* the current admission and demotes
//! it to a duplicate retroactively. [`CheckInRecord::apply_scan`] is
//! therefore order-insensitive: any interleaving of the same scans
//! converges on the same admission.

use crate::error::VoidError;
use crate::ids::TerminalId;
use crate::ticket::Ticket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Admission state of one ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckInState {
    /// Not yet admitted
    Valid,
    /// Admitted exactly once
    Used,
    /// Cancelled/refunded after issuance; never admits
    Void,
}

/// One observed scan of a ticket's code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    /// Terminal that captured the scan
    pub terminal: TerminalId,
    /// Client-side capture timestamp (terminal clock)
    pub at: DateTime<Utc>,
    /// Per-terminal monotonic sequence number
    pub sequence: u64,
}

impl ScanRecord {
    /// Creates a scan record
    #[must_use]
    pub const fn new(terminal: TerminalId, at: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            terminal,
            at,
            sequence,
        }
    }

    /// Total order used to pick the winning admission: client timestamp,
    /// then terminal id, then per-terminal sequence.
    #[must_use]
    pub fn precedes(&self, other: &Self) -> bool {
        (self.at, &self.terminal, self.sequence) < (other.at, &other.terminal, other.sequence)
    }
}

/// What applying one scan did to the record
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanDisposition {
    /// First scan: the ticket transitioned `Valid → Used`
    Admitted,
    /// This scan is chronologically earlier than the recorded admission;
    /// it takes over the admission and the old one is demoted
    Superseded {
        /// The previously recorded admission, now a duplicate
        demoted: ScanRecord,
    },
    /// The ticket was already used by an earlier (or equal) scan
    Duplicate {
        /// The scan that holds the admission
        prior: ScanRecord,
    },
    /// The ticket was voided before this scan
    Voided {
        /// Organizer-supplied reason
        reason: String,
    },
}

/// Why a scanned code did not resolve to an admittable ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidReason {
    /// No ticket with this code was ever minted
    UnknownCode,
    /// The code exists but belongs to a different event than the terminal
    /// is checking in for
    WrongEvent {
        /// Event the terminal is bound to
        expected: crate::ids::EventId,
        /// Event the ticket actually admits to
        actual: crate::ids::EventId,
    },
}

/// Operator-facing outcome of validating one scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Attendee may enter; shown with holder details
    Admit(Ticket),
    /// Ticket already admitted; attendee turned away, prior scan shown
    Duplicate {
        /// The ticket that was scanned
        ticket: Ticket,
        /// The scan holding the admission
        prior: ScanRecord,
    },
    /// Code did not resolve to a ticket for this event
    Invalid(InvalidReason),
    /// Ticket was voided after issuance
    Voided {
        /// Organizer-supplied reason
        reason: String,
    },
}

/// Authoritative check-in state for one ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// The minted ticket this record tracks
    pub ticket: Ticket,
    /// Current admission state
    pub state: CheckInState,
    /// The scan that holds the admission (`Some` iff state is `Used`)
    pub admitted: Option<ScanRecord>,
    /// Every scan ever observed for this code, in application order
    pub scans: SmallVec<[ScanRecord; 2]>,
    /// Reason the ticket was voided, if it was
    pub void_reason: Option<String>,
}

impl CheckInRecord {
    /// Creates a fresh record for a just-minted ticket
    #[must_use]
    pub fn new(ticket: Ticket) -> Self {
        Self {
            ticket,
            state: CheckInState::Valid,
            admitted: None,
            scans: SmallVec::new(),
            void_reason: None,
        }
    }

    /// Number of scans observed for this code
    #[must_use]
    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    /// The most recently applied scan
    #[must_use]
    pub fn last_scan(&self) -> Option<&ScanRecord> {
        self.scans.last()
    }

    /// Applies one scan and reports what it did.
    ///
    /// Order-insensitive: for a fixed set of scans, every application order
    /// leaves the admission on the chronologically first one.
    pub fn apply_scan(&mut self, scan: ScanRecord) -> ScanDisposition {
        self.scans.push(scan.clone());

        match self.state {
            CheckInState::Valid => {
                self.state = CheckInState::Used;
                self.admitted = Some(scan);
                ScanDisposition::Admitted
            }
            CheckInState::Used => match self.admitted.take() {
                Some(current) if scan.precedes(&current) => {
                    self.admitted = Some(scan);
                    ScanDisposition::Superseded { demoted: current }
                }
                Some(current) => {
                    self.admitted = Some(current.clone());
                    ScanDisposition::Duplicate { prior: current }
                }
                // Used without an admission cannot be constructed through
                // this API; treat the scan as the admission if it ever is.
                None => {
                    self.admitted = Some(scan);
                    ScanDisposition::Admitted
                }
            },
            CheckInState::Void => ScanDisposition::Voided {
                reason: self
                    .void_reason
                    .clone()
                    .unwrap_or_else(|| "voided".to_owned()),
            },
        }
    }

    /// Voids the ticket (cancellation/refund after issuance).
    ///
    /// Idempotent on already-void records; the original reason is kept.
    ///
    /// # Errors
    ///
    /// Returns [`VoidError::AlreadyUsed`] if the attendee was already
    /// admitted; reversing an admission needs a manual-override path.
    pub fn void(&mut self, reason: &str) -> Result<(), VoidError> {
        match self.state {
            CheckInState::Used => Err(VoidError::AlreadyUsed(self.ticket.id)),
            CheckInState::Void => Ok(()),
            CheckInState::Valid => {
                self.state = CheckInState::Void;
                self.void_reason = Some(reason.to_owned());
                Ok(())
            }
        }
    }
}
