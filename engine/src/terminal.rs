//! Scanner terminal with offline tolerance.
//!
//! A terminal must never block the attendee at the gate: when connectivity
//! drops it validates against the ticket snapshot it last synced and flags
//! the scan as *provisionally admitted, pending reconciliation*. Every
//! offline scan is queued with its client timestamp and a per-terminal
//! sequence number; the queue survives on device storage as JSON lines and
//! is submitted to [`crate::CheckInLedger::reconcile`] once the terminal is
//! back online.
//!
//! Provisional outcomes are advisory: the ledger's reconciliation is the
//! authority, and a provisional admit can still come back as a duplicate
//! if another terminal's earlier scan wins.

use crate::checkin_ledger::CheckInLedger;
use gatehouse_core::{CheckInState, EventId, ScanCode, TerminalId, Ticket};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A ticket's state as of the terminal's last sync.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    /// The minted ticket
    pub ticket: Ticket,
    /// Check-in state at sync time
    pub state: CheckInState,
}

/// One scan captured while disconnected, queued for reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineScan {
    /// The captured code
    pub code: ScanCode,
    /// Event the terminal is checking in for
    pub event_id: EventId,
    /// Terminal that captured the scan
    pub terminal: TerminalId,
    /// Client-side capture timestamp (terminal clock)
    pub recorded_at: DateTime<Utc>,
    /// Per-terminal monotonic sequence number
    pub sequence: u64,
}

/// Gate decision made from the local snapshot while offline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProvisionalOutcome {
    /// Snapshot says the ticket is valid and this terminal has not seen it
    /// yet: admit, pending reconciliation
    ProvisionalAdmit(Ticket),
    /// Snapshot (or this terminal's own queue) says the ticket was already
    /// used: turn away, pending reconciliation
    ProvisionalDuplicate(Ticket),
    /// Snapshot says the ticket was voided
    ProvisionalVoided(Ticket),
    /// Code not in the snapshot; queued anyway so reconciliation can rule
    NotOnRecord,
}

/// One scanning station at the gate.
#[derive(Debug)]
pub struct ScannerTerminal {
    id: TerminalId,
    event_id: EventId,
    snapshot: HashMap<ScanCode, TicketSnapshot>,
    queue: Vec<OfflineScan>,
    seen_offline: HashSet<ScanCode>,
    next_sequence: u64,
}

impl ScannerTerminal {
    /// Creates a terminal bound to one event, with an empty snapshot.
    #[must_use]
    pub fn new(id: TerminalId, event_id: EventId) -> Self {
        Self {
            id,
            event_id,
            snapshot: HashMap::new(),
            queue: Vec::new(),
            seen_offline: HashSet::new(),
            next_sequence: 1,
        }
    }

    /// This terminal's id.
    #[must_use]
    pub const fn id(&self) -> &TerminalId {
        &self.id
    }

    /// Refreshes the local snapshot from the ledger (requires
    /// connectivity).
    pub fn sync(&mut self, ledger: &CheckInLedger) {
        self.snapshot = ledger
            .snapshot_for_event(self.event_id)
            .into_iter()
            .map(|snap| (snap.ticket.scan_code.clone(), snap))
            .collect();
        tracing::debug!(
            terminal = %self.id,
            tickets = self.snapshot.len(),
            "terminal snapshot synced"
        );
    }

    /// Validates a scan against the local snapshot and queues it for
    /// reconciliation. Never blocks on the network.
    pub fn scan_offline(&mut self, code: &ScanCode, now: DateTime<Utc>) -> ProvisionalOutcome {
        self.queue.push(OfflineScan {
            code: code.clone(),
            event_id: self.event_id,
            terminal: self.id.clone(),
            recorded_at: now,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;

        let outcome = match self.snapshot.get(code) {
            None => ProvisionalOutcome::NotOnRecord,
            Some(snap) => match snap.state {
                CheckInState::Void => ProvisionalOutcome::ProvisionalVoided(snap.ticket.clone()),
                CheckInState::Used => ProvisionalOutcome::ProvisionalDuplicate(snap.ticket.clone()),
                CheckInState::Valid => {
                    if self.seen_offline.contains(code) {
                        ProvisionalOutcome::ProvisionalDuplicate(snap.ticket.clone())
                    } else {
                        ProvisionalOutcome::ProvisionalAdmit(snap.ticket.clone())
                    }
                }
            },
        };
        self.seen_offline.insert(code.clone());

        tracing::debug!(terminal = %self.id, %code, queued = self.queue.len(), "offline scan queued");
        outcome
    }

    /// Scans queued since the last drain.
    #[must_use]
    pub fn pending(&self) -> &[OfflineScan] {
        &self.queue
    }

    /// Takes the queued scans for submission to the ledger.
    pub fn drain(&mut self) -> Vec<OfflineScan> {
        self.seen_offline.clear();
        std::mem::take(&mut self.queue)
    }

    /// Serializes the queue as JSON lines for device storage.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if an entry cannot be encoded.
    pub fn export_queue(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for scan in &self.queue {
            out.push_str(&serde_json::to_string(scan)?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Restores a queue previously written by [`Self::export_queue`].
    ///
    /// # Errors
    ///
    /// Returns a deserialization error on a corrupt line.
    pub fn import_queue(&mut self, stored: &str) -> Result<(), serde_json::Error> {
        for line in stored.lines().filter(|line| !line.trim().is_empty()) {
            let scan: OfflineScan = serde_json::from_str(line)?;
            self.next_sequence = self.next_sequence.max(scan.sequence + 1);
            self.seen_offline.insert(scan.code.clone());
            self.queue.push(scan);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gatehouse_core::{BuyerId, Money, OrderId, TierId};

    fn ticket(event_id: EventId) -> Ticket {
        Ticket::mint_batch(
            1,
            TierId::new(),
            event_id,
            OrderId::new(),
            BuyerId::new(),
            "Chantal M.",
            Money::from_dollars(20),
        )
        .remove(0)
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, secs).single().unwrap()
    }

    fn terminal_with_snapshot(event_id: EventId, tickets: &[Ticket]) -> ScannerTerminal {
        let mut terminal = ScannerTerminal::new(TerminalId::new("gate-a"), event_id);
        terminal.snapshot = tickets
            .iter()
            .map(|t| {
                (
                    t.scan_code.clone(),
                    TicketSnapshot {
                        ticket: t.clone(),
                        state: CheckInState::Valid,
                    },
                )
            })
            .collect();
        terminal
    }

    #[test]
    fn offline_scan_of_synced_ticket_provisionally_admits() {
        let event_id = EventId::new();
        let ticket = ticket(event_id);
        let mut terminal = terminal_with_snapshot(event_id, std::slice::from_ref(&ticket));

        let outcome = terminal.scan_offline(&ticket.scan_code, at(0));
        assert_eq!(outcome, ProvisionalOutcome::ProvisionalAdmit(ticket.clone()));
        assert_eq!(terminal.pending().len(), 1);
        assert_eq!(terminal.pending()[0].sequence, 1);
    }

    #[test]
    fn repeat_offline_scan_is_a_provisional_duplicate() {
        let event_id = EventId::new();
        let ticket = ticket(event_id);
        let mut terminal = terminal_with_snapshot(event_id, std::slice::from_ref(&ticket));

        terminal.scan_offline(&ticket.scan_code, at(0));
        let outcome = terminal.scan_offline(&ticket.scan_code, at(10));
        assert_eq!(outcome, ProvisionalOutcome::ProvisionalDuplicate(ticket));
        assert_eq!(terminal.pending().len(), 2, "duplicates are still queued");
    }

    #[test]
    fn unknown_code_is_queued_for_reconciliation() {
        let event_id = EventId::new();
        let mut terminal = terminal_with_snapshot(event_id, &[]);

        let outcome = terminal.scan_offline(&ScanCode::from_captured("TKT-nope"), at(0));
        assert_eq!(outcome, ProvisionalOutcome::NotOnRecord);
        assert_eq!(terminal.pending().len(), 1);
    }

    #[test]
    fn queue_round_trips_through_json_lines() {
        let event_id = EventId::new();
        let ticket = ticket(event_id);
        let mut terminal = terminal_with_snapshot(event_id, std::slice::from_ref(&ticket));
        terminal.scan_offline(&ticket.scan_code, at(0));
        terminal.scan_offline(&ScanCode::from_captured("TKT-other"), at(5));

        let stored = terminal.export_queue().unwrap();
        assert_eq!(stored.lines().count(), 2);

        let mut restored = ScannerTerminal::new(TerminalId::new("gate-a"), event_id);
        restored.import_queue(&stored).unwrap();
        assert_eq!(restored.pending(), terminal.pending());
        // Sequences continue after the restored entries
        assert_eq!(restored.next_sequence, 3);
    }

    #[test]
    fn drain_empties_the_queue_and_resets_local_dedup() {
        let event_id = EventId::new();
        let ticket = ticket(event_id);
        let mut terminal = terminal_with_snapshot(event_id, std::slice::from_ref(&ticket));
        terminal.scan_offline(&ticket.scan_code, at(0));

        let batch = terminal.drain();
        assert_eq!(batch.len(), 1);
        assert!(terminal.pending().is_empty());
    }
}
