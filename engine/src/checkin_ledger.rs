//! Check-in ledger: gate-side authority for ticket admission.
//!
//! Records are sharded per scan code: every `validate`/`reconcile` touching
//! one code is serialized by that code's mutex (linearizable per code), and
//! scans of different codes never contend. Two terminals scanning the same
//! code concurrently get exactly one admit and one duplicate, never two
//! admits.
//!
//! Offline terminals submit their queued scans through [`CheckInLedger::reconcile`];
//! the admission always settles on the chronologically first scan by client
//! timestamp, no matter which terminal recorded it or when the batch
//! arrived (see [`gatehouse_core::checkin`] for the ordering rule).

use crate::metrics as engine_metrics;
use crate::reporting::EventCheckInReport;
use crate::terminal::{OfflineScan, TicketSnapshot};
use gatehouse_core::{
    CheckInRecord, CheckInState, Clock, EventId, IntegrityFault, InvalidReason, ScanCode,
    ScanDisposition, ScanOutcome, ScanRecord, TerminalId, Ticket, TicketId, VoidError,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Outcome of reconciling one queued offline scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// The queued scan this outcome belongs to
    pub scan: OfflineScan,
    /// What the ledger decided for it
    pub outcome: ScanOutcome,
}

/// Single logical authority for per-ticket check-in state.
pub struct CheckInLedger {
    clock: Arc<dyn Clock>,
    records: RwLock<HashMap<ScanCode, Arc<Mutex<CheckInRecord>>>>,
    ticket_index: RwLock<HashMap<TicketId, ScanCode>>,
}

impl CheckInLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            records: RwLock::new(HashMap::new()),
            ticket_index: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a freshly minted ticket, creating its VALID record.
    ///
    /// Idempotent for the same ticket (commit replays re-register the same
    /// batch).
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityFault::DuplicateScanCode`] if the code is already
    /// registered to a *different* ticket.
    pub fn register(&self, ticket: &Ticket) -> Result<(), IntegrityFault> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = records.get(&ticket.scan_code) {
            let same = lock(existing).ticket.id == ticket.id;
            if same {
                return Ok(());
            }
            engine_metrics::record_integrity_fault("register");
            return Err(IntegrityFault::DuplicateScanCode {
                code: ticket.scan_code.clone(),
            });
        }

        records.insert(
            ticket.scan_code.clone(),
            Arc::new(Mutex::new(CheckInRecord::new(ticket.clone()))),
        );
        drop(records);

        self.ticket_index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(ticket.id, ticket.scan_code.clone());

        tracing::debug!(ticket = %ticket.id, code = %ticket.scan_code, "ticket registered");
        Ok(())
    }

    /// Registers a whole minted batch.
    ///
    /// # Errors
    ///
    /// Propagates the first [`IntegrityFault`] encountered.
    pub fn register_batch(&self, tickets: &[Ticket]) -> Result<(), IntegrityFault> {
        for ticket in tickets {
            self.register(ticket)?;
        }
        Ok(())
    }

    /// Validates a scan captured by an online terminal.
    ///
    /// `Admit` is returned only on the atomic `Valid → Used` transition;
    /// concurrent scans of the same code on other terminals observe
    /// `Duplicate` with this scan's details.
    #[must_use]
    pub fn validate(
        &self,
        code: &ScanCode,
        terminal: &TerminalId,
        event_id: EventId,
    ) -> ScanOutcome {
        let Some(handle) = self.record_handle(code) else {
            engine_metrics::record_scan("invalid");
            tracing::warn!(%code, %terminal, "scan of unknown code");
            return ScanOutcome::Invalid(InvalidReason::UnknownCode);
        };

        let mut record = lock(&handle);
        if record.ticket.event_id != event_id {
            engine_metrics::record_scan("invalid");
            tracing::warn!(
                %code,
                %terminal,
                expected = %event_id,
                actual = %record.ticket.event_id,
                "scan of ticket for a different event"
            );
            return ScanOutcome::Invalid(InvalidReason::WrongEvent {
                expected: event_id,
                actual: record.ticket.event_id,
            });
        }

        // Online scans carry sequence 0; ordering among online scans is the
        // ledger clock itself.
        let scan = ScanRecord::new(terminal.clone(), self.clock.now(), 0);
        let outcome = Self::settle(&mut record, scan);
        drop(record);
        outcome
    }

    /// Reconciles a batch of offline scans into the ledger.
    ///
    /// Entries are applied in client-timestamp order per scan code (ties by
    /// terminal id, then per-terminal sequence). The chronologically first
    /// `Valid → Used` transition wins regardless of arrival order; a later
    /// admission already on a record is demoted to a duplicate
    /// retroactively.
    #[must_use]
    pub fn reconcile(&self, batch: Vec<OfflineScan>) -> Vec<ReconcileOutcome> {
        let mut batch = batch;
        batch.sort_by(|a, b| {
            (a.recorded_at, &a.terminal, a.sequence).cmp(&(b.recorded_at, &b.terminal, b.sequence))
        });

        batch
            .into_iter()
            .map(|scan| {
                let outcome = self.reconcile_one(&scan);
                ReconcileOutcome { scan, outcome }
            })
            .collect()
    }

    fn reconcile_one(&self, scan: &OfflineScan) -> ScanOutcome {
        let Some(handle) = self.record_handle(&scan.code) else {
            engine_metrics::record_scan("invalid");
            return ScanOutcome::Invalid(InvalidReason::UnknownCode);
        };

        let mut record = lock(&handle);
        if record.ticket.event_id != scan.event_id {
            engine_metrics::record_scan("invalid");
            return ScanOutcome::Invalid(InvalidReason::WrongEvent {
                expected: scan.event_id,
                actual: record.ticket.event_id,
            });
        }

        let applied = ScanRecord::new(scan.terminal.clone(), scan.recorded_at, scan.sequence);
        Self::settle(&mut record, applied)
    }

    /// Voids a ticket (cancellation/refund after issuance).
    ///
    /// # Errors
    ///
    /// [`VoidError::AlreadyUsed`] if the attendee was already admitted;
    /// [`VoidError::NotFound`] for unknown ticket ids.
    pub fn void_ticket(&self, ticket_id: TicketId, reason: &str) -> Result<(), VoidError> {
        let code = self
            .ticket_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ticket_id)
            .cloned()
            .ok_or(VoidError::NotFound(ticket_id))?;

        let handle = self
            .record_handle(&code)
            .ok_or(VoidError::NotFound(ticket_id))?;
        let mut record = lock(&handle);
        record.void(reason)?;

        engine_metrics::record_ticket_voided();
        tracing::info!(ticket = %ticket_id, reason, "ticket voided");
        Ok(())
    }

    /// Current state of one ticket's record, if registered.
    #[must_use]
    pub fn record(&self, code: &ScanCode) -> Option<CheckInRecord> {
        let handle = self.record_handle(code)?;
        let record = lock(&handle);
        Some(record.clone())
    }

    /// Ticket snapshots for one event: what an offline terminal syncs
    /// before losing connectivity.
    #[must_use]
    pub fn snapshot_for_event(&self, event_id: EventId) -> Vec<TicketSnapshot> {
        let handles: Vec<Arc<Mutex<CheckInRecord>>> = {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            records.values().cloned().collect()
        };

        handles
            .iter()
            .filter_map(|handle| {
                let record = lock(handle);
                (record.ticket.event_id == event_id).then(|| TicketSnapshot {
                    ticket: record.ticket.clone(),
                    state: record.state,
                })
            })
            .collect()
    }

    /// Read-only check-in counts for one event (dashboard view).
    #[must_use]
    pub fn event_report(&self, event_id: EventId) -> EventCheckInReport {
        let handles: Vec<Arc<Mutex<CheckInRecord>>> = {
            let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
            records.values().cloned().collect()
        };

        let mut report = EventCheckInReport {
            event_id,
            registered: 0,
            admitted: 0,
            voided: 0,
            pending: 0,
        };
        for handle in &handles {
            let record = lock(handle);
            if record.ticket.event_id != event_id {
                continue;
            }
            report.registered += 1;
            match record.state {
                CheckInState::Used => report.admitted += 1,
                CheckInState::Void => report.voided += 1,
                CheckInState::Valid => report.pending += 1,
            }
        }
        report
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn record_handle(&self, code: &ScanCode) -> Option<Arc<Mutex<CheckInRecord>>> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    /// Applies a scan under the record lock and maps the disposition to the
    /// operator-facing outcome.
    fn settle(record: &mut CheckInRecord, scan: ScanRecord) -> ScanOutcome {
        let code = record.ticket.scan_code.clone();
        match record.apply_scan(scan) {
            ScanDisposition::Admitted => {
                engine_metrics::record_scan("admit");
                tracing::info!(%code, "attendee admitted");
                ScanOutcome::Admit(record.ticket.clone())
            }
            ScanDisposition::Superseded { demoted } => {
                // An earlier-stamped scan took over the admission; the
                // previously admitted scan is now a duplicate.
                engine_metrics::record_scan("admit");
                engine_metrics::record_scan("demoted");
                tracing::warn!(
                    %code,
                    demoted_terminal = %demoted.terminal,
                    demoted_at = %demoted.at,
                    "earlier scan superseded a recorded admission"
                );
                ScanOutcome::Admit(record.ticket.clone())
            }
            ScanDisposition::Duplicate { prior } => {
                engine_metrics::record_scan("duplicate");
                tracing::warn!(
                    %code,
                    prior_terminal = %prior.terminal,
                    prior_at = %prior.at,
                    "duplicate scan"
                );
                ScanOutcome::Duplicate {
                    ticket: record.ticket.clone(),
                    prior,
                }
            }
            ScanDisposition::Voided { reason } => {
                engine_metrics::record_scan("voided");
                ScanOutcome::Voided { reason }
            }
        }
    }
}

impl std::fmt::Debug for CheckInLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckInLedger").finish_non_exhaustive()
    }
}

fn lock(handle: &Arc<Mutex<CheckInRecord>>) -> MutexGuard<'_, CheckInRecord> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
