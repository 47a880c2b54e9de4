//! Inventory ledger: the single source of truth for tier capacity.
//!
//! Prevents overselling under concurrent reservation attempts (the "last
//! ticket" problem) by arbitrating every hold against
//! `available = capacity - sold - held` under a per-tier lock.
//!
//! Sharding: the outer maps are only write-locked to register tiers and
//! index sessions; all capacity arbitration happens under the individual
//! tier mutex, so unrelated tiers never contend.

use crate::metrics as engine_metrics;
use gatehouse_core::{
    BuyerId, CancelError, Clock, CommitError, EventId, IntegrityFault, InventorySnapshot, Order,
    OrderId, OrderLine, OrderPricing, ReservationSession, ReserveError, SessionId, SessionState,
    Ticket, TicketTier, TierId,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// The permanent result of a committed reservation: the order and the
/// tickets minted for it. Stored on the session so retried commits replay
/// the identical outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedOrder {
    /// The order built at commit time
    pub order: Order,
    /// One ticket per purchased unit
    pub tickets: Vec<Ticket>,
}

/// A session and, once committed, its permanent outcome.
#[derive(Debug)]
struct SessionSlot {
    session: ReservationSession,
    outcome: Option<CommittedOrder>,
}

/// Everything the ledger tracks for one tier, guarded by one mutex.
#[derive(Debug)]
struct TierState {
    tier: TicketTier,
    snapshot: InventorySnapshot,
    sessions: HashMap<SessionId, SessionSlot>,
}

/// Single logical authority for tier capacity, holds, and sales.
///
/// Nothing outside this ledger may mutate `sold` or `held`.
pub struct InventoryLedger {
    clock: Arc<dyn Clock>,
    reservation_ttl: chrono::Duration,
    service_fee_bps: u32,
    tiers: RwLock<HashMap<TierId, Arc<Mutex<TierState>>>>,
    session_index: RwLock<HashMap<SessionId, TierId>>,
}

impl InventoryLedger {
    /// Creates an empty ledger.
    ///
    /// `reservation_ttl` bounds how long a hold blocks capacity;
    /// `service_fee_bps` is the platform fee applied when pricing orders.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, reservation_ttl: chrono::Duration, service_fee_bps: u32) -> Self {
        Self {
            clock,
            reservation_ttl,
            service_fee_bps,
            tiers: RwLock::new(HashMap::new()),
            session_index: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a tier with this ledger.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrityFault::DuplicateTier`] if the tier id is already
    /// registered.
    pub fn register_tier(&self, tier: TicketTier) -> Result<TierId, IntegrityFault> {
        let mut tiers = self
            .tiers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if tiers.contains_key(&tier.id) {
            return Err(IntegrityFault::DuplicateTier { tier: tier.id });
        }

        let id = tier.id;
        let snapshot = InventorySnapshot::new(tier.capacity);
        tiers.insert(
            id,
            Arc::new(Mutex::new(TierState {
                tier,
                snapshot,
                sessions: HashMap::new(),
            })),
        );

        tracing::info!(tier = %id, "tier registered");
        Ok(id)
    }

    /// Places a hold on `quantity` units of a tier for `buyer`.
    ///
    /// Atomic per tier: overdue holds on the same tier are expired first,
    /// then availability is checked and the hold claimed under one lock.
    ///
    /// # Errors
    ///
    /// [`ReserveError::OutOfStock`] and [`ReserveError::LimitExceeded`] are
    /// expected user-facing outcomes. [`ReserveError::Integrity`] indicates
    /// a ledger defect and must not be retried.
    pub fn reserve(
        &self,
        tier_id: TierId,
        buyer: BuyerId,
        quantity: u32,
    ) -> Result<ReservationSession, ReserveError> {
        if quantity == 0 {
            return Err(ReserveError::InvalidQuantity);
        }

        let handle = self
            .tier_handle(tier_id)
            .ok_or(ReserveError::UnknownTier(tier_id))?;
        let now = self.clock.now();

        let session = {
            let mut state = lock(&handle);

            // Lazy sweep so abandoned holds don't mask real availability.
            let lapsed = Self::sweep_tier(&mut state, now);
            if lapsed > 0 {
                engine_metrics::record_reservations_expired(lapsed);
            }

            if quantity > state.tier.max_per_order {
                return Err(ReserveError::LimitExceeded {
                    requested: quantity,
                    max_per_order: state.tier.max_per_order,
                });
            }

            if !state.snapshot.can_hold(quantity) {
                tracing::debug!(
                    tier = %tier_id,
                    requested = quantity,
                    available = state.snapshot.available(),
                    "reservation refused: out of stock"
                );
                return Err(ReserveError::OutOfStock {
                    requested: quantity,
                    available: state.snapshot.available(),
                });
            }

            state.snapshot.hold(tier_id, quantity).map_err(|fault| {
                engine_metrics::record_integrity_fault("reserve");
                tracing::error!(tier = %tier_id, %fault, "integrity fault during reserve");
                ReserveError::Integrity(fault)
            })?;

            let session =
                ReservationSession::create(tier_id, buyer, quantity, now, self.reservation_ttl);
            state.sessions.insert(
                session.id,
                SessionSlot {
                    session: session.clone(),
                    outcome: None,
                },
            );
            session
        };

        self.session_index
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id, tier_id);

        engine_metrics::record_reservation_created(quantity);
        tracing::debug!(
            session = %session.id,
            tier = %tier_id,
            buyer = %buyer,
            quantity,
            expires_at = %session.expires_at,
            "hold placed"
        );
        Ok(session)
    }

    /// Prices the order a session would commit to, without committing.
    ///
    /// The checkout flow charges this amount before calling [`Self::commit`];
    /// no ledger lock is held while the payment provider decides.
    ///
    /// # Errors
    ///
    /// Fails like [`Self::commit`] for missing, expired, or terminal
    /// sessions. An already-committed session quotes its recorded pricing.
    pub fn quote(&self, session_id: SessionId) -> Result<OrderPricing, CommitError> {
        let (handle, _tier_id) = self.session_handle(session_id)?;
        let now = self.clock.now();
        let mut state = lock(&handle);

        let fee_bps = self.service_fee_bps;
        let unit_price = state.tier.unit_price;
        let tier_id = state.tier.id;
        let slot = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CommitError::SessionNotFound(session_id))?;

        if let Some(outcome) = &slot.outcome {
            return Ok(outcome.order.pricing);
        }

        match Self::check_active(slot, session_id, now) {
            Ok(()) => {}
            Err(error) => {
                if Self::expire_slot(&mut state, session_id, tier_id) {
                    engine_metrics::record_reservations_expired(1);
                }
                return Err(error);
            }
        }

        OrderPricing::quote(unit_price, slot.session.quantity, fee_bps)
            .ok_or(CommitError::Integrity(IntegrityFault::PricingOverflow {
                session: session_id,
            }))
    }

    /// Looks up a session by id (for UI display).
    #[must_use]
    pub fn session(&self, session_id: SessionId) -> Option<ReservationSession> {
        let (handle, _) = self.session_handle(session_id).ok()?;
        let state = lock(&handle);
        state
            .sessions
            .get(&session_id)
            .map(|slot| slot.session.clone())
    }

    /// Commits a session: moves its quantity from `held` to `sold`, mints
    /// one ticket per unit, and builds the order.
    ///
    /// Idempotent: committing an already-committed session returns the
    /// identical order and ticket set without touching the snapshot, the
    /// guard against payment-callback retries.
    ///
    /// # Errors
    ///
    /// [`CommitError::SessionExpired`] if the TTL elapsed first (the hold
    /// is expired on the spot, never re-extended); the buyer must
    /// re-reserve. [`CommitError::Integrity`] faults abort the commit.
    pub fn commit(
        &self,
        session_id: SessionId,
        holder_name: &str,
    ) -> Result<CommittedOrder, CommitError> {
        let (handle, tier_id) = self.session_handle(session_id)?;
        let now = self.clock.now();
        let mut state = lock(&handle);

        let tier_name = state.tier.name.clone();
        let unit_price = state.tier.unit_price;
        let event_id = state.tier.event_id;
        let fee_bps = self.service_fee_bps;

        let slot = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CommitError::SessionNotFound(session_id))?;

        // Retried commit: replay the recorded outcome, mint nothing.
        if let Some(outcome) = &slot.outcome {
            tracing::debug!(session = %session_id, "idempotent commit replay");
            return Ok(outcome.clone());
        }

        match Self::check_active(slot, session_id, now) {
            Ok(()) => {}
            Err(error) => {
                if Self::expire_slot(&mut state, session_id, tier_id) {
                    engine_metrics::record_reservations_expired(1);
                }
                return Err(error);
            }
        }

        let quantity = slot.session.quantity;
        let buyer = slot.session.buyer;
        let created_at = slot.session.created_at;

        let pricing = OrderPricing::quote(unit_price, quantity, fee_bps).ok_or(
            CommitError::Integrity(IntegrityFault::PricingOverflow {
                session: session_id,
            }),
        )?;

        state.snapshot.commit(tier_id, quantity).map_err(|fault| {
            engine_metrics::record_integrity_fault("commit");
            tracing::error!(session = %session_id, %fault, "integrity fault during commit");
            CommitError::Integrity(fault)
        })?;

        let order_id = OrderId::new();
        let tickets = Ticket::mint_batch(
            quantity,
            tier_id,
            event_id,
            order_id,
            buyer,
            holder_name,
            unit_price,
        );
        let order = Order {
            id: order_id,
            session_id,
            buyer,
            event_id,
            line: OrderLine {
                tier_id,
                tier_name,
                quantity,
                unit_price,
            },
            pricing,
            created_at: now,
        };

        let committed = CommittedOrder { order, tickets };
        if let Some(slot) = state.sessions.get_mut(&session_id) {
            slot.session.mark_committed();
            slot.outcome = Some(committed.clone());
        }

        let held_secs = (now - created_at).num_milliseconds() as f64 / 1000.0;
        engine_metrics::record_reservation_committed(quantity, held_secs);
        tracing::info!(
            session = %session_id,
            order = %committed.order.id,
            tier = %tier_id,
            quantity,
            total = %pricing.total,
            "reservation committed"
        );
        Ok(committed)
    }

    /// Cancels a session on explicit buyer abandonment, releasing its hold.
    ///
    /// An overdue session is expired instead (truthful accounting), which
    /// then reports as already terminal.
    ///
    /// # Errors
    ///
    /// [`CancelError::AlreadyTerminal`] for committed/expired/cancelled
    /// sessions; [`CancelError::Integrity`] if releasing the hold would
    /// break the snapshot invariant.
    pub fn cancel(&self, session_id: SessionId) -> Result<(), CancelError> {
        let (handle, tier_id) = match self.session_handle(session_id) {
            Ok(pair) => pair,
            Err(CommitError::SessionNotFound(id)) => return Err(CancelError::SessionNotFound(id)),
            Err(CommitError::Integrity(fault)) => return Err(CancelError::Integrity(fault)),
            // session_handle only produces the two variants above
            Err(_) => return Err(CancelError::SessionNotFound(session_id)),
        };
        let now = self.clock.now();
        let mut state = lock(&handle);

        let slot = state
            .sessions
            .get_mut(&session_id)
            .ok_or(CancelError::SessionNotFound(session_id))?;

        if slot.session.is_overdue(now) {
            if Self::expire_slot(&mut state, session_id, tier_id) {
                engine_metrics::record_reservations_expired(1);
            }
            return Err(CancelError::AlreadyTerminal {
                session: session_id,
                state: SessionState::Expired,
            });
        }

        if slot.session.state.is_terminal() {
            return Err(CancelError::AlreadyTerminal {
                session: session_id,
                state: slot.session.state,
            });
        }

        let quantity = slot.session.quantity;
        state.snapshot.release(tier_id, quantity).map_err(|fault| {
            engine_metrics::record_integrity_fault("cancel");
            tracing::error!(session = %session_id, %fault, "integrity fault during cancel");
            CancelError::Integrity(fault)
        })?;
        if let Some(slot) = state.sessions.get_mut(&session_id) {
            slot.session.mark_cancelled();
        }

        engine_metrics::record_reservation_cancelled();
        tracing::debug!(session = %session_id, tier = %tier_id, quantity, "hold cancelled");
        Ok(())
    }

    /// Expires every overdue active session across all tiers, releasing
    /// their held quantity. Returns the number of sessions expired.
    ///
    /// Locks one tier at a time, so a sweep never stalls reservations on
    /// other tiers.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let handles: Vec<Arc<Mutex<TierState>>> = {
            let tiers = self.tiers.read().unwrap_or_else(PoisonError::into_inner);
            tiers.values().cloned().collect()
        };

        let mut expired = 0;
        for handle in handles {
            let mut state = lock(&handle);
            expired += Self::sweep_tier(&mut state, now);
        }

        if expired > 0 {
            engine_metrics::record_reservations_expired(expired);
            tracing::info!(expired, "expiry sweep released holds");
        }
        expired
    }

    /// Read-only availability snapshot for one tier.
    #[must_use]
    pub fn availability(&self, tier_id: TierId) -> Option<InventorySnapshot> {
        let handle = self.tier_handle(tier_id)?;
        let state = lock(&handle);
        Some(state.snapshot)
    }

    /// Read-only sales report for every tier of an event (organizer
    /// dashboard view; not part of the arbitration contract).
    #[must_use]
    pub fn tier_report(&self, event_id: EventId) -> Vec<crate::reporting::TierSalesReport> {
        let handles: Vec<Arc<Mutex<TierState>>> = {
            let tiers = self.tiers.read().unwrap_or_else(PoisonError::into_inner);
            tiers.values().cloned().collect()
        };

        let mut reports: Vec<crate::reporting::TierSalesReport> = handles
            .iter()
            .filter_map(|handle| {
                let state = lock(handle);
                (state.tier.event_id == event_id).then(|| crate::reporting::TierSalesReport {
                    tier_id: state.tier.id,
                    name: state.tier.name.clone(),
                    capacity: state.snapshot.capacity,
                    sold: state.snapshot.sold,
                    held: state.snapshot.held,
                    available: state.snapshot.available(),
                    unit_price: state.tier.unit_price,
                })
            })
            .collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn tier_handle(&self, tier_id: TierId) -> Option<Arc<Mutex<TierState>>> {
        self.tiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&tier_id)
            .cloned()
    }

    /// Resolves a session id to its tier handle.
    fn session_handle(
        &self,
        session_id: SessionId,
    ) -> Result<(Arc<Mutex<TierState>>, TierId), CommitError> {
        let tier_id = self
            .session_index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_id)
            .copied()
            .ok_or(CommitError::SessionNotFound(session_id))?;

        let handle = self.tier_handle(tier_id).ok_or(CommitError::Integrity(
            IntegrityFault::TierVanished {
                session: session_id,
                tier: tier_id,
            },
        ))?;
        Ok((handle, tier_id))
    }

    /// Rejects terminal and overdue sessions before a state-changing touch.
    fn check_active(
        slot: &SessionSlot,
        session_id: SessionId,
        now: DateTime<Utc>,
    ) -> Result<(), CommitError> {
        if slot.session.is_overdue(now) {
            return Err(CommitError::SessionExpired(session_id));
        }
        match slot.session.state {
            SessionState::Active => Ok(()),
            SessionState::Expired => Err(CommitError::SessionExpired(session_id)),
            state => Err(CommitError::AlreadyTerminal {
                session: session_id,
                state,
            }),
        }
    }

    /// Applies the lazy expiry of one overdue session under the tier lock.
    /// Returns whether the session actually transitioned to expired.
    fn expire_slot(state: &mut TierState, session_id: SessionId, tier_id: TierId) -> bool {
        let Some(slot) = state.sessions.get_mut(&session_id) else {
            return false;
        };
        if slot.session.state != SessionState::Active {
            return false;
        }
        let quantity = slot.session.quantity;
        match state.snapshot.release(tier_id, quantity) {
            Ok(()) => {
                if let Some(slot) = state.sessions.get_mut(&session_id) {
                    slot.session.mark_expired();
                }
                tracing::debug!(session = %session_id, tier = %tier_id, quantity, "hold expired");
                true
            }
            Err(fault) => {
                engine_metrics::record_integrity_fault("expire");
                tracing::error!(session = %session_id, %fault, "integrity fault during expiry");
                false
            }
        }
    }

    /// Expires every overdue session of one tier. Caller holds the lock.
    fn sweep_tier(state: &mut TierState, now: DateTime<Utc>) -> usize {
        let overdue: Vec<SessionId> = state
            .sessions
            .values()
            .filter(|slot| slot.session.is_overdue(now))
            .map(|slot| slot.session.id)
            .collect();

        let tier_id = state.tier.id;
        overdue
            .into_iter()
            .filter(|session_id| Self::expire_slot(state, *session_id, tier_id))
            .count()
    }
}

impl std::fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("reservation_ttl", &self.reservation_ttl)
            .field("service_fee_bps", &self.service_fee_bps)
            .finish_non_exhaustive()
    }
}

/// Locks a tier, recovering from poison: snapshot transitions are checked
/// and never leave partial state behind a panic.
fn lock(handle: &Arc<Mutex<TierState>>) -> MutexGuard<'_, TierState> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
