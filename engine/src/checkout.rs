//! Checkout orchestration: quote → charge → commit → register.
//!
//! Payment is decided with no ledger lock held. The flow re-enters the
//! inventory ledger only to apply the already-decided outcome:
//!
//! ```text
//! 1. quote(session)              per-tier lock, released before 2
//! 2. gateway.charge(...)         external call, retried on transient errors
//! 3a. success → commit(session)  per-tier lock: held → sold, mint tickets
//!             → register batch   check-in records created
//! 3b. decline → cancel(session)  hold released for other buyers
//! ```
//!
//! If the hold expires while the provider is deciding, the commit fails
//! with `SessionExpired` and the charge is refunded; the buyer must
//! re-reserve.

use crate::checkin_ledger::CheckInLedger;
use crate::inventory::{CommittedOrder, InventoryLedger};
use crate::metrics as engine_metrics;
use crate::payment::{charge_with_retry, PaymentError, PaymentGateway, RetryPolicy};
use gatehouse_core::{CommitError, IntegrityFault, SessionId};
use std::sync::Arc;
use thiserror::Error;

/// Why a purchase could not be completed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The reservation session was missing, expired, or terminal
    #[error(transparent)]
    Session(#[from] CommitError),

    /// The payment provider refused or could not be reached
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// A ledger invariant was violated while finalizing the purchase
    #[error(transparent)]
    Integrity(#[from] IntegrityFault),
}

/// Ties the two ledgers and the payment boundary into one purchase flow.
pub struct CheckoutFlow {
    inventory: Arc<InventoryLedger>,
    checkin: Arc<CheckInLedger>,
    gateway: Arc<dyn PaymentGateway>,
    retry: RetryPolicy,
}

impl CheckoutFlow {
    /// Creates a checkout flow over the given ledgers and gateway.
    #[must_use]
    pub fn new(
        inventory: Arc<InventoryLedger>,
        checkin: Arc<CheckInLedger>,
        gateway: Arc<dyn PaymentGateway>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inventory,
            checkin,
            gateway,
            retry,
        }
    }

    /// Completes the purchase for a held session: charges the buyer, then
    /// commits the hold and registers the minted tickets at the gate.
    ///
    /// Safe to retry after a crash between charge and commit: `commit` is
    /// idempotent and ticket registration tolerates replays of the same
    /// batch.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::Payment`] on decline (the hold is cancelled so the
    /// units return to sale); [`CheckoutError::Session`] if the hold
    /// expired first (a completed charge is refunded).
    pub async fn purchase(
        &self,
        session_id: SessionId,
        holder_name: &str,
    ) -> Result<CommittedOrder, CheckoutError> {
        let pricing = self.inventory.quote(session_id)?;
        let session = self
            .inventory
            .session(session_id)
            .ok_or(CommitError::SessionNotFound(session_id))?;

        let started = std::time::Instant::now();
        let charge = charge_with_retry(
            self.gateway.as_ref(),
            &self.retry,
            session_id,
            session.buyer,
            pricing.total,
        )
        .await;

        let transaction = match charge {
            Ok(transaction) => transaction,
            Err(error) => {
                engine_metrics::record_payment_failed(&error);
                tracing::info!(session = %session_id, %error, "payment failed, releasing hold");
                // Free the units for other buyers; an already-expired hold
                // has nothing left to release.
                if let Err(cancel_error) = self.inventory.cancel(session_id) {
                    tracing::debug!(session = %session_id, %cancel_error, "hold not cancelled");
                }
                return Err(CheckoutError::Payment(error));
            }
        };
        engine_metrics::record_payment_succeeded(
            transaction.amount.cents(),
            started.elapsed().as_secs_f64(),
        );

        let committed = match self.inventory.commit(session_id, holder_name) {
            Ok(committed) => committed,
            Err(error) => {
                // The hold lapsed while the provider was deciding; the
                // charge must not stand.
                tracing::warn!(session = %session_id, %error, "commit failed after charge, refunding");
                match self
                    .gateway
                    .refund(&transaction.transaction_id, transaction.amount)
                    .await
                {
                    Ok(refund_id) => {
                        engine_metrics::record_payment_refunded(transaction.amount.cents());
                        tracing::info!(session = %session_id, refund_id, "charge refunded");
                    }
                    Err(refund_error) => {
                        tracing::error!(
                            session = %session_id,
                            transaction = transaction.transaction_id,
                            %refund_error,
                            "refund failed, manual follow-up required"
                        );
                    }
                }
                return Err(CheckoutError::Session(error));
            }
        };

        self.checkin.register_batch(&committed.tickets)?;

        tracing::info!(
            session = %session_id,
            order = %committed.order.id,
            tickets = committed.tickets.len(),
            total = %committed.order.pricing.total,
            "purchase completed"
        );
        Ok(committed)
    }
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
