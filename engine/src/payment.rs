//! Payment gateway boundary.
//!
//! The engine treats the payment provider as an opaque external service:
//! it answers success or failure for a given session and amount, and that
//! answer, never chance, drives the commit/cancel decision. The provider
//! is called with no ledger lock held.
//!
//! Transient failures (timeouts, provider unavailable) are retried with
//! exponential backoff and jitter; declines are final.

use futures::future::BoxFuture;
use gatehouse_core::{BuyerId, Money, SessionId};
use std::time::Duration;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentError>;

/// Why a charge or refund failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The provider declined the charge
    #[error("payment declined: {reason}")]
    Declined {
        /// Provider-supplied decline reason
        reason: String,
    },

    /// The buyer's account cannot cover the amount
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The provider did not answer in time
    #[error("gateway timeout")]
    Timeout,

    /// The provider is temporarily unreachable
    #[error("gateway unavailable: {message}")]
    Unavailable {
        /// Transport-level detail
        message: String,
    },
}

impl PaymentError {
    /// Whether retrying the same request can possibly succeed.
    /// Declines are final; only transport-level failures are retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable { .. })
    }
}

/// A settled charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTransaction {
    /// Session the charge was taken for
    pub session_id: SessionId,
    /// Provider transaction id (used for refunds)
    pub transaction_id: String,
    /// Amount charged
    pub amount: Money,
}

/// Abstraction over payment processors (Stripe, mobile money, cards).
///
/// Methods return boxed futures so the trait stays object-safe and
/// implementations can be swapped behind `Arc<dyn PaymentGateway>`.
pub trait PaymentGateway: Send + Sync {
    /// Charges `amount` for a reservation session.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] on decline or transport failure.
    fn charge(
        &self,
        session_id: SessionId,
        buyer: BuyerId,
        amount: Money,
    ) -> BoxFuture<'_, GatewayResult<PaymentTransaction>>;

    /// Refunds a previously settled charge.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the refund fails.
    fn refund(&self, transaction_id: &str, amount: Money) -> BoxFuture<'_, GatewayResult<String>>;
}

/// Retry policy for transient gateway failures.
///
/// Exponential backoff with jitter; jitter spreads concurrent retries so a
/// recovering provider is not hit by a thundering herd.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Creates a policy with default settings: 3 attempts, 200 ms initial
    /// delay doubling up to 2 s.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }

    /// Set maximum attempts (including the first)
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the backoff cap
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Maximum attempts (including the first)
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff delay before retry number `attempt` (0-indexed), jittered
    /// into `[0.5, 1.0]` of the exponential value.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        #[allow(clippy::cast_possible_wrap)]
        let base_secs =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.0);
        Duration::from_secs_f64(capped_secs * jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Charges through the gateway, retrying transient failures per the policy.
///
/// # Errors
///
/// Returns the last [`PaymentError`] once attempts are exhausted, or the
/// decline immediately; declines are never retried.
pub async fn charge_with_retry(
    gateway: &dyn PaymentGateway,
    policy: &RetryPolicy,
    session_id: SessionId,
    buyer: BuyerId,
    amount: Money,
) -> GatewayResult<PaymentTransaction> {
    let mut attempt = 0;
    loop {
        match gateway.charge(session_id, buyer, amount).await {
            Ok(transaction) => return Ok(transaction),
            Err(error) if error.is_retryable() && attempt + 1 < policy.max_attempts() => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    session = %session_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    %error,
                    "transient gateway failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Development gateway: approves every charge after a short simulated
/// provider round-trip. Replace with a real integration in production.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway;

impl MockPaymentGateway {
    /// Creates the mock gateway
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> std::sync::Arc<dyn PaymentGateway> {
        std::sync::Arc::new(Self::new())
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn charge(
        &self,
        session_id: SessionId,
        buyer: BuyerId,
        amount: Money,
    ) -> BoxFuture<'_, GatewayResult<PaymentTransaction>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;

            let transaction_id = format!("mock_txn_{session_id}");
            tracing::info!(
                session = %session_id,
                %buyer,
                amount = amount.cents(),
                transaction_id,
                "mock payment approved"
            );
            Ok(PaymentTransaction {
                session_id,
                transaction_id,
                amount,
            })
        })
    }

    fn refund(&self, transaction_id: &str, amount: Money) -> BoxFuture<'_, GatewayResult<String>> {
        let refund_id = format!("mock_refund_{transaction_id}");
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            tracing::info!(refund_id, amount = amount.cents(), "mock refund approved");
            Ok(refund_id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declines_are_not_retryable() {
        assert!(!PaymentError::Declined {
            reason: "do not honor".to_owned()
        }
        .is_retryable());
        assert!(!PaymentError::InsufficientFunds.is_retryable());
        assert!(PaymentError::Timeout.is_retryable());
        assert!(PaymentError::Unavailable {
            message: "connection reset".to_owned()
        }
        .is_retryable());
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(400));

        // Jitter keeps each delay within [0.5, 1.0] of the exponential value
        let d0 = policy.delay_for_attempt(0);
        assert!(d0 >= Duration::from_millis(50) && d0 <= Duration::from_millis(100));

        let d4 = policy.delay_for_attempt(4);
        assert!(d4 <= Duration::from_millis(400), "capped at max_delay");
    }
}
