//! Background expiry sweep.
//!
//! Lazy expiry on touch keeps the ledger correct; the sweep keeps it
//! honest: abandoned holds are reclaimed within one interval so capacity
//! reported to other buyers doesn't stay blocked until someone touches the
//! tier.

use crate::inventory::InventoryLedger;
use gatehouse_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

/// Spawns the periodic expiry sweep over an inventory ledger.
///
/// The task ticks every `interval`, expires overdue holds, and exits
/// cleanly when [`SweeperHandle::shutdown`] is called.
#[must_use]
pub fn spawn_sweeper(
    inventory: Arc<InventoryLedger>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> SweeperHandle {
    let (shutdown, mut rx) = watch::channel(false);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a sweep doesn't race
        // application startup.
        ticker.tick().await;

        tracing::info!(interval_secs = interval.as_secs(), "expiry sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let expired = inventory.sweep_expired(clock.now());
                    if expired > 0 {
                        tracing::debug!(expired, "sweep pass complete");
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("expiry sweeper stopped");
    });

    SweeperHandle { shutdown, join }
}
