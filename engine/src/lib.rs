//! # Gatehouse Engine
//!
//! Concurrent ledgers for ticket inventory reservation and gate check-in.
//!
//! The engine guarantees that a ticket is sold at most once and admitted
//! exactly once, under concurrent purchase attempts and concurrent scanner
//! terminals (online or offline):
//!
//! ```text
//! Checkout flow:
//! ┌──────────┐ reserve ┌─────────────────┐ charge  ┌─────────────────┐
//! │ Checkout │────────▶│ InventoryLedger │ (no     │ PaymentGateway  │
//! │    UI    │         │  (per-tier)     │  lock)  │   (external)    │
//! └──────────┘         └─────────────────┘────────▶└─────────────────┘
//!                               │ commit: held → sold, mint tickets
//!                               ▼
//!                      ┌─────────────────┐
//!                      │  CheckInLedger  │◀── validate / reconcile
//!                      │ (per-scan-code) │    from scanner terminals
//!                      └─────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! Both ledgers shard their state per key (tier id, scan code): an outer
//! read-write map hands out `Arc<Mutex<_>>` handles, and every mutation runs
//! under the per-key mutex. There is no global lock: contention on one
//! tier never slows another, and scans of different codes are unordered.
//! Payment is decided entirely outside the ledger locks; `commit` only
//! applies the already-decided outcome.
//!
//! ## Expiry
//!
//! Reservation holds carry a TTL. Expiry is enforced lazily on every touch
//! (a late `commit` fails rather than silently re-extending the hold) and
//! eventually by the background [`sweeper`], which reclaims abandoned
//! capacity within one sweep interval.

pub mod checkin_ledger;
pub mod checkout;
pub mod config;
pub mod inventory;
pub mod metrics;
pub mod payment;
pub mod reporting;
pub mod sweeper;
pub mod terminal;

pub use checkin_ledger::{CheckInLedger, ReconcileOutcome};
pub use checkout::{CheckoutError, CheckoutFlow};
pub use config::Config;
pub use inventory::{CommittedOrder, InventoryLedger};
pub use payment::{
    MockPaymentGateway, PaymentError, PaymentGateway, PaymentTransaction, RetryPolicy,
};
pub use reporting::{EventCheckInReport, TierSalesReport};
pub use sweeper::{spawn_sweeper, SweeperHandle};
pub use terminal::{OfflineScan, ProvisionalOutcome, ScannerTerminal, TicketSnapshot};
