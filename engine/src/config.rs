//! Configuration for the Gatehouse engine.
//!
//! Loaded from environment variables with sensible defaults.

use crate::payment::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// How long a reservation hold lives before expiring (seconds)
    pub reservation_ttl_secs: u64,
    /// Interval between background expiry sweeps (seconds)
    pub sweep_interval_secs: u64,
    /// Platform service fee applied to order subtotals (basis points)
    pub service_fee_bps: u32,
    /// Payment gateway retry attempts for transient failures
    pub gateway_max_attempts: u32,
    /// Initial gateway retry backoff (milliseconds)
    pub gateway_initial_backoff_ms: u64,
    /// Gateway retry backoff cap (milliseconds)
    pub gateway_max_backoff_ms: u64,
    /// Log filter (e.g. `info`, `gatehouse_engine=debug`)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            reservation_ttl_secs: env::var("GATEHOUSE_RESERVATION_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(600), // 10 minutes
            sweep_interval_secs: env::var("GATEHOUSE_SWEEP_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            service_fee_bps: env::var("GATEHOUSE_SERVICE_FEE_BPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(500), // 5%
            gateway_max_attempts: env::var("GATEHOUSE_GATEWAY_MAX_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            gateway_initial_backoff_ms: env::var("GATEHOUSE_GATEWAY_INITIAL_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200),
            gateway_max_backoff_ms: env::var("GATEHOUSE_GATEWAY_MAX_BACKOFF_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2_000),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Reservation TTL as a chrono duration. Out-of-range values fall back
    /// to the 10-minute default.
    #[must_use]
    pub fn reservation_ttl(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(i64::try_from(self.reservation_ttl_secs).unwrap_or(600))
            .unwrap_or_else(|| chrono::Duration::seconds(600))
    }

    /// Sweep interval as a std duration.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Gateway retry policy derived from the configured backoff.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.gateway_max_attempts)
            .with_initial_delay(Duration::from_millis(self.gateway_initial_backoff_ms))
            .with_max_delay(Duration::from_millis(self.gateway_max_backoff_ms))
    }

    /// Initializes the global tracing subscriber from the configured log
    /// filter. Call once at startup.
    pub fn init_tracing(&self) {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_level.clone()));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_fields() {
        // from_env falls back to defaults when variables are unset
        let config = Config {
            reservation_ttl_secs: 600,
            sweep_interval_secs: 30,
            service_fee_bps: 500,
            gateway_max_attempts: 3,
            gateway_initial_backoff_ms: 200,
            gateway_max_backoff_ms: 2_000,
            log_level: "info".to_string(),
        };
        assert_eq!(config.reservation_ttl(), chrono::Duration::minutes(10));
        assert_eq!(config.sweep_interval(), Duration::from_secs(30));
        assert_eq!(config.retry_policy().max_attempts(), 3);
    }
}
