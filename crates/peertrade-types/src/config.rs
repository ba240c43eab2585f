//! Configuration types for the Peertrade engine and payment reconciliation.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Configuration for the trade state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minutes the buyer has to mark payment made after trade creation.
    pub payment_window_mins: i64,
    /// Interval between expiry sweep passes, in milliseconds.
    pub sweep_interval_ms: u64,
}

impl EngineConfig {
    /// The payment window as a chrono duration.
    #[must_use]
    pub fn payment_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.payment_window_mins)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payment_window_mins: constants::DEFAULT_PAYMENT_WINDOW_MINS,
            sweep_interval_ms: constants::DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

/// Configuration for calls to the external payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Timeout for a single provider call, in milliseconds.
    pub call_timeout_ms: u64,
    /// Maximum attempts per logical call (initial try + retries).
    pub max_attempts: u32,
    /// Backoff between retries, in milliseconds.
    pub retry_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: constants::DEFAULT_PROVIDER_TIMEOUT_MS,
            max_attempts: constants::DEFAULT_PROVIDER_MAX_ATTEMPTS,
            retry_backoff_ms: constants::DEFAULT_PROVIDER_BACKOFF_MS,
        }
    }
}
