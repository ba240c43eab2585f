//! System-wide constants for the Peertrade trading core.

/// Minor units per major unit of fiat (kobo per naira).
pub const MINOR_UNITS_PER_MAJOR: u64 = 100;

/// Default payment window: the buyer must mark payment made within this
/// many minutes of trade creation.
pub const DEFAULT_PAYMENT_WINDOW_MINS: i64 = 30;

/// Default interval between expiry sweep passes, in milliseconds.
pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Default timeout for a single payment-provider call, in milliseconds.
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5_000;

/// Default maximum attempts per provider call (initial try + retries).
pub const DEFAULT_PROVIDER_MAX_ATTEMPTS: u32 = 3;

/// Default backoff between provider retries, in milliseconds.
pub const DEFAULT_PROVIDER_BACKOFF_MS: u64 = 500;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Peertrade";
