//! Background expiry sweep.
//!
//! Periodically walks the trade table and expires PAYMENT_PENDING trades
//! whose deadline has passed. The sweep is a convenience wrapper around
//! [`TradeEngine::expire_due`], which is safe to call from anywhere at any
//! time.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::engine::TradeEngine;

/// Run the expiry sweep until the task is cancelled.
///
/// Each tick calls [`TradeEngine::expire_due`] with the current wall-clock
/// time. Intended to be spawned on the runtime:
///
/// ```ignore
/// tokio::spawn(run_expiry_sweep(engine, Duration::from_millis(cfg.sweep_interval_ms)));
/// ```
pub async fn run_expiry_sweep(engine: Arc<TradeEngine>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let expired = engine.expire_due(Utc::now());
        if expired > 0 {
            tracing::info!(expired, "expiry sweep pass");
        }
    }
}
