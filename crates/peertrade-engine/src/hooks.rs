//! Terminal-state hooks — the seam to the dispute/rating adapter.
//!
//! The trade state machine fires these when a trade reaches a terminal
//! status or a dispute opens. Implementations drive the external rating
//! prompt, notifications, and the admin dispute queue; the engine itself
//! makes no assumptions about them beyond `Send + Sync`.
//!
//! Hooks run after the state transition has committed. They must not call
//! back into the engine for the same trade.

use peertrade_types::Trade;

/// Callbacks invoked by the trade state machine.
pub trait TradeHooks: Send + Sync {
    /// The trade completed: escrow released, fiat leg settled.
    fn on_completed(&self, _trade: &Trade) {}

    /// The trade was cancelled (user action or dispute resolved to refund).
    fn on_cancelled(&self, _trade: &Trade) {}

    /// The payment deadline passed and the sweep refunded escrow.
    fn on_expired(&self, _trade: &Trade) {}

    /// A party raised a dispute; escrow stays locked pending resolution.
    fn on_dispute_opened(&self, _trade: &Trade) {}
}

/// Production default: no external adapter wired.
pub struct NoopHooks;

impl TradeHooks for NoopHooks {}

/// Records every hook invocation. For tests.
#[cfg(any(test, feature = "test-helpers"))]
pub struct RecordingHooks {
    events: parking_lot::Mutex<Vec<HookEvent>>,
}

/// One recorded hook invocation.
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    Completed(peertrade_types::TradeId),
    Cancelled(peertrade_types::TradeId),
    Expired(peertrade_types::TradeId),
    DisputeOpened(peertrade_types::TradeId),
}

#[cfg(any(test, feature = "test-helpers"))]
impl RecordingHooks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// All events recorded so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Default for RecordingHooks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl TradeHooks for RecordingHooks {
    fn on_completed(&self, trade: &Trade) {
        self.events.lock().push(HookEvent::Completed(trade.id));
    }

    fn on_cancelled(&self, trade: &Trade) {
        self.events.lock().push(HookEvent::Cancelled(trade.id));
    }

    fn on_expired(&self, trade: &Trade) {
        self.events.lock().push(HookEvent::Expired(trade.id));
    }

    fn on_dispute_opened(&self, trade: &Trade) {
        self.events.lock().push(HookEvent::DisputeOpened(trade.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peertrade_types::UserId;
    use rust_decimal::Decimal;

    #[test]
    fn recording_hooks_capture_order() {
        let hooks = RecordingHooks::new();
        let trade = Trade::dummy(
            UserId::new(),
            UserId::new(),
            Decimal::new(10, 0),
            Decimal::new(1500, 0),
        );
        hooks.on_dispute_opened(&trade);
        hooks.on_completed(&trade);
        assert_eq!(
            hooks.events(),
            vec![
                HookEvent::DisputeOpened(trade.id),
                HookEvent::Completed(trade.id)
            ]
        );
    }

    #[test]
    fn noop_hooks_do_nothing() {
        let hooks = NoopHooks;
        let trade = Trade::dummy(
            UserId::new(),
            UserId::new(),
            Decimal::ONE,
            Decimal::new(1500, 0),
        );
        // Just exercising the default bodies.
        hooks.on_completed(&trade);
        hooks.on_cancelled(&trade);
        hooks.on_expired(&trade);
        hooks.on_dispute_opened(&trade);
    }
}
