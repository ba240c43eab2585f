//! Escrow engine — locks, releases, and refunds per-trade holds.
//!
//! The engine atomically freezes the seller's asset balance and creates an
//! [`EscrowHold`] in LOCKED state. Release and refund are compare-and-set
//! transitions performed while the hold table lock is held: a concurrent
//! double-release or double-refund fails with `HoldAlreadyFinalized` rather
//! than silently succeeding.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use peertrade_types::{
    Currency, EscrowHold, HoldId, HoldState, OpRef, PeertradeError, Result, TradeId, TradePhase,
    UserId,
};
use peertrade_ledger::Ledger;
use rust_decimal::Decimal;

/// Manages the escrow hold lifecycle: locking, releasing, refunding, lookup.
///
/// Ledger effects and the hold state flip happen under the hold table lock,
/// so exactly one of {release, refund} can ever succeed per hold.
pub struct EscrowEngine {
    /// All holds indexed by their ID.
    holds: Mutex<HashMap<HoldId, EscrowHold>>,
}

impl EscrowEngine {
    /// Create a new escrow engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            holds: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically freeze the seller's asset and create a LOCKED hold.
    ///
    /// If the freeze fails (insufficient balance), no hold is created — the
    /// caller never observes a partially-created trade.
    ///
    /// # Errors
    /// Returns `InsufficientEscrowFunds` if the seller's free asset balance
    /// cannot cover the amount.
    pub fn lock(
        &self,
        ledger: &Ledger,
        trade_id: TradeId,
        seller_id: UserId,
        amount: Decimal,
    ) -> Result<HoldId> {
        let mut holds = self.holds.lock();

        ledger
            .freeze(
                seller_id,
                Currency::Usdt,
                amount,
                OpRef::trade(trade_id, TradePhase::Lock),
            )
            .map_err(|err| match err {
                PeertradeError::InsufficientFunds { needed, available } => {
                    PeertradeError::InsufficientEscrowFunds { needed, available }
                }
                other => other,
            })?;

        let hold = EscrowHold::new(trade_id, seller_id, Currency::Usdt, amount);
        let hold_id = hold.id;
        holds.insert(hold_id, hold);

        tracing::debug!(%hold_id, %trade_id, %seller_id, %amount, "escrow locked");
        Ok(hold_id)
    }

    /// Release a hold to the buyer: the seller's reserved asset moves to the
    /// buyer's available balance as one ledger operation, then the hold
    /// flips LOCKED → RELEASED.
    ///
    /// # Errors
    /// - `HoldNotFound` if the hold doesn't exist
    /// - `HoldAlreadyFinalized` if the hold was already released or refunded
    pub fn release(&self, ledger: &Ledger, hold_id: HoldId, buyer_id: UserId) -> Result<()> {
        let mut holds = self.holds.lock();
        let hold = holds
            .get_mut(&hold_id)
            .ok_or(PeertradeError::HoldNotFound(hold_id))?;

        if !hold.state.can_transition_to(HoldState::Released) {
            return Err(PeertradeError::HoldAlreadyFinalized {
                hold_id,
                state: hold.state,
            });
        }

        ledger.settle_frozen_to(
            hold.seller_id,
            buyer_id,
            hold.currency,
            hold.amount,
            OpRef::trade(hold.trade_id, TradePhase::Release),
        )?;

        hold.state = HoldState::Released;
        hold.finalized_at = Some(Utc::now());
        tracing::debug!(%hold_id, %buyer_id, "escrow released to buyer");
        Ok(())
    }

    /// Refund a hold to the seller: the reserved asset is unfrozen, then the
    /// hold flips LOCKED → REFUNDED.
    ///
    /// # Errors
    /// - `HoldNotFound` if the hold doesn't exist
    /// - `HoldAlreadyFinalized` if the hold was already released or refunded
    pub fn refund(&self, ledger: &Ledger, hold_id: HoldId) -> Result<()> {
        let mut holds = self.holds.lock();
        let hold = holds
            .get_mut(&hold_id)
            .ok_or(PeertradeError::HoldNotFound(hold_id))?;

        if !hold.state.can_transition_to(HoldState::Refunded) {
            return Err(PeertradeError::HoldAlreadyFinalized {
                hold_id,
                state: hold.state,
            });
        }

        ledger.unfreeze(
            hold.seller_id,
            hold.currency,
            hold.amount,
            OpRef::trade(hold.trade_id, TradePhase::Refund),
        )?;

        hold.state = HoldState::Refunded;
        hold.finalized_at = Some(Utc::now());
        tracing::debug!(%hold_id, seller_id = %hold.seller_id, "escrow refunded to seller");
        Ok(())
    }

    /// Look up a hold by ID.
    #[must_use]
    pub fn get(&self, hold_id: HoldId) -> Option<EscrowHold> {
        self.holds.lock().get(&hold_id).cloned()
    }

    /// Current state of a hold, if it exists.
    #[must_use]
    pub fn state(&self, hold_id: HoldId) -> Option<HoldState> {
        self.holds.lock().get(&hold_id).map(|h| h.state)
    }

    /// Sum of all LOCKED hold amounts for a currency. Always equals the sum
    /// of frozen balances in the ledger.
    #[must_use]
    pub fn total_locked(&self, currency: Currency) -> Decimal {
        self.holds
            .lock()
            .values()
            .filter(|h| h.is_locked() && h.currency == currency)
            .map(|h| h.amount)
            .sum()
    }

    /// Number of holds tracked (all states).
    #[must_use]
    pub fn count(&self) -> usize {
        self.holds.lock().len()
    }
}

impl Default for EscrowEngine {
    fn default() -> Self {
        Self::new()
    }
}
