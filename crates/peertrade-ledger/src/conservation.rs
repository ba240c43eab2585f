//! Supply conservation invariant tracker.
//!
//! Mathematical invariant enforced over the ledger:
//! ```text
//! ∀ currency: Σ(available + frozen) == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Trade operations (escrow lock/release/refund, settlement transfers) move
//! value between users and between available/frozen — they never create or
//! destroy it. If this invariant ever breaks, something has gone
//! catastrophically wrong and the violation surfaces as a hard error.

use std::collections::HashMap;

use peertrade_types::{Currency, PeertradeError, Result};
use rust_decimal::Decimal;

/// Tracks per-currency expected supply (deposits − withdrawals).
#[derive(Debug, Default)]
pub struct SupplyTracker {
    /// Total deposits per currency since genesis.
    deposits: HashMap<Currency, Decimal>,
    /// Total withdrawals per currency since genesis.
    withdrawals: HashMap<Currency, Decimal>,
}

impl SupplyTracker {
    /// Create a new supply tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit.
    pub fn record_deposit(&mut self, currency: Currency, amount: Decimal) {
        *self.deposits.entry(currency).or_insert(Decimal::ZERO) += amount;
    }

    /// Record a withdrawal.
    pub fn record_withdrawal(&mut self, currency: Currency, amount: Decimal) {
        *self.withdrawals.entry(currency).or_insert(Decimal::ZERO) += amount;
    }

    /// Expected total supply for a currency: deposits − withdrawals.
    #[must_use]
    pub fn expected_supply(&self, currency: Currency) -> Decimal {
        let deposited = self.deposits.get(&currency).copied().unwrap_or(Decimal::ZERO);
        let withdrawn = self
            .withdrawals
            .get(&currency)
            .copied()
            .unwrap_or(Decimal::ZERO);
        deposited - withdrawn
    }

    /// Verify that the actual supply (sum of all user balances) matches the
    /// expected supply for a currency.
    ///
    /// # Errors
    /// Returns [`PeertradeError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, currency: Currency, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(currency);
        if actual_supply != expected {
            return Err(PeertradeError::SupplyInvariantViolation {
                reason: format!(
                    "{currency}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.deposits.get(&currency).copied().unwrap_or(Decimal::ZERO),
                    self.withdrawals
                        .get(&currency)
                        .copied()
                        .unwrap_or(Decimal::ZERO),
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let tracker = SupplyTracker::new();
        assert_eq!(tracker.expected_supply(Currency::Usdt), Decimal::ZERO);
        assert!(tracker.verify(Currency::Usdt, Decimal::ZERO).is_ok());
    }

    #[test]
    fn deposits_increase_expected() {
        let mut tracker = SupplyTracker::new();
        tracker.record_deposit(Currency::Ngn, Decimal::new(1000, 0));
        tracker.record_deposit(Currency::Ngn, Decimal::new(500, 0));
        assert_eq!(tracker.expected_supply(Currency::Ngn), Decimal::new(1500, 0));
    }

    #[test]
    fn withdrawals_decrease_expected() {
        let mut tracker = SupplyTracker::new();
        tracker.record_deposit(Currency::Ngn, Decimal::new(1000, 0));
        tracker.record_withdrawal(Currency::Ngn, Decimal::new(300, 0));
        assert_eq!(tracker.expected_supply(Currency::Ngn), Decimal::new(700, 0));
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut tracker = SupplyTracker::new();
        tracker.record_deposit(Currency::Usdt, Decimal::new(10, 0));
        let err = tracker.verify(Currency::Usdt, Decimal::new(11, 0)).unwrap_err();
        assert!(matches!(
            err,
            PeertradeError::SupplyInvariantViolation { .. }
        ));
    }

    #[test]
    fn currencies_tracked_independently() {
        let mut tracker = SupplyTracker::new();
        tracker.record_deposit(Currency::Usdt, Decimal::new(5, 0));
        tracker.record_deposit(Currency::Ngn, Decimal::new(50_000, 0));
        assert!(tracker.verify(Currency::Usdt, Decimal::new(5, 0)).is_ok());
        assert!(tracker.verify(Currency::Ngn, Decimal::new(50_000, 0)).is_ok());
    }
}
