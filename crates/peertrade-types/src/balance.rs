//! Balance tracking types for the Peertrade ledger.
//!
//! Every user has, per currency, an `available` balance (usable for new
//! trades / withdrawals) and a `frozen` balance (reserved by active escrow
//! holds).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single balance entry for a (user, currency) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Balance {
    /// Available for new trades / withdrawal.
    pub available: Decimal,
    /// Reserved by locked escrow holds.
    pub frozen: Decimal,
}

impl Balance {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            frozen: Decimal::ZERO,
        }
    }

    /// Total balance (available + frozen).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.frozen
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.frozen.is_zero()
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::new()
    }
}

/// The outcome of an idempotent ledger operation.
///
/// Replays are not errors: a second call with the same `OpRef` reports
/// `Replayed` and leaves the ledger untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpOutcome {
    /// The operation was applied for the first time.
    Applied,
    /// The op-ref was seen before; the delta was not re-applied.
    Replayed,
}

impl OpOutcome {
    /// Whether the operation mutated the ledger on this call.
    #[must_use]
    pub fn is_applied(self) -> bool {
        self == Self::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_default_is_zero() {
        let entry = Balance::default();
        assert_eq!(entry.available, Decimal::ZERO);
        assert_eq!(entry.frozen, Decimal::ZERO);
        assert!(entry.is_zero());
    }

    #[test]
    fn balance_total() {
        let entry = Balance {
            available: Decimal::new(100, 0),
            frozen: Decimal::new(50, 0),
        };
        assert_eq!(entry.total(), Decimal::new(150, 0));
        assert!(!entry.is_zero());
    }

    #[test]
    fn op_outcome_applied() {
        assert!(OpOutcome::Applied.is_applied());
        assert!(!OpOutcome::Replayed.is_applied());
    }

    #[test]
    fn balance_serde_roundtrip() {
        let entry = Balance {
            available: Decimal::new(12345, 2), // 123.45
            frozen: Decimal::new(678, 1),      // 67.8
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: Balance = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
