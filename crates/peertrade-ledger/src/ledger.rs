//! The ledger store: durable per-(user, currency) balances with atomic,
//! idempotent mutations.
//!
//! Every mutating operation carries an [`OpRef`]. Applied op-refs are
//! journaled; a replay with the same reference returns
//! [`OpOutcome::Replayed`] without re-applying the delta. Failed operations
//! are not journaled — they had no effect, so a corrected retry under the
//! same reference may still apply.
//!
//! All mutations run inside a single critical section, so each operation
//! (including the two-account `transfer`) either fully applies or leaves
//! the ledger unchanged. Within `transfer` the two accounts are touched in
//! ascending key order.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use peertrade_types::{
    Balance, Currency, OpOutcome, OpRef, PeertradeError, Result, UserId,
};
use rust_decimal::Decimal;

use crate::conservation::SupplyTracker;

/// Account key: one balance entry per (user, currency) pair.
type AccountKey = (UserId, Currency);

struct LedgerInner {
    accounts: HashMap<AccountKey, Balance>,
    /// Op-refs of successfully applied operations.
    journal: HashSet<OpRef>,
    /// Expected supply per currency (deposits − withdrawals).
    supply: SupplyTracker,
}

/// The source of truth for all balance state.
///
/// Thread-safe: operations take `&self` and serialize on an internal lock,
/// so each call is atomic with respect to every other. The escrow engine
/// and trade state machine call into it for every settlement leg.
pub struct Ledger {
    inner: Mutex<LedgerInner>,
}

impl Ledger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LedgerInner {
                accounts: HashMap::new(),
                journal: HashSet::new(),
                supply: SupplyTracker::new(),
            }),
        }
    }

    /// External value entering the ledger (provider deposit, asset funding,
    /// or the out-of-band fiat leg of a completed trade). Increases the
    /// expected supply.
    pub fn deposit(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> OpOutcome {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return OpOutcome::Replayed;
        }
        inner.accounts.entry((user_id, currency)).or_default().available += amount;
        inner.supply.record_deposit(currency, amount);
        inner.journal.insert(op_ref);
        OpOutcome::Applied
    }

    /// External value leaving the ledger. Decreases the expected supply.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the available balance cannot cover it;
    /// no partial effect is applied.
    pub fn withdraw(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        Self::debit_account(&mut inner.accounts, user_id, currency, amount)?;
        inner.supply.record_withdrawal(currency, amount);
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Internal credit (the receiving leg of a settlement). Supply-neutral:
    /// always paired with a debit or frozen consumption under the same
    /// atomic unit.
    pub fn credit(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> OpOutcome {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return OpOutcome::Replayed;
        }
        inner.accounts.entry((user_id, currency)).or_default().available += amount;
        inner.journal.insert(op_ref);
        OpOutcome::Applied
    }

    /// Internal debit.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the available balance would go
    /// negative; balances never do.
    pub fn debit(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        Self::debit_account(&mut inner.accounts, user_id, currency, amount)?;
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Move available balance between two users as one atomic unit.
    ///
    /// The debit is checked before anything is written; the two accounts
    /// are then touched in ascending key order.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if `from` cannot cover the amount.
    pub fn transfer(
        &self,
        from: UserId,
        to: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        let available = inner
            .accounts
            .get(&(from, currency))
            .map_or(Decimal::ZERO, |b| b.available);
        if available < amount {
            return Err(PeertradeError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        let mut keys = [(from, currency), (to, currency)];
        keys.sort_unstable();
        for key in keys {
            let entry = inner.accounts.entry(key).or_default();
            if key.0 == from {
                entry.available -= amount;
            } else {
                entry.available += amount;
            }
        }
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Reserve available balance for an escrow hold (available → frozen).
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if available < amount.
    pub fn freeze(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        let entry = inner.accounts.entry((user_id, currency)).or_default();
        if entry.available < amount {
            let available = entry.available;
            return Err(PeertradeError::InsufficientFunds {
                needed: amount,
                available,
            });
        }
        entry.available -= amount;
        entry.frozen += amount;
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Return reserved balance to the owner (frozen → available). Used when
    /// an escrow hold is refunded.
    ///
    /// # Errors
    /// Returns `InsufficientFrozen` if frozen < amount.
    pub fn unfreeze(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        let entry = inner
            .accounts
            .get_mut(&(user_id, currency))
            .ok_or(PeertradeError::InsufficientFrozen)?;
        if entry.frozen < amount {
            return Err(PeertradeError::InsufficientFrozen);
        }
        entry.frozen -= amount;
        entry.available += amount;
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Consume reserved balance (for settlement). Frozen decreases, nothing
    /// comes back to the owner — the counterparty is credited separately
    /// within the same atomic unit at the call site.
    ///
    /// # Errors
    /// Returns `InsufficientFrozen` if frozen < amount.
    pub fn consume_frozen(
        &self,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        let entry = inner
            .accounts
            .get_mut(&(user_id, currency))
            .ok_or(PeertradeError::InsufficientFrozen)?;
        if entry.frozen < amount {
            return Err(PeertradeError::InsufficientFrozen);
        }
        entry.frozen -= amount;
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Settle reserved balance to a counterparty: `from`'s frozen balance
    /// decreases and `to`'s available balance increases as one atomic unit
    /// inside a single critical section, so a concurrent supply check can
    /// never observe the value in flight. The two accounts are touched in
    /// ascending key order.
    ///
    /// # Errors
    /// Returns `InsufficientFrozen` if `from`'s frozen balance cannot cover
    /// the amount; no partial effect is applied.
    pub fn settle_frozen_to(
        &self,
        from: UserId,
        to: UserId,
        currency: Currency,
        amount: Decimal,
        op_ref: OpRef,
    ) -> Result<OpOutcome> {
        let mut inner = self.inner.lock();
        if inner.journal.contains(&op_ref) {
            return Ok(OpOutcome::Replayed);
        }
        let frozen = inner
            .accounts
            .get(&(from, currency))
            .map_or(Decimal::ZERO, |b| b.frozen);
        if frozen < amount {
            return Err(PeertradeError::InsufficientFrozen);
        }
        let mut keys = [(from, currency), (to, currency)];
        keys.sort_unstable();
        for key in keys {
            let entry = inner.accounts.entry(key).or_default();
            if key.0 == from {
                entry.frozen -= amount;
            } else {
                entry.available += amount;
            }
        }
        inner.journal.insert(op_ref);
        Ok(OpOutcome::Applied)
    }

    /// Get the balance for a (user, currency) pair.
    #[must_use]
    pub fn balance(&self, user_id: UserId, currency: Currency) -> Balance {
        self.inner
            .lock()
            .accounts
            .get(&(user_id, currency))
            .cloned()
            .unwrap_or_default()
    }

    /// Total supply of a currency: sum of all users' available + frozen.
    #[must_use]
    pub fn total_supply(&self, currency: Currency) -> Decimal {
        self.inner
            .lock()
            .accounts
            .iter()
            .filter(|((_, c), _)| *c == currency)
            .map(|(_, entry)| entry.total())
            .sum()
    }

    /// Verify the supply conservation invariant for a currency:
    /// Σ(available + frozen) must equal deposits − withdrawals.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if actual ≠ expected.
    pub fn verify_supply(&self, currency: Currency) -> Result<()> {
        let inner = self.inner.lock();
        let actual: Decimal = inner
            .accounts
            .iter()
            .filter(|((_, c), _)| *c == currency)
            .map(|(_, entry)| entry.total())
            .sum();
        inner.supply.verify(currency, actual).inspect_err(|err| {
            tracing::error!(%currency, %err, "supply invariant violated");
        })
    }

    /// Whether an op-ref has already been applied.
    #[must_use]
    pub fn is_applied(&self, op_ref: &OpRef) -> bool {
        self.inner.lock().journal.contains(op_ref)
    }

    fn debit_account(
        accounts: &mut HashMap<AccountKey, Balance>,
        user_id: UserId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<()> {
        let entry = accounts.get_mut(&(user_id, currency)).ok_or(
            PeertradeError::InsufficientFunds {
                needed: amount,
                available: Decimal::ZERO,
            },
        )?;
        if entry.available < amount {
            return Err(PeertradeError::InsufficientFunds {
                needed: amount,
                available: entry.available,
            });
        }
        entry.available -= amount;
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
