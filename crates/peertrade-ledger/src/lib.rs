//! # peertrade-ledger
//!
//! The **Ledger Store**: durable per-(user, currency) balances with atomic
//! credit/debit operations, available/frozen accounting for escrow, and an
//! op-ref idempotency journal.
//!
//! ## Guarantees
//!
//! 1. Every operation is atomic: it fully applies or leaves the ledger
//!    unchanged.
//! 2. Every operation is idempotent per [`peertrade_types::OpRef`]:
//!    replays report `Replayed` and apply no delta.
//! 3. Balances never go negative; violating calls fail with
//!    `InsufficientFunds` and no partial effect.
//! 4. Supply is conserved: Σ(available + frozen) per currency always equals
//!    deposits − withdrawals.

pub mod conservation;
pub mod ledger;

pub use conservation::SupplyTracker;
pub use ledger::Ledger;
