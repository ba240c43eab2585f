//! # peertrade-escrow
//!
//! The **Escrow Engine**: holds the seller's asset for the duration of a
//! trade and exposes lock, release-to-buyer, and refund-to-seller.
//!
//! Each hold flips state exactly once (LOCKED → RELEASED xor REFUNDED) via
//! a compare-and-set under the hold table lock; ledger effects happen in
//! the same critical section, so a lost race observes
//! `HoldAlreadyFinalized` instead of a double spend.

pub mod engine;

pub use engine::EscrowEngine;
