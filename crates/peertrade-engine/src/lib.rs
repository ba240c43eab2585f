//! # peertrade-engine
//!
//! The **Trade State Machine**: offers, trade lifecycle transitions,
//! payment deadlines, and the background expiry sweep.
//!
//! A trade moves PAYMENT_PENDING → PAYMENT_MADE → COMPLETED on the happy
//! path, with DISPUTED, CANCELLED, and EXPIRED branches. Every mutation is
//! serialized per trade, and escrow/ledger effects commit atomically with
//! the status change. Terminal transitions fire [`TradeHooks`], the seam
//! where dispute queues, ratings, and notifications attach.

pub mod engine;
pub mod hooks;
pub mod offer_book;
pub mod sweep;

pub use engine::TradeEngine;
pub use hooks::{NoopHooks, TradeHooks};
pub use offer_book::{OfferBook, OfferSnapshot};
pub use sweep::run_expiry_sweep;

#[cfg(any(test, feature = "test-helpers"))]
pub use hooks::{HookEvent, RecordingHooks};
