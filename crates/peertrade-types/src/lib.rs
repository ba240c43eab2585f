//! # peertrade-types
//!
//! Shared types, errors, and configuration for the **Peertrade** escrowed
//! trading core.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`OfferId`], [`TradeId`], [`HoldId`], [`PaymentId`], [`OpRef`], [`ProviderRef`]
//! - **Money**: [`Currency`], exact minor/major-unit conversions
//! - **Offer model**: [`Offer`], [`OfferSide`], [`OfferStatus`]
//! - **Trade model**: [`Trade`], [`TradeStatus`], [`TradeRole`], [`DisputeResolution`]
//! - **Escrow model**: [`EscrowHold`], [`HoldState`]
//! - **Payment model**: [`PaymentTransaction`], [`PaymentKind`], [`PaymentStatus`]
//! - **Balance model**: [`Balance`], [`OpOutcome`]
//! - **Configuration**: [`EngineConfig`], [`ProviderConfig`]
//! - **Errors**: [`PeertradeError`] with `PT_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod hold;
pub mod ids;
pub mod money;
pub mod offer;
pub mod payment;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use peertrade_types::{Trade, TradeStatus, EscrowHold, Ledger, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use hold::*;
pub use ids::*;
pub use money::*;
pub use offer::*;
pub use payment::*;
pub use trade::*;

// Constants are accessed via `peertrade_types::constants::FOO`
// (not re-exported to avoid name collisions).
