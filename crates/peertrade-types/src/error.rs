//! Error types for the Peertrade trading core.
//!
//! All errors use the `PT_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Offer errors
//! - 2xx: Ledger / balance errors
//! - 3xx: Escrow errors
//! - 4xx: Trade lifecycle errors
//! - 5xx: Payment / provider errors
//! - 9xx: General / internal errors
//!
//! Idempotent replays are deliberately **not** errors: the ledger returns
//! [`crate::OpOutcome::Replayed`] with the prior result instead.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{HoldId, HoldState, OfferId, TradeId, TradeStatus, UserId};

/// Central error enum for all Peertrade operations.
#[derive(Debug, Error)]
pub enum PeertradeError {
    // =================================================================
    // Offer Errors (1xx)
    // =================================================================
    /// The requested offer was not found.
    #[error("PT_ERR_100: Offer not found: {0}")]
    OfferNotFound(OfferId),

    /// The offer is closed or cannot cover the requested amount.
    #[error("PT_ERR_101: Offer unavailable: {reason}")]
    OfferUnavailable { reason: String },

    /// The offer failed validation (bad amount, bad rate, self-trade, etc.).
    #[error("PT_ERR_102: Invalid offer: {reason}")]
    InvalidOffer { reason: String },

    // =================================================================
    // Ledger / Balance Errors (2xx)
    // =================================================================
    /// Not enough available balance to perform the operation.
    #[error("PT_ERR_200: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    /// Not enough frozen balance to unfreeze or consume.
    #[error("PT_ERR_201: Insufficient frozen balance")]
    InsufficientFrozen,

    /// Supply conservation invariant violated — critical safety alert.
    #[error("PT_ERR_202: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Escrow Errors (3xx)
    // =================================================================
    /// The seller's free asset balance cannot cover the escrow lock.
    #[error("PT_ERR_300: Insufficient escrow funds: need {needed}, have {available}")]
    InsufficientEscrowFunds { needed: Decimal, available: Decimal },

    /// The requested escrow hold was not found.
    #[error("PT_ERR_301: Escrow hold not found: {0}")]
    HoldNotFound(HoldId),

    /// The hold has already been released or refunded; exactly one
    /// terminal transition is allowed per hold.
    #[error("PT_ERR_302: Escrow hold {hold_id} already finalized as {state}")]
    HoldAlreadyFinalized { hold_id: HoldId, state: HoldState },

    // =================================================================
    // Trade Lifecycle Errors (4xx)
    // =================================================================
    /// The requested trade was not found.
    #[error("PT_ERR_400: Trade not found: {0}")]
    TradeNotFound(TradeId),

    /// The requested transition is not legal from the trade's current status.
    #[error("PT_ERR_401: Invalid state for {action}: trade {trade_id} is {status}")]
    InvalidState {
        trade_id: TradeId,
        status: TradeStatus,
        action: &'static str,
    },

    /// The actor is not permitted to perform this action on this trade.
    #[error("PT_ERR_402: Unauthorized: user {user_id} may not {action}")]
    Unauthorized {
        user_id: UserId,
        action: &'static str,
    },

    /// The payment deadline has passed; the caller should route to `expire`.
    #[error("PT_ERR_403: Payment deadline exceeded for trade {0}")]
    DeadlineExceeded(TradeId),

    // =================================================================
    // Payment / Provider Errors (5xx)
    // =================================================================
    /// No payment transaction exists for the given provider reference.
    #[error("PT_ERR_500: Payment not found for reference {0}")]
    PaymentNotFound(String),

    /// The external payment gateway timed out or errored. The payment
    /// transaction stays pending — the provider may still have succeeded.
    #[error("PT_ERR_501: Payment provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },

    /// The provider reported an amount that differs from the one initialized.
    #[error("PT_ERR_502: Provider amount mismatch: expected {expected_minor} minor units, got {reported_minor}")]
    ProviderAmountMismatch {
        expected_minor: u64,
        reported_minor: u64,
    },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("PT_ERR_900: Internal error: {0}")]
    Internal(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeertradeError>;
