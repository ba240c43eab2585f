//! Offer types for the Peertrade marketplace.
//!
//! An [`Offer`] advertises intent to buy or sell the asset at a fixed rate
//! via a named fiat payment method. Trades consume an offer's remaining
//! amount; the amount and rate are immutable once posted — trades carry a
//! snapshot of the rate at creation time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OfferId, UserId};

/// Fiat payment method label (e.g. "bank_transfer").
pub type PaymentMethod = String;

/// Which side of the market the offer owner is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferSide {
    /// The owner wants to buy the asset (pays fiat).
    Buy,
    /// The owner wants to sell the asset (receives fiat).
    Sell,
}

impl std::fmt::Display for OfferSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Offer lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferStatus {
    /// Open for new trades.
    Active,
    /// Fully consumed or cancelled by the owner.
    Closed,
}

/// A posted offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    /// Globally unique offer identifier.
    pub id: OfferId,
    /// The user who posted the offer.
    pub owner_id: UserId,
    /// Whether the owner is buying or selling the asset.
    pub side: OfferSide,
    /// Total asset amount originally offered.
    pub amount: Decimal,
    /// Asset amount still open for new trades.
    pub remaining: Decimal,
    /// Fiat per asset unit. Immutable once posted.
    pub rate: Decimal,
    /// Fiat payment method the owner accepts.
    pub payment_method: PaymentMethod,
    /// Current lifecycle status.
    pub status: OfferStatus,
    /// When the offer was posted.
    pub created_at: DateTime<Utc>,
}

impl Offer {
    /// Whether the offer can currently cover a trade of `amount`.
    #[must_use]
    pub fn can_cover(&self, amount: Decimal) -> bool {
        self.status == OfferStatus::Active && amount > Decimal::ZERO && amount <= self.remaining
    }
}

/// Dummy offer for testing.
#[cfg(any(test, feature = "test-helpers"))]
impl Offer {
    pub fn dummy(owner_id: UserId, side: OfferSide, amount: Decimal, rate: Decimal) -> Self {
        Self {
            id: OfferId::new(),
            owner_id,
            side,
            amount,
            remaining: amount,
            rate,
            payment_method: "bank_transfer".to_string(),
            status: OfferStatus::Active,
            created_at: Utc::now(),
        }
    }
}
