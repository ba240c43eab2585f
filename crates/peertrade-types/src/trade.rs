//! Trade record and lifecycle status machine.
//!
//! The [`Trade`] is owned jointly by buyer and seller; its status is the
//! single source of truth for which actions are legal. Terminal trades are
//! retained forever for audit and rating — they are never destroyed.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────────────┐  buyer marks paid  ┌──────────────┐ seller confirms ┌───────────┐
//!   │ PAYMENT_PENDING ├───────────────────▶│ PAYMENT_MADE ├────────────────▶│ COMPLETED │
//!   └───┬────┬────┬───┘                    └──────┬───────┘                 └───────────┘
//!       │    │    │ dispute                       │ dispute                       ▲
//!       │    │    └──────────────┐                ▼                               │
//!       │    │ deadline      ┌───┴──────┐  admin resolves   ┌───────────┐         │
//!       │    └──────────────▶│ DISPUTED ├──────────────────▶│ CANCELLED │         │
//!       │ cancel             └──────────┘                   └───────────┘         │
//!       ▼                         └────────────────────────────────────────────────┘
//!   ┌─────────┐
//!   │ EXPIRED │
//!   └─────────┘
//! ```
//!
//! Transitions are monotonic: no trade ever leaves a terminal status.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{HoldId, OfferId, TradeId, UserId};

/// Trade lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Escrow is locked; the buyer must pay fiat before the deadline.
    PaymentPending,
    /// The buyer marked the fiat payment as made; awaiting seller confirmation.
    PaymentMade,
    /// One party raised a dispute; escrow stays locked pending resolution.
    Disputed,
    /// Escrow released to the buyer, fiat leg settled. Terminal.
    Completed,
    /// Cancelled before payment (or dispute resolved to refund). Terminal.
    Cancelled,
    /// The payment deadline passed and the sweep refunded escrow. Terminal.
    Expired,
}

impl TradeStatus {
    /// Whether this status admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Expired)
    }

    /// Can this status transition to the given target?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (
                Self::PaymentPending,
                Self::PaymentMade | Self::Disputed | Self::Cancelled | Self::Expired
            ) | (Self::PaymentMade, Self::Completed | Self::Disputed)
                | (Self::Disputed, Self::Completed | Self::Cancelled)
        )
    }
}

impl std::fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PaymentPending => write!(f, "PAYMENT_PENDING"),
            Self::PaymentMade => write!(f, "PAYMENT_MADE"),
            Self::Disputed => write!(f, "DISPUTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// The role a user plays in a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeRole {
    Buyer,
    Seller,
}

/// How an admin resolves a disputed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeResolution {
    /// The buyer paid: settle like a confirmed payment.
    ReleaseToBuyer,
    /// The buyer did not pay: refund escrow to the seller.
    RefundToSeller,
}

/// A trade opened against an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Globally unique trade identifier.
    pub id: TradeId,
    /// The offer this trade consumes.
    pub offer_id: OfferId,
    /// The party receiving the asset.
    pub buyer_id: UserId,
    /// The party whose asset is escrowed.
    pub seller_id: UserId,
    /// Asset amount under escrow.
    pub amount: Decimal,
    /// Fiat per asset unit, snapshotted from the offer at creation.
    pub rate: Decimal,
    /// Current lifecycle status.
    pub status: TradeStatus,
    /// The escrow hold backing this trade.
    pub hold_id: HoldId,
    /// The buyer must mark payment made strictly before this instant.
    pub payment_deadline: DateTime<Utc>,
    /// Reason recorded when a dispute was raised.
    pub dispute_reason: Option<String>,
    /// When the trade was created.
    pub created_at: DateTime<Utc>,
    /// When the trade reached COMPLETED, if it did.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Trade {
    /// Fiat value of the trade per the rate snapshot.
    #[must_use]
    pub fn fiat_value(&self) -> Decimal {
        self.amount * self.rate
    }

    /// The role `user_id` plays in this trade, if any.
    #[must_use]
    pub fn role_of(&self, user_id: UserId) -> Option<TradeRole> {
        if user_id == self.buyer_id {
            Some(TradeRole::Buyer)
        } else if user_id == self.seller_id {
            Some(TradeRole::Seller)
        } else {
            None
        }
    }

    /// Whether the payment deadline has passed at `now`.
    #[must_use]
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.payment_deadline
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[{}] {} {} @ {} = {} NGN",
            self.id,
            self.status,
            self.amount,
            self.rate,
            self.fiat_value(),
        )
    }
}

/// Dummy trade for testing.
#[cfg(any(test, feature = "test-helpers"))]
impl Trade {
    pub fn dummy(buyer_id: UserId, seller_id: UserId, amount: Decimal, rate: Decimal) -> Self {
        Self {
            id: TradeId::new(),
            offer_id: OfferId::new(),
            buyer_id,
            seller_id,
            amount,
            rate,
            status: TradeStatus::PaymentPending,
            hold_id: HoldId::new(),
            payment_deadline: Utc::now() + chrono::Duration::minutes(30),
            dispute_reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}
