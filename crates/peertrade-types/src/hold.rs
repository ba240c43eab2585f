//! Escrow hold: the reservation of a seller's asset for the life of one trade.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  release to buyer  ┌──────────┐
//!   │ LOCKED ├───────────────────▶│ RELEASED │
//!   └───┬────┘                    └──────────┘
//!       │ refund to seller
//!       ▼
//!   ┌──────────┐
//!   │ REFUNDED │
//!   └──────────┘
//! ```
//!
//! Exactly one terminal transition executes per hold; release and refund
//! both compare-and-set against LOCKED, so a double finalization fails
//! instead of silently succeeding.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Currency, HoldId, TradeId, UserId};

/// The lifecycle state of an escrow hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldState {
    /// The seller's asset is reserved for the trade.
    Locked,
    /// The asset went to the buyer. **Irreversible.**
    Released,
    /// The asset went back to the seller. **Irreversible.**
    Refunded,
}

impl HoldState {
    /// Can this hold transition to the given target state?
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Locked, Self::Released | Self::Refunded)
        )
    }

    /// Whether the hold has reached a terminal state.
    #[must_use]
    pub fn is_finalized(self) -> bool {
        self != Self::Locked
    }
}

impl std::fmt::Display for HoldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "LOCKED"),
            Self::Released => write!(f, "RELEASED"),
            Self::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// A hold on a seller's asset balance, created atomically with its trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowHold {
    /// Globally unique hold identifier.
    pub id: HoldId,
    /// The trade this hold backs.
    pub trade_id: TradeId,
    /// The user whose asset balance was frozen.
    pub seller_id: UserId,
    /// The reserved currency (the traded asset).
    pub currency: Currency,
    /// Amount reserved.
    pub amount: Decimal,
    /// Current lifecycle state.
    pub state: HoldState,
    /// When the hold was created.
    pub created_at: DateTime<Utc>,
    /// When the hold was released or refunded, if it was.
    pub finalized_at: Option<DateTime<Utc>>,
}

impl EscrowHold {
    /// Create a new hold in LOCKED state.
    #[must_use]
    pub fn new(trade_id: TradeId, seller_id: UserId, currency: Currency, amount: Decimal) -> Self {
        Self {
            id: HoldId::new(),
            trade_id,
            seller_id,
            currency,
            amount,
            state: HoldState::Locked,
            created_at: Utc::now(),
            finalized_at: None,
        }
    }

    /// Whether the hold still reserves funds.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state == HoldState::Locked
    }
}
