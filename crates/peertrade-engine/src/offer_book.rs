//! Offer book — posting, reserving, and restoring offer amounts.
//!
//! Trades consume an offer's remaining amount via [`OfferBook::reserve`];
//! cancelled or expired trades give it back via [`OfferBook::restore`]. An
//! offer closes when fully consumed or when the owner cancels it.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use peertrade_types::{
    Offer, OfferId, OfferSide, OfferStatus, PaymentMethod, PeertradeError, Result, UserId,
};
use rust_decimal::Decimal;

/// Snapshot of the offer fields a new trade needs, taken atomically with
/// the reservation.
#[derive(Debug, Clone)]
pub struct OfferSnapshot {
    pub owner_id: UserId,
    pub side: OfferSide,
    pub rate: Decimal,
    pub payment_method: PaymentMethod,
}

/// All posted offers.
pub struct OfferBook {
    offers: RwLock<HashMap<OfferId, Offer>>,
}

impl OfferBook {
    /// Create a new empty offer book.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offers: RwLock::new(HashMap::new()),
        }
    }

    /// Post a new offer.
    ///
    /// # Errors
    /// Returns `InvalidOffer` for non-positive amount or rate.
    pub fn post(
        &self,
        owner_id: UserId,
        side: OfferSide,
        amount: Decimal,
        rate: Decimal,
        payment_method: impl Into<PaymentMethod>,
    ) -> Result<OfferId> {
        if amount <= Decimal::ZERO {
            return Err(PeertradeError::InvalidOffer {
                reason: format!("amount must be positive, got {amount}"),
            });
        }
        if rate <= Decimal::ZERO {
            return Err(PeertradeError::InvalidOffer {
                reason: format!("rate must be positive, got {rate}"),
            });
        }

        let offer = Offer {
            id: OfferId::new(),
            owner_id,
            side,
            amount,
            remaining: amount,
            rate,
            payment_method: payment_method.into(),
            status: OfferStatus::Active,
            created_at: Utc::now(),
        };
        let offer_id = offer.id;
        self.offers.write().insert(offer_id, offer);
        tracing::debug!(%offer_id, %owner_id, %side, %amount, %rate, "offer posted");
        Ok(offer_id)
    }

    /// Look up an offer by ID.
    #[must_use]
    pub fn get(&self, offer_id: OfferId) -> Option<Offer> {
        self.offers.read().get(&offer_id).cloned()
    }

    /// Cancel an offer. Only the owner may cancel; already-reserved amounts
    /// (open trades) are unaffected.
    ///
    /// # Errors
    /// - `OfferNotFound` if the offer doesn't exist
    /// - `Unauthorized` if the actor isn't the owner
    pub fn cancel(&self, offer_id: OfferId, actor: UserId) -> Result<()> {
        let mut offers = self.offers.write();
        let offer = offers
            .get_mut(&offer_id)
            .ok_or(PeertradeError::OfferNotFound(offer_id))?;
        if offer.owner_id != actor {
            return Err(PeertradeError::Unauthorized {
                user_id: actor,
                action: "cancel offer",
            });
        }
        offer.status = OfferStatus::Closed;
        Ok(())
    }

    /// Atomically check the offer covers `amount` and consume that much of
    /// its remaining balance, closing it when fully consumed. Returns the
    /// snapshot a new trade needs.
    ///
    /// # Errors
    /// - `OfferNotFound` if the offer doesn't exist
    /// - `OfferUnavailable` if closed or the remaining amount can't cover it
    pub fn reserve(&self, offer_id: OfferId, amount: Decimal) -> Result<OfferSnapshot> {
        let mut offers = self.offers.write();
        let offer = offers
            .get_mut(&offer_id)
            .ok_or(PeertradeError::OfferNotFound(offer_id))?;

        if !offer.can_cover(amount) {
            return Err(PeertradeError::OfferUnavailable {
                reason: format!(
                    "offer {offer_id} is {:?} with {} remaining, requested {amount}",
                    offer.status, offer.remaining
                ),
            });
        }

        offer.remaining -= amount;
        if offer.remaining.is_zero() {
            offer.status = OfferStatus::Closed;
        }

        Ok(OfferSnapshot {
            owner_id: offer.owner_id,
            side: offer.side,
            rate: offer.rate,
            payment_method: offer.payment_method.clone(),
        })
    }

    /// Give back a previously reserved amount (trade cancelled or expired).
    /// Reopens an offer that was closed purely by depletion; an offer the
    /// owner cancelled (remaining > 0 at close) stays closed.
    pub fn restore(&self, offer_id: OfferId, amount: Decimal) {
        let mut offers = self.offers.write();
        if let Some(offer) = offers.get_mut(&offer_id) {
            let was_depleted = offer.remaining.is_zero();
            offer.remaining += amount;
            if offer.status == OfferStatus::Closed && was_depleted {
                offer.status = OfferStatus::Active;
            }
        }
    }

    /// Number of offers tracked (all states).
    #[must_use]
    pub fn count(&self) -> usize {
        self.offers.read().len()
    }
}

impl Default for OfferBook {
    fn default() -> Self {
        Self::new()
    }
}
