//! The trade state machine.
//!
//! Owns all trade records and enforces legal transitions, deadlines, and
//! role-gated actions. Every per-trade mutation serializes on an exclusive
//! section keyed by the trade id: the status read, the escrow/ledger side
//! effects, and the status write all happen while that section is held, so
//! two racing actions on the same trade resolve to exactly one winner —
//! the loser observes `InvalidState` (or a no-op, for the idempotent
//! `expire`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use peertrade_types::{
    Currency, DisputeResolution, EngineConfig, OfferId, OfferSide, OpRef, PeertradeError, Result,
    Trade, TradeId, TradePhase, TradeStatus, UserId,
};
use peertrade_escrow::EscrowEngine;
use peertrade_ledger::Ledger;
use rust_decimal::Decimal;

use crate::hooks::TradeHooks;
use crate::offer_book::OfferBook;

/// The central trade lifecycle engine.
pub struct TradeEngine {
    ledger: Arc<Ledger>,
    escrow: Arc<EscrowEngine>,
    offers: Arc<OfferBook>,
    hooks: Arc<dyn TradeHooks>,
    config: EngineConfig,
    /// All trades, terminal ones included — never destroyed.
    trades: RwLock<HashMap<TradeId, Trade>>,
    /// Per-trade exclusive sections.
    trade_locks: Mutex<HashMap<TradeId, Arc<Mutex<()>>>>,
    /// Users allowed to resolve disputes.
    admins: RwLock<HashSet<UserId>>,
}

impl TradeEngine {
    /// Create a new engine over the given collaborators.
    #[must_use]
    pub fn new(
        ledger: Arc<Ledger>,
        escrow: Arc<EscrowEngine>,
        offers: Arc<OfferBook>,
        hooks: Arc<dyn TradeHooks>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            escrow,
            offers,
            hooks,
            config,
            trades: RwLock::new(HashMap::new()),
            trade_locks: Mutex::new(HashMap::new()),
            admins: RwLock::new(HashSet::new()),
        }
    }

    /// The ledger this engine settles against.
    #[must_use]
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// The escrow engine backing this engine's trades.
    #[must_use]
    pub fn escrow(&self) -> &Arc<EscrowEngine> {
        &self.escrow
    }

    /// The offer book trades are opened against.
    #[must_use]
    pub fn offers(&self) -> &Arc<OfferBook> {
        &self.offers
    }

    /// Grant a user the admin role (dispute resolution).
    pub fn grant_admin(&self, user_id: UserId) {
        self.admins.write().insert(user_id);
    }

    /// Look up a trade by ID.
    #[must_use]
    pub fn get_trade(&self, trade_id: TradeId) -> Option<Trade> {
        self.trades.read().get(&trade_id).cloned()
    }

    /// Open a trade against an offer.
    ///
    /// The actor takes the opposite role of the offer owner: against a sell
    /// offer the actor buys; against a buy offer the actor sells. The
    /// seller's asset is locked via escrow atomically with the trade — if
    /// the lock fails, the offer reservation is rolled back and no trade
    /// record exists.
    ///
    /// # Errors
    /// - `OfferNotFound` / `OfferUnavailable` (closed or oversubscribed)
    /// - `InvalidOffer` if the actor owns the offer
    /// - `InsufficientEscrowFunds` if the seller's asset can't cover it
    pub fn create_trade(
        &self,
        offer_id: OfferId,
        actor: UserId,
        amount: Decimal,
    ) -> Result<TradeId> {
        let offer = self
            .offers
            .get(offer_id)
            .ok_or(PeertradeError::OfferNotFound(offer_id))?;
        if offer.owner_id == actor {
            return Err(PeertradeError::InvalidOffer {
                reason: "cannot open a trade against your own offer".to_string(),
            });
        }

        let snapshot = self.offers.reserve(offer_id, amount)?;
        let (buyer_id, seller_id) = match snapshot.side {
            OfferSide::Sell => (actor, snapshot.owner_id),
            OfferSide::Buy => (snapshot.owner_id, actor),
        };

        let trade_id = TradeId::new();
        let hold_id = match self.escrow.lock(&self.ledger, trade_id, seller_id, amount) {
            Ok(hold_id) => hold_id,
            Err(err) => {
                // Roll back the reservation; the offer is untouched overall.
                self.offers.restore(offer_id, amount);
                return Err(err);
            }
        };

        let now = Utc::now();
        let trade = Trade {
            id: trade_id,
            offer_id,
            buyer_id,
            seller_id,
            amount,
            rate: snapshot.rate,
            status: TradeStatus::PaymentPending,
            hold_id,
            payment_deadline: now + self.config.payment_window(),
            dispute_reason: None,
            created_at: now,
            completed_at: None,
        };
        self.trades.write().insert(trade_id, trade);

        tracing::info!(%trade_id, %offer_id, %buyer_id, %seller_id, %amount, "trade created");
        Ok(trade_id)
    }

    /// The buyer marks the out-of-band fiat payment as made.
    ///
    /// # Errors
    /// - `Unauthorized` if the actor isn't the buyer
    /// - `InvalidState` unless the trade is PAYMENT_PENDING
    /// - `DeadlineExceeded` once the payment window has closed (the sweep
    ///   will expire the trade)
    pub fn mark_payment_made(&self, trade_id: TradeId, actor: UserId) -> Result<()> {
        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if actor != trade.buyer_id {
            return Err(PeertradeError::Unauthorized {
                user_id: actor,
                action: "mark payment made",
            });
        }
        if trade.status != TradeStatus::PaymentPending {
            return Err(PeertradeError::InvalidState {
                trade_id,
                status: trade.status,
                action: "mark payment made",
            });
        }
        if trade.deadline_passed(Utc::now()) {
            return Err(PeertradeError::DeadlineExceeded(trade_id));
        }

        self.with_trade_mut(trade_id, |t| t.status = TradeStatus::PaymentMade)?;
        tracing::info!(%trade_id, "payment marked made");
        Ok(())
    }

    /// The seller confirms fiat receipt: escrow is released to the buyer
    /// and the seller's fiat leg is recorded, as one atomic unit with the
    /// status change.
    ///
    /// # Errors
    /// - `Unauthorized` if the actor isn't the seller
    /// - `InvalidState` unless the trade is PAYMENT_MADE
    pub fn confirm_payment(&self, trade_id: TradeId, actor: UserId) -> Result<()> {
        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if actor != trade.seller_id {
            return Err(PeertradeError::Unauthorized {
                user_id: actor,
                action: "confirm payment",
            });
        }
        if trade.status != TradeStatus::PaymentMade {
            return Err(PeertradeError::InvalidState {
                trade_id,
                status: trade.status,
                action: "confirm payment",
            });
        }

        self.settle_to_buyer(&trade)?;
        let completed = self.with_trade_mut(trade_id, |t| {
            t.status = TradeStatus::Completed;
            t.completed_at = Some(Utc::now());
            t.clone()
        })?;

        tracing::info!(%trade_id, "trade completed");
        self.hooks.on_completed(&completed);
        Ok(())
    }

    /// Either party raises a dispute. Escrow stays locked until an admin
    /// resolves it.
    ///
    /// # Errors
    /// - `Unauthorized` if the actor is neither buyer nor seller
    /// - `InvalidState` unless the trade is PAYMENT_PENDING or PAYMENT_MADE
    pub fn raise_dispute(
        &self,
        trade_id: TradeId,
        actor: UserId,
        reason: impl Into<String>,
    ) -> Result<()> {
        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if trade.role_of(actor).is_none() {
            return Err(PeertradeError::Unauthorized {
                user_id: actor,
                action: "raise dispute",
            });
        }
        if !matches!(
            trade.status,
            TradeStatus::PaymentPending | TradeStatus::PaymentMade
        ) {
            return Err(PeertradeError::InvalidState {
                trade_id,
                status: trade.status,
                action: "raise dispute",
            });
        }

        let reason = reason.into();
        let disputed = self.with_trade_mut(trade_id, |t| {
            t.status = TradeStatus::Disputed;
            t.dispute_reason = Some(reason.clone());
            t.clone()
        })?;

        tracing::warn!(%trade_id, %actor, reason, "dispute raised");
        self.hooks.on_dispute_opened(&disputed);
        Ok(())
    }

    /// An admin resolves a dispute: release to the buyer (settles like a
    /// confirmed payment) or refund to the seller (cancels the trade).
    ///
    /// # Errors
    /// - `Unauthorized` unless the actor holds the admin role
    /// - `InvalidState` unless the trade is DISPUTED
    pub fn resolve_dispute(
        &self,
        trade_id: TradeId,
        admin: UserId,
        resolution: DisputeResolution,
    ) -> Result<()> {
        if !self.admins.read().contains(&admin) {
            return Err(PeertradeError::Unauthorized {
                user_id: admin,
                action: "resolve dispute",
            });
        }

        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if trade.status != TradeStatus::Disputed {
            return Err(PeertradeError::InvalidState {
                trade_id,
                status: trade.status,
                action: "resolve dispute",
            });
        }

        match resolution {
            DisputeResolution::ReleaseToBuyer => {
                self.settle_to_buyer(&trade)?;
                let completed = self.with_trade_mut(trade_id, |t| {
                    t.status = TradeStatus::Completed;
                    t.completed_at = Some(Utc::now());
                    t.clone()
                })?;
                tracing::info!(%trade_id, %admin, "dispute resolved: released to buyer");
                self.hooks.on_completed(&completed);
            }
            DisputeResolution::RefundToSeller => {
                self.escrow.refund(&self.ledger, trade.hold_id)?;
                self.offers.restore(trade.offer_id, trade.amount);
                let cancelled =
                    self.with_trade_mut(trade_id, |t| {
                        t.status = TradeStatus::Cancelled;
                        t.clone()
                    })?;
                tracing::info!(%trade_id, %admin, "dispute resolved: refunded to seller");
                self.hooks.on_cancelled(&cancelled);
            }
        }
        Ok(())
    }

    /// Either party cancels before payment is marked made. Escrow refunds
    /// to the seller and the offer gets its amount back.
    ///
    /// # Errors
    /// - `Unauthorized` if the actor is neither buyer nor seller
    /// - `InvalidState` unless the trade is PAYMENT_PENDING
    pub fn cancel(&self, trade_id: TradeId, actor: UserId) -> Result<()> {
        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if trade.role_of(actor).is_none() {
            return Err(PeertradeError::Unauthorized {
                user_id: actor,
                action: "cancel trade",
            });
        }
        if trade.status != TradeStatus::PaymentPending {
            return Err(PeertradeError::InvalidState {
                trade_id,
                status: trade.status,
                action: "cancel trade",
            });
        }

        self.escrow.refund(&self.ledger, trade.hold_id)?;
        self.offers.restore(trade.offer_id, trade.amount);
        let cancelled = self.with_trade_mut(trade_id, |t| {
            t.status = TradeStatus::Cancelled;
            t.clone()
        })?;

        tracing::info!(%trade_id, %actor, "trade cancelled");
        self.hooks.on_cancelled(&cancelled);
        Ok(())
    }

    /// System-triggered expiry. Refunds escrow when a PAYMENT_PENDING trade
    /// has passed its deadline at `now`; returns whether this call expired
    /// the trade. Idempotent: terminal or not-yet-due trades are a no-op,
    /// not an error.
    ///
    /// # Errors
    /// Returns `TradeNotFound` for an unknown trade id.
    pub fn expire(&self, trade_id: TradeId, now: DateTime<Utc>) -> Result<bool> {
        let lock = self.trade_lock(trade_id);
        let _guard = lock.lock();

        let trade = self.snapshot(trade_id)?;
        if trade.status != TradeStatus::PaymentPending || !trade.deadline_passed(now) {
            return Ok(false);
        }

        self.escrow.refund(&self.ledger, trade.hold_id)?;
        self.offers.restore(trade.offer_id, trade.amount);
        let expired = self.with_trade_mut(trade_id, |t| {
            t.status = TradeStatus::Expired;
            t.clone()
        })?;

        tracing::info!(%trade_id, "trade expired");
        self.hooks.on_expired(&expired);
        Ok(true)
    }

    /// One sweep pass: expire every PAYMENT_PENDING trade whose deadline
    /// has passed at `now`. Each candidate is re-checked under its own
    /// exclusive section, so racing a user action is safe. Returns how many
    /// trades this pass expired.
    pub fn expire_due(&self, now: DateTime<Utc>) -> usize {
        let due: Vec<TradeId> = self
            .trades
            .read()
            .values()
            .filter(|t| t.status == TradeStatus::PaymentPending && t.deadline_passed(now))
            .map(|t| t.id)
            .collect();

        due.into_iter()
            .filter(|&trade_id| matches!(self.expire(trade_id, now), Ok(true)))
            .count()
    }

    /// Verify supply conservation across both currencies.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if either check fails.
    pub fn verify_invariants(&self) -> Result<()> {
        self.ledger.verify_supply(Currency::Usdt)?;
        self.ledger.verify_supply(Currency::Ngn)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Release escrow to the buyer and record the seller's fiat leg.
    /// Called with the trade's exclusive section held.
    fn settle_to_buyer(&self, trade: &Trade) -> Result<()> {
        self.escrow
            .release(&self.ledger, trade.hold_id, trade.buyer_id)?;
        // The fiat changed hands out of band; recording it is new value
        // entering the ledger.
        self.ledger.deposit(
            trade.seller_id,
            Currency::Ngn,
            trade.fiat_value(),
            OpRef::trade(trade.id, TradePhase::FiatSettle),
        );
        Ok(())
    }

    fn trade_lock(&self, trade_id: TradeId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.trade_locks
                .lock()
                .entry(trade_id)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn snapshot(&self, trade_id: TradeId) -> Result<Trade> {
        self.trades
            .read()
            .get(&trade_id)
            .cloned()
            .ok_or(PeertradeError::TradeNotFound(trade_id))
    }

    fn with_trade_mut<R>(&self, trade_id: TradeId, f: impl FnOnce(&mut Trade) -> R) -> Result<R> {
        let mut trades = self.trades.write();
        let trade = trades
            .get_mut(&trade_id)
            .ok_or(PeertradeError::TradeNotFound(trade_id))?;
        Ok(f(trade))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHooks;
    use peertrade_types::HoldState;

    struct Fixture {
        engine: TradeEngine,
        seller: UserId,
        buyer: UserId,
        offer_id: OfferId,
    }

    /// Seller posts a 500-unit sell offer at rate 1500 with 1000 USDT funded.
    fn setup() -> Fixture {
        let ledger = Arc::new(Ledger::new());
        let escrow = Arc::new(EscrowEngine::new());
        let offers = Arc::new(OfferBook::new());
        let engine = TradeEngine::new(
            Arc::clone(&ledger),
            escrow,
            Arc::clone(&offers),
            Arc::new(NoopHooks),
            EngineConfig::default(),
        );

        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(
            seller,
            Currency::Usdt,
            Decimal::new(1_000, 0),
            OpRef::new("seed:seller"),
        );
        let offer_id = offers
            .post(
                seller,
                OfferSide::Sell,
                Decimal::new(500, 0),
                Decimal::new(1500, 0),
                "bank_transfer",
            )
            .unwrap();

        Fixture {
            engine,
            seller,
            buyer,
            offer_id,
        }
    }

    #[test]
    fn create_locks_escrow_and_sets_deadline() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();

        let trade = fx.engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::PaymentPending);
        assert_eq!(trade.buyer_id, fx.buyer);
        assert_eq!(trade.seller_id, fx.seller);
        assert!(trade.payment_deadline > trade.created_at);

        let bal = fx.engine.ledger().balance(fx.seller, Currency::Usdt);
        assert_eq!(bal.frozen, Decimal::new(100, 0));
        assert_eq!(
            fx.engine.escrow().state(trade.hold_id),
            Some(HoldState::Locked)
        );
    }

    #[test]
    fn create_against_own_offer_rejected() {
        let fx = setup();
        let err = fx
            .engine
            .create_trade(fx.offer_id, fx.seller, Decimal::new(100, 0))
            .unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidOffer { .. }));
    }

    #[test]
    fn failed_escrow_lock_rolls_back_reservation() {
        let fx = setup();
        // Seller only has 1000 funded but the offer advertises 500; drain
        // the seller first so the lock fails.
        let drain = fx.engine.ledger().withdraw(
            fx.seller,
            Currency::Usdt,
            Decimal::new(1_000, 0),
            OpRef::new("drain"),
        );
        drain.unwrap();

        let err = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            PeertradeError::InsufficientEscrowFunds { .. }
        ));
        // Offer remaining is back to its full amount; no trade, no hold.
        assert_eq!(
            fx.engine.offers().get(fx.offer_id).unwrap().remaining,
            Decimal::new(500, 0)
        );
        assert_eq!(fx.engine.escrow().count(), 0);
    }

    #[test]
    fn buy_offer_roles_are_swapped() {
        let ledger = Arc::new(Ledger::new());
        let offers = Arc::new(OfferBook::new());
        let engine = TradeEngine::new(
            Arc::clone(&ledger),
            Arc::new(EscrowEngine::new()),
            Arc::clone(&offers),
            Arc::new(NoopHooks),
            EngineConfig::default(),
        );

        // Owner wants to buy; the actor is the seller and needs asset funded.
        let owner = UserId::new();
        let actor = UserId::new();
        ledger.deposit(
            actor,
            Currency::Usdt,
            Decimal::new(100, 0),
            OpRef::new("seed"),
        );
        let offer_id = offers
            .post(
                owner,
                OfferSide::Buy,
                Decimal::new(100, 0),
                Decimal::new(1500, 0),
                "bank_transfer",
            )
            .unwrap();

        let trade_id = engine
            .create_trade(offer_id, actor, Decimal::new(100, 0))
            .unwrap();
        let trade = engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.buyer_id, owner);
        assert_eq!(trade.seller_id, actor);
    }

    #[test]
    fn mark_payment_made_is_buyer_only() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();

        let err = fx.engine.mark_payment_made(trade_id, fx.seller).unwrap_err();
        assert!(matches!(err, PeertradeError::Unauthorized { .. }));

        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();
        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::PaymentMade
        );
    }

    #[test]
    fn mark_payment_made_after_deadline_is_rejected() {
        let ledger = Arc::new(Ledger::new());
        let offers = Arc::new(OfferBook::new());
        // Zero-minute window: the trade is overdue the moment it exists.
        let config = EngineConfig {
            payment_window_mins: 0,
            ..EngineConfig::default()
        };
        let engine = TradeEngine::new(
            Arc::clone(&ledger),
            Arc::new(EscrowEngine::new()),
            Arc::clone(&offers),
            Arc::new(NoopHooks),
            config,
        );

        let seller = UserId::new();
        let buyer = UserId::new();
        ledger.deposit(
            seller,
            Currency::Usdt,
            Decimal::new(100, 0),
            OpRef::new("seed"),
        );
        let offer_id = offers
            .post(
                seller,
                OfferSide::Sell,
                Decimal::new(100, 0),
                Decimal::new(1500, 0),
                "bank_transfer",
            )
            .unwrap();
        let trade_id = engine
            .create_trade(offer_id, buyer, Decimal::new(100, 0))
            .unwrap();

        let err = engine.mark_payment_made(trade_id, buyer).unwrap_err();
        assert!(matches!(err, PeertradeError::DeadlineExceeded(id) if id == trade_id));

        // Rejection has no side effects: the sweep still owns the expiry.
        let trade = engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::PaymentPending);
        assert_eq!(engine.escrow().state(trade.hold_id), Some(HoldState::Locked));
    }

    #[test]
    fn mark_payment_made_twice_is_invalid_state() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();
        let err = fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidState { .. }));
    }

    #[test]
    fn confirm_is_seller_only_and_needs_payment_made() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();

        // Wrong state: payment not yet marked.
        let err = fx.engine.confirm_payment(trade_id, fx.seller).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidState { .. }));

        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();

        // Wrong actor.
        let err = fx.engine.confirm_payment(trade_id, fx.buyer).unwrap_err();
        assert!(matches!(err, PeertradeError::Unauthorized { .. }));

        fx.engine.confirm_payment(trade_id, fx.seller).unwrap();
        let trade = fx.engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::Completed);
        assert!(trade.completed_at.is_some());
    }

    #[test]
    fn cancel_refunds_and_restores_offer() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.cancel(trade_id, fx.buyer).unwrap();

        let trade = fx.engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::Cancelled);
        assert_eq!(
            fx.engine.escrow().state(trade.hold_id),
            Some(HoldState::Refunded)
        );
        let bal = fx.engine.ledger().balance(fx.seller, Currency::Usdt);
        assert_eq!(bal.available, Decimal::new(1_000, 0));
        assert_eq!(bal.frozen, Decimal::ZERO);
        assert_eq!(
            fx.engine.offers().get(fx.offer_id).unwrap().remaining,
            Decimal::new(500, 0)
        );
    }

    #[test]
    fn cancel_after_payment_made_is_invalid() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();
        let err = fx.engine.cancel(trade_id, fx.seller).unwrap_err();
        assert!(matches!(err, PeertradeError::InvalidState { .. }));
    }

    #[test]
    fn dispute_then_admin_refund() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();
        fx.engine
            .raise_dispute(trade_id, fx.buyer, "seller unresponsive")
            .unwrap();

        let trade = fx.engine.get_trade(trade_id).unwrap();
        assert_eq!(trade.status, TradeStatus::Disputed);
        assert_eq!(
            trade.dispute_reason.as_deref(),
            Some("seller unresponsive")
        );
        // Escrow stays locked while disputed.
        assert_eq!(
            fx.engine.escrow().state(trade.hold_id),
            Some(HoldState::Locked)
        );

        // Non-admin may not resolve.
        let err = fx
            .engine
            .resolve_dispute(trade_id, fx.buyer, DisputeResolution::RefundToSeller)
            .unwrap_err();
        assert!(matches!(err, PeertradeError::Unauthorized { .. }));

        let admin = UserId::new();
        fx.engine.grant_admin(admin);
        fx.engine
            .resolve_dispute(trade_id, admin, DisputeResolution::RefundToSeller)
            .unwrap();
        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::Cancelled
        );
        assert_eq!(
            fx.engine.escrow().state(trade.hold_id),
            Some(HoldState::Refunded)
        );
    }

    #[test]
    fn dispute_release_settles_like_confirm() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();
        fx.engine
            .raise_dispute(trade_id, fx.seller, "payment not received")
            .unwrap();

        let admin = UserId::new();
        fx.engine.grant_admin(admin);
        fx.engine
            .resolve_dispute(trade_id, admin, DisputeResolution::ReleaseToBuyer)
            .unwrap();

        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::Completed
        );
        assert_eq!(
            fx.engine
                .ledger()
                .balance(fx.buyer, Currency::Usdt)
                .available,
            Decimal::new(100, 0)
        );
    }

    #[test]
    fn dispute_by_stranger_rejected() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        let err = fx
            .engine
            .raise_dispute(trade_id, UserId::new(), "not my trade")
            .unwrap_err();
        assert!(matches!(err, PeertradeError::Unauthorized { .. }));
    }

    #[test]
    fn expire_is_idempotent() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();

        let after_deadline = fx.engine.get_trade(trade_id).unwrap().payment_deadline
            + chrono::Duration::seconds(1);
        assert!(fx.engine.expire(trade_id, after_deadline).unwrap());
        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::Expired
        );

        // Second expire: no-op, not an error.
        assert!(!fx.engine.expire(trade_id, after_deadline).unwrap());
    }

    #[test]
    fn expire_before_deadline_is_noop() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        assert!(!fx.engine.expire(trade_id, Utc::now()).unwrap());
        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::PaymentPending
        );
    }

    #[test]
    fn expire_skips_payment_made() {
        let fx = setup();
        let trade_id = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        fx.engine.mark_payment_made(trade_id, fx.buyer).unwrap();

        let far_future = Utc::now() + chrono::Duration::days(1);
        assert!(!fx.engine.expire(trade_id, far_future).unwrap());
        assert_eq!(
            fx.engine.get_trade(trade_id).unwrap().status,
            TradeStatus::PaymentMade
        );
    }

    #[test]
    fn expire_due_sweeps_only_due_trades() {
        let fx = setup();
        let due = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(100, 0))
            .unwrap();
        let fresh = fx
            .engine
            .create_trade(fx.offer_id, fx.buyer, Decimal::new(50, 0))
            .unwrap();

        let cutoff = fx.engine.get_trade(due).unwrap().payment_deadline
            + chrono::Duration::seconds(1);
        // Both share the same window here, so nudge the fresh trade's
        // deadline forward to keep it out of range.
        fx.engine
            .with_trade_mut(fresh, |t| {
                t.payment_deadline = cutoff + chrono::Duration::minutes(5);
            })
            .unwrap();

        assert_eq!(fx.engine.expire_due(cutoff), 1);
        assert_eq!(
            fx.engine.get_trade(due).unwrap().status,
            TradeStatus::Expired
        );
        assert_eq!(
            fx.engine.get_trade(fresh).unwrap().status,
            TradeStatus::PaymentPending
        );
    }

    #[test]
    fn unknown_trade_errors() {
        let fx = setup();
        let err = fx
            .engine
            .mark_payment_made(TradeId::new(), fx.buyer)
            .unwrap_err();
        assert!(matches!(err, PeertradeError::TradeNotFound(_)));
    }
}
