//! Deposit reconciliation against the payment provider.
//!
//! The reconciler owns the payment transaction records and is the only
//! writer of fiat deposits into the ledger. Credit idempotency rests on the
//! ledger's op-ref journal keyed by the provider reference, so even a
//! crash between "ledger credited" and "record marked completed" cannot
//! double-credit on re-verification.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use peertrade_ledger::Ledger;
use peertrade_types::{
    minor_to_major, Currency, OpRef, PaymentId, PaymentStatus, PaymentTransaction, PeertradeError,
    ProviderConfig, ProviderRef, Result, UserId,
};

use crate::provider::{PaymentProvider, ProviderStatus};

/// Handed back to the caller after initializing a deposit.
#[derive(Debug, Clone)]
pub struct InitializedDeposit {
    pub payment_id: PaymentId,
    pub reference: ProviderRef,
    /// Where to send the customer to complete payment.
    pub authorization_url: String,
}

/// Reconciles gateway deposits into the ledger.
pub struct Reconciler<P: PaymentProvider> {
    ledger: Arc<Ledger>,
    provider: P,
    config: ProviderConfig,
    transactions: Mutex<HashMap<ProviderRef, PaymentTransaction>>,
}

impl<P: PaymentProvider> Reconciler<P> {
    /// Create a reconciler over the given ledger and provider.
    #[must_use]
    pub fn new(ledger: Arc<Ledger>, provider: P, config: ProviderConfig) -> Self {
        Self {
            ledger,
            provider,
            config,
            transactions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a deposit: register it with the provider and record it as
    /// PENDING. The caller redirects the customer to the returned URL; the
    /// ledger is untouched until verification succeeds.
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` once retries are exhausted. No record
    /// is kept for a failed initialization.
    pub async fn initialize_deposit(
        &self,
        user_id: UserId,
        amount_minor: u64,
        customer_email: &str,
    ) -> Result<InitializedDeposit> {
        let reference = ProviderRef::generate();
        let init = self
            .with_retry(|| self.provider.initialize(&reference, amount_minor, customer_email))
            .await?;

        let txn =
            PaymentTransaction::new_deposit(user_id, reference.clone(), amount_minor, customer_email);
        let payment_id = txn.id;
        self.transactions.lock().insert(reference.clone(), txn);

        tracing::info!(%reference, %user_id, amount_minor, "deposit initialized");
        Ok(InitializedDeposit {
            payment_id,
            reference,
            authorization_url: init.authorization_url,
        })
    }

    /// Verify a deposit with the provider and settle the outcome. Safe to
    /// call any number of times: a COMPLETED record short-circuits, and the
    /// ledger credit is keyed by the provider reference so re-verification
    /// after a partial failure still credits at most once.
    ///
    /// # Errors
    /// - `PaymentNotFound` for an unknown reference
    /// - `ProviderUnavailable` once retries are exhausted (record stays
    ///   PENDING; call again later)
    /// - `ProviderAmountMismatch` if the provider settled a different
    ///   amount than was initialized (record stays PENDING for operator
    ///   attention; nothing is credited)
    pub async fn verify_deposit(&self, reference: &ProviderRef) -> Result<PaymentStatus> {
        let txn = self
            .transactions
            .lock()
            .get(reference)
            .cloned()
            .ok_or_else(|| PeertradeError::PaymentNotFound(reference.to_string()))?;

        if txn.is_completed() {
            return Ok(PaymentStatus::Completed);
        }

        let verification = self.with_retry(|| self.provider.verify(reference)).await?;
        match verification.status {
            ProviderStatus::Success => {
                if verification.amount_minor != txn.amount_minor {
                    return Err(PeertradeError::ProviderAmountMismatch {
                        expected_minor: txn.amount_minor,
                        reported_minor: verification.amount_minor,
                    });
                }

                let outcome = self.ledger.deposit(
                    txn.user_id,
                    Currency::Ngn,
                    minor_to_major(txn.amount_minor),
                    OpRef::provider(reference),
                );
                self.update(reference, |t| {
                    t.status = PaymentStatus::Completed;
                    t.completed_at = Some(verification.paid_at.unwrap_or_else(Utc::now));
                });
                tracing::info!(%reference, ?outcome, "deposit credited");
                Ok(PaymentStatus::Completed)
            }
            ProviderStatus::Failed => {
                self.update(reference, |t| t.status = PaymentStatus::Failed);
                tracing::warn!(%reference, "deposit failed at provider");
                Ok(PaymentStatus::Failed)
            }
            ProviderStatus::Pending => Ok(PaymentStatus::Pending),
        }
    }

    /// Current status of a payment record, without touching the provider.
    #[must_use]
    pub fn status(&self, reference: &ProviderRef) -> Option<PaymentStatus> {
        self.transactions.lock().get(reference).map(|t| t.status)
    }

    /// Look up the full payment record.
    #[must_use]
    pub fn get(&self, reference: &ProviderRef) -> Option<PaymentTransaction> {
        self.transactions.lock().get(reference).cloned()
    }

    fn update(&self, reference: &ProviderRef, f: impl FnOnce(&mut PaymentTransaction)) {
        if let Some(txn) = self.transactions.lock().get_mut(reference) {
            f(txn);
        }
    }

    /// Run one provider call with the configured timeout, retrying
    /// transient failures with a fixed backoff up to `max_attempts`.
    async fn with_retry<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let timeout = Duration::from_millis(self.config.call_timeout_ms);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_reason = String::new();

        for attempt in 1..=self.config.max_attempts {
            match tokio::time::timeout(timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(PeertradeError::ProviderUnavailable { reason })) => {
                    tracing::warn!(attempt, reason, "provider call failed");
                    last_reason = reason;
                }
                Ok(Err(other)) => return Err(other),
                Err(_) => {
                    tracing::warn!(attempt, timeout_ms = self.config.call_timeout_ms, "provider call timed out");
                    last_reason = format!("timed out after {}ms", self.config.call_timeout_ms);
                }
            }
            if attempt < self.config.max_attempts {
                tokio::time::sleep(backoff).await;
            }
        }

        Err(PeertradeError::ProviderUnavailable {
            reason: format!(
                "{} attempts exhausted, last: {last_reason}",
                self.config.max_attempts
            ),
        })
    }
}
