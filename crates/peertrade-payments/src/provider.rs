//! Payment provider abstraction.
//!
//! The external gateway speaks minor units (kobo) and identifies every
//! transaction by the reference we hand it at initialization. Providers are
//! assumed to be flaky: calls may time out or fail transiently, and the
//! reconciler retries them. `verify` must be safe to call any number of
//! times for the same reference.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use peertrade_types::{ProviderRef, Result};

/// What the provider reports for a transaction when asked to verify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// The customer paid; the amount is final.
    Success,
    /// The transaction failed or was abandoned.
    Failed,
    /// The provider has no final answer yet.
    Pending,
}

/// Result of initializing a transaction with the provider.
#[derive(Debug, Clone)]
pub struct ProviderInit {
    /// Where to send the customer to complete payment.
    pub authorization_url: String,
    /// The reference the provider will use for this transaction.
    pub reference: ProviderRef,
}

/// Result of verifying a transaction with the provider.
#[derive(Debug, Clone)]
pub struct ProviderVerification {
    pub status: ProviderStatus,
    /// The amount the provider settled, in minor units.
    pub amount_minor: u64,
    /// When the customer paid, if the provider reports it.
    pub paid_at: Option<DateTime<Utc>>,
    /// The email the provider has on record for the transaction.
    pub customer_email: Option<String>,
}

/// An external payment gateway.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Register a transaction with the provider and obtain the checkout URL.
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the gateway cannot be reached.
    async fn initialize(
        &self,
        reference: &ProviderRef,
        amount_minor: u64,
        customer_email: &str,
    ) -> Result<ProviderInit>;

    /// Ask the provider for the final status of a transaction.
    ///
    /// # Errors
    /// Returns `ProviderUnavailable` if the gateway cannot be reached.
    async fn verify(&self, reference: &ProviderRef) -> Result<ProviderVerification>;
}

/// Scriptable in-memory provider. For tests.
#[cfg(any(test, feature = "test-helpers"))]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use peertrade_types::PeertradeError;

    use super::{
        PaymentProvider, ProviderInit, ProviderRef, ProviderStatus, ProviderVerification, Result,
    };

    /// A provider whose answers are scripted per reference.
    ///
    /// Unscripted references verify as PENDING. Transient outages are
    /// injected with [`MockProvider::fail_next`]: the next N calls (either
    /// method) return `ProviderUnavailable` before behavior returns to
    /// normal, which is how retry paths get exercised.
    pub struct MockProvider {
        outcomes: Mutex<HashMap<ProviderRef, ProviderVerification>>,
        failures_remaining: AtomicU32,
        calls: AtomicUsize,
    }

    impl MockProvider {
        #[must_use]
        pub fn new() -> Self {
            Self {
                outcomes: Mutex::new(HashMap::new()),
                failures_remaining: AtomicU32::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        /// Script the verification outcome for a reference.
        pub fn script(&self, reference: ProviderRef, outcome: ProviderVerification) {
            self.outcomes.lock().insert(reference, outcome);
        }

        /// Shorthand: script a successful payment of `amount_minor`.
        pub fn script_success(&self, reference: ProviderRef, amount_minor: u64) {
            self.script(
                reference,
                ProviderVerification {
                    status: ProviderStatus::Success,
                    amount_minor,
                    paid_at: Some(chrono::Utc::now()),
                    customer_email: Some("customer@example.com".to_string()),
                },
            );
        }

        /// Make the next `n` calls fail with `ProviderUnavailable`.
        pub fn fail_next(&self, n: u32) {
            self.failures_remaining.store(n, Ordering::SeqCst);
        }

        /// Total calls observed (including injected failures).
        #[must_use]
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn gate(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prev = self
                .failures_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if prev.is_ok() {
                return Err(PeertradeError::ProviderUnavailable {
                    reason: "injected outage".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Default for MockProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl PaymentProvider for MockProvider {
        async fn initialize(
            &self,
            reference: &ProviderRef,
            _amount_minor: u64,
            _customer_email: &str,
        ) -> Result<ProviderInit> {
            self.gate()?;
            Ok(ProviderInit {
                authorization_url: format!("https://checkout.example.com/{reference}"),
                reference: reference.clone(),
            })
        }

        async fn verify(&self, reference: &ProviderRef) -> Result<ProviderVerification> {
            self.gate()?;
            Ok(self
                .outcomes
                .lock()
                .get(reference)
                .cloned()
                .unwrap_or(ProviderVerification {
                    status: ProviderStatus::Pending,
                    amount_minor: 0,
                    paid_at: None,
                    customer_email: None,
                }))
        }
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockProvider;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_initialize_returns_checkout_url() {
        let provider = MockProvider::new();
        let reference = ProviderRef::generate();
        let init = provider
            .initialize(&reference, 500_000, "user@example.com")
            .await
            .unwrap();
        assert!(init.authorization_url.contains(reference.as_str()));
        assert_eq!(init.reference, reference);
    }

    #[tokio::test]
    async fn unscripted_reference_is_pending() {
        let provider = MockProvider::new();
        let verification = provider.verify(&ProviderRef::generate()).await.unwrap();
        assert_eq!(verification.status, ProviderStatus::Pending);
    }

    #[tokio::test]
    async fn injected_failures_then_recovery() {
        let provider = MockProvider::new();
        let reference = ProviderRef::generate();
        provider.script_success(reference.clone(), 100_000);
        provider.fail_next(2);

        assert!(provider.verify(&reference).await.is_err());
        assert!(provider.verify(&reference).await.is_err());
        let verification = provider.verify(&reference).await.unwrap();
        assert_eq!(verification.status, ProviderStatus::Success);
        assert_eq!(provider.call_count(), 3);
    }
}
