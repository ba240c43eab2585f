//! # peertrade-payments
//!
//! The **Payment Reconciliation Service**: initializes fiat deposits with
//! the external gateway and verifies them into the ledger.
//!
//! The gateway speaks minor units and identifies transactions by the
//! reference generated at initialization. Verification is idempotent end
//! to end: the ledger credit is keyed by that reference, so repeated
//! verification (webhook plus polling plus manual retry) credits at most
//! once.

pub mod provider;
pub mod reconcile;

pub use provider::{PaymentProvider, ProviderInit, ProviderStatus, ProviderVerification};
pub use reconcile::{InitializedDeposit, Reconciler};

#[cfg(any(test, feature = "test-helpers"))]
pub use provider::MockProvider;
