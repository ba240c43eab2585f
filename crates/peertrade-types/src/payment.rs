//! Payment transaction records for provider reconciliation.
//!
//! A [`PaymentTransaction`] is the durable record of one deposit or
//! withdrawal against the external payment gateway. Its provider reference
//! is globally unique and doubles as the ledger idempotency key, so a
//! transaction is credited at most once no matter how many times
//! verification runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PaymentId, ProviderRef, UserId};

/// Whether the transaction moves value into or out of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    Deposit,
    Withdrawal,
}

/// Reconciliation status of a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Initialized; the provider has not confirmed success or failure.
    Pending,
    /// The provider confirmed success and the ledger was credited.
    Completed,
    /// The provider reported failure.
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// One payment-gateway transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
    /// Globally unique record identifier.
    pub id: PaymentId,
    /// The user the funds belong to.
    pub user_id: UserId,
    /// Globally unique provider reference; the end-to-end idempotency key.
    pub reference: ProviderRef,
    /// Amount in minor units (kobo), as the gateway speaks them.
    pub amount_minor: u64,
    /// Deposit or withdrawal.
    pub kind: PaymentKind,
    /// Current reconciliation status.
    pub status: PaymentStatus,
    /// The email the gateway transaction was initialized with.
    pub customer_email: String,
    /// When the transaction was initialized.
    pub created_at: DateTime<Utc>,
    /// When the transaction reached COMPLETED, if it did.
    pub completed_at: Option<DateTime<Utc>>,
}

impl PaymentTransaction {
    /// Create a new pending deposit record.
    #[must_use]
    pub fn new_deposit(
        user_id: UserId,
        reference: ProviderRef,
        amount_minor: u64,
        customer_email: impl Into<String>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            user_id,
            reference,
            amount_minor,
            kind: PaymentKind::Deposit,
            status: PaymentStatus::Pending,
            customer_email: customer_email.into(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Whether verification has already credited this transaction.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}
