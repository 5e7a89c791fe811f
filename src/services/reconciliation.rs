//! Payment reconciliation state machine
//!
//! Converges a payment intent onto the provider's reported state and applies
//! the ledger credit for confirmed payments at most once. Reconciliation is
//! triggered from two independent places (the in-app poller and the
//! scheduled sweep); correctness under that concurrency comes from the
//! ledger's atomic check-and-insert credit, not from any ordering between
//! the triggers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::services::payment_provider::{
    PaymentStatusProvider, ProviderError, ProviderPaymentStatus,
};

/// Stored statuses the sweep treats as still in flight
pub const NON_TERMINAL_STATUSES: [&str; 5] =
    ["created", "waiting", "pending", "confirming", "sending"];

/// Payment lifecycle states, covering the provider's full status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Created,
    Waiting,
    Pending,
    Confirming,
    Sending,
    Finished,
    Confirmed,
    Failed,
    Expired,
    Refunded,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "waiting" => Some(Self::Waiting),
            "pending" => Some(Self::Pending),
            "confirming" => Some(Self::Confirming),
            "sending" => Some(Self::Sending),
            "finished" => Some(Self::Finished),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            "expired" => Some(Self::Expired),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Waiting => "waiting",
            Self::Pending => "pending",
            Self::Confirming => "confirming",
            Self::Sending => "sending",
            Self::Finished => "finished",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Refunded => "refunded",
        }
    }

    /// `finished` and `confirmed` are equivalent success terminals
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Finished | Self::Confirmed)
    }

    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Expired | Self::Refunded)
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal_success() || self.is_terminal_failure()
    }

    // Forward progress order; terminals share the top rank
    fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Waiting | Self::Pending => 1,
            Self::Confirming => 2,
            Self::Sending => 3,
            Self::Finished | Self::Confirmed | Self::Failed | Self::Expired | Self::Refunded => 4,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal payment status transition {from} -> {to}")]
    Backward {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

/// Pure transition function over the payment state machine.
///
/// Terminal states absorb every further report (the result is the current
/// state, unchanged). Non-terminal states advance only forward; a report
/// that would move the intent backwards is rejected.
pub fn apply_transition(
    current: PaymentStatus,
    reported: PaymentStatus,
) -> Result<PaymentStatus, TransitionError> {
    if current.is_terminal() {
        return Ok(current);
    }

    if reported.rank() < current.rank() {
        return Err(TransitionError::Backward {
            from: current,
            to: reported,
        });
    }

    Ok(reported)
}

/// The slice of a payment intent reconciliation operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentSnapshot {
    pub order_id: String,
    pub provider_payment_id: Option<String>,
    pub user_id: Uuid,
    pub price_amount: Decimal,
    pub expected_mxi_amount: Decimal,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The balance effect was applied by this call
    Applied,
    /// A previous reconciliation already applied it; nothing was credited
    AlreadyApplied,
}

#[derive(Debug, Error)]
#[error("ledger error: {0}")]
pub struct LedgerError(pub String);

/// Seam between reconciliation and the backing store.
///
/// `apply_confirmation` carries the whole correctness burden: the credit
/// record insert, the balance and metrics increments, and the status flip to
/// `confirmed` must commit atomically, and a repeat call for the same order
/// must come back `AlreadyApplied` without touching balances.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn load_intent(&self, order_id: &str) -> Result<Option<IntentSnapshot>, LedgerError>;

    /// Mirror provider metadata and a non-terminal status onto the intent.
    /// Diagnostic only; last-write-wins is acceptable here.
    async fn mirror_provider_state(
        &self,
        order_id: &str,
        status: PaymentStatus,
        payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError>;

    async fn apply_confirmation(
        &self,
        intent: &IntentSnapshot,
        payload: &ProviderPaymentStatus,
        confirmed_at: DateTime<Utc>,
    ) -> Result<CreditOutcome, LedgerError>;

    async fn mark_terminal_failure(
        &self,
        order_id: &str,
        status: PaymentStatus,
        payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The intent was already in a success terminal before this call
    AlreadyConfirmed,
    /// This call applied the credit
    Credited { mxi_amount: Decimal },
    /// Authoritative failure reported by the provider
    Failed(PaymentStatus),
    /// Still in flight; keep polling or sweeping
    Pending(PaymentStatus),
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("unknown payment intent '{0}'")]
    UnknownIntent(String),
    /// An intent without a provider payment id can never be reconciled;
    /// this is a configuration fault, not a retryable condition
    #[error("payment intent '{0}' has no provider payment id")]
    MissingProviderId(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Reconcile one payment intent against the provider's reported state.
///
/// Safe to call concurrently from the poller and the sweep for the same
/// order: the stored-status short-circuit plus the ledger's atomic credit
/// keep the balance effect at-most-once.
pub async fn reconcile(
    provider: &dyn PaymentStatusProvider,
    ledger: &dyn CreditLedger,
    order_id: &str,
) -> Result<ReconcileOutcome, ReconcileError> {
    let intent = ledger
        .load_intent(order_id)
        .await?
        .ok_or_else(|| ReconcileError::UnknownIntent(order_id.to_string()))?;

    // Stored terminal states short-circuit before any provider traffic
    if intent.status.is_terminal_success() {
        return Ok(ReconcileOutcome::AlreadyConfirmed);
    }
    if intent.status.is_terminal_failure() {
        return Ok(ReconcileOutcome::Failed(intent.status));
    }

    let provider_payment_id = intent
        .provider_payment_id
        .as_deref()
        .ok_or_else(|| ReconcileError::MissingProviderId(order_id.to_string()))?;

    let payload = provider.fetch_status(provider_payment_id).await?;
    let reported = PaymentStatus::parse(&payload.payment_status)
        .ok_or_else(|| ProviderError::UnknownStatus(payload.payment_status.clone()))?;

    if reported.is_terminal_success() {
        // The status flip to `confirmed` is the last write inside the credit
        // transaction, so a crash or race can only re-run this branch, and
        // the credit record keeps the balance effect at-most-once.
        let outcome = ledger
            .apply_confirmation(&intent, &payload, Utc::now())
            .await?;

        return Ok(match outcome {
            CreditOutcome::Applied => {
                tracing::info!(
                    order_id = %order_id,
                    mxi_amount = %intent.expected_mxi_amount,
                    "Payment confirmed and credited"
                );
                ReconcileOutcome::Credited {
                    mxi_amount: intent.expected_mxi_amount,
                }
            }
            CreditOutcome::AlreadyApplied => ReconcileOutcome::AlreadyConfirmed,
        });
    }

    if reported.is_terminal_failure() {
        ledger
            .mark_terminal_failure(order_id, reported, &payload)
            .await?;
        tracing::info!(order_id = %order_id, status = %reported, "Payment reached terminal failure");
        return Ok(ReconcileOutcome::Failed(reported));
    }

    // Non-terminal: mirror the provider state and keep waiting. A backward
    // report is ignored rather than persisted.
    let next = match apply_transition(intent.status, reported) {
        Ok(next) => next,
        Err(e) => {
            tracing::debug!(order_id = %order_id, error = %e, "Ignoring backward status report");
            intent.status
        }
    };

    ledger.mirror_provider_state(order_id, next, &payload).await?;

    Ok(ReconcileOutcome::Pending(next))
}
