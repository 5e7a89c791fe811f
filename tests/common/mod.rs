//! In-memory doubles for the payment provider and credit ledger seams

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use mxi_backend::services::payment_provider::{
    PaymentStatusProvider, ProviderError, ProviderPaymentStatus,
};
use mxi_backend::services::reconciliation::{
    CreditLedger, CreditOutcome, IntentSnapshot, LedgerError, PaymentStatus,
};

/// One scripted provider response
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Status(&'static str),
    Transport,
}

/// Provider double that replays a script; the last entry repeats once the
/// script is spent.
pub struct ScriptedProvider {
    script: Vec<Scripted>,
    cursor: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Scripted>) -> Self {
        assert!(!script.is_empty(), "script must have at least one entry");
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentStatusProvider for ScriptedProvider {
    async fn fetch_status(
        &self,
        _provider_payment_id: &str,
    ) -> Result<ProviderPaymentStatus, ProviderError> {
        let i = self
            .cursor
            .fetch_add(1, Ordering::SeqCst)
            .min(self.script.len() - 1);

        // Yield so two concurrent reconcile passes interleave here, both
        // holding a pre-terminal snapshot of the intent
        tokio::task::yield_now().await;

        match self.script[i] {
            Scripted::Status(s) => Ok(ProviderPaymentStatus {
                payment_status: s.to_string(),
                actually_paid: Some(dec!(100)),
                outcome_amount: Some(dec!(99.5)),
                network_fee: Some(dec!(0.5)),
            }),
            Scripted::Transport => Err(ProviderError::Transport("simulated HTTP 500".to_string())),
        }
    }
}

#[derive(Default)]
struct LedgerState {
    intents: HashMap<String, IntentSnapshot>,
    applied: HashSet<String>,
    balances: HashMap<Uuid, Decimal>,
}

/// Ledger double with the same atomicity contract as the database-backed
/// implementation: the applied-set insert and the balance increment happen
/// under one lock.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    pub fn with_intent(intent: IntentSnapshot) -> Self {
        let ledger = Self::default();
        {
            let mut state = ledger.state.try_lock().expect("fresh ledger lock");
            state.intents.insert(intent.order_id.clone(), intent);
        }
        ledger
    }

    pub async fn balance_of(&self, user_id: Uuid) -> Decimal {
        let state = self.state.lock().await;
        state.balances.get(&user_id).copied().unwrap_or_default()
    }

    pub async fn status_of(&self, order_id: &str) -> Option<PaymentStatus> {
        let state = self.state.lock().await;
        state.intents.get(order_id).map(|i| i.status)
    }

    pub async fn credits_applied(&self) -> usize {
        let state = self.state.lock().await;
        state.applied.len()
    }
}

#[async_trait]
impl CreditLedger for InMemoryLedger {
    async fn load_intent(&self, order_id: &str) -> Result<Option<IntentSnapshot>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state.intents.get(order_id).cloned())
    }

    async fn mirror_provider_state(
        &self,
        order_id: &str,
        status: PaymentStatus,
        _payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(intent) = state.intents.get_mut(order_id) {
            intent.status = status;
        }
        Ok(())
    }

    async fn apply_confirmation(
        &self,
        intent: &IntentSnapshot,
        _payload: &ProviderPaymentStatus,
        _confirmed_at: DateTime<Utc>,
    ) -> Result<CreditOutcome, LedgerError> {
        let mut state = self.state.lock().await;

        if !state.applied.insert(intent.order_id.clone()) {
            return Ok(CreditOutcome::AlreadyApplied);
        }

        *state.balances.entry(intent.user_id).or_default() += intent.expected_mxi_amount;

        if let Some(stored) = state.intents.get_mut(&intent.order_id) {
            stored.status = PaymentStatus::Confirmed;
        }

        Ok(CreditOutcome::Applied)
    }

    async fn mark_terminal_failure(
        &self,
        order_id: &str,
        status: PaymentStatus,
        _payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        if let Some(intent) = state.intents.get_mut(order_id) {
            intent.status = status;
        }
        Ok(())
    }
}

/// A pre-terminal intent ready to confirm
pub fn pending_intent(order_id: &str, user_id: Uuid, mxi_amount: Decimal) -> IntentSnapshot {
    IntentSnapshot {
        order_id: order_id.to_string(),
        provider_payment_id: Some(format!("np-{}", order_id)),
        user_id,
        price_amount: dec!(100),
        expected_mxi_amount: mxi_amount,
        status: PaymentStatus::Waiting,
    }
}
