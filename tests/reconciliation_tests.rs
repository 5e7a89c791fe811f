//! Reconciliation state machine tests over in-memory seams

mod common;

use rust_decimal_macros::dec;
use uuid::Uuid;

use common::{InMemoryLedger, Scripted, ScriptedProvider, pending_intent};
use mxi_backend::services::reconciliation::{
    self, PaymentStatus, ReconcileError, ReconcileOutcome,
};

#[tokio::test]
async fn concurrent_reconcile_credits_exactly_once() {
    let user_id = Uuid::new_v4();
    let intent = pending_intent("order-1", user_id, dec!(500));
    let ledger = InMemoryLedger::with_intent(intent);
    let provider = ScriptedProvider::new(vec![Scripted::Status("finished")]);

    // Poller and sweep racing on the same intent
    let (a, b) = tokio::join!(
        reconciliation::reconcile(&provider, &ledger, "order-1"),
        reconciliation::reconcile(&provider, &ledger, "order-1"),
    );

    let outcomes = [a.unwrap(), b.unwrap()];
    let credited = outcomes
        .iter()
        .filter(|o| matches!(o, ReconcileOutcome::Credited { .. }))
        .count();

    assert_eq!(credited, 1, "exactly one trigger applies the credit");
    assert_eq!(ledger.balance_of(user_id).await, dec!(500));
    assert_eq!(ledger.credits_applied().await, 1);
    assert_eq!(
        ledger.status_of("order-1").await,
        Some(PaymentStatus::Confirmed)
    );
}

#[tokio::test]
async fn reconcile_after_credit_is_a_no_op() {
    let user_id = Uuid::new_v4();
    let ledger = InMemoryLedger::with_intent(pending_intent("order-2", user_id, dec!(42)));
    let provider = ScriptedProvider::new(vec![Scripted::Status("finished")]);

    let first = reconciliation::reconcile(&provider, &ledger, "order-2")
        .await
        .unwrap();
    assert_eq!(
        first,
        ReconcileOutcome::Credited {
            mxi_amount: dec!(42)
        }
    );

    let calls_after_first = provider.calls();

    let second = reconciliation::reconcile(&provider, &ledger, "order-2")
        .await
        .unwrap();
    assert_eq!(second, ReconcileOutcome::AlreadyConfirmed);

    // Terminal short-circuit happens before any provider traffic
    assert_eq!(provider.calls(), calls_after_first);
    assert_eq!(ledger.balance_of(user_id).await, dec!(42));
}

#[tokio::test]
async fn terminal_failure_marks_intent_without_credit() {
    let user_id = Uuid::new_v4();
    let ledger = InMemoryLedger::with_intent(pending_intent("order-3", user_id, dec!(10)));
    let provider = ScriptedProvider::new(vec![Scripted::Status("expired")]);

    let outcome = reconciliation::reconcile(&provider, &ledger, "order-3")
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Failed(PaymentStatus::Expired));
    assert_eq!(
        ledger.status_of("order-3").await,
        Some(PaymentStatus::Expired)
    );
    assert_eq!(ledger.balance_of(user_id).await, dec!(0));
    assert_eq!(ledger.credits_applied().await, 0);
}

#[tokio::test]
async fn non_terminal_status_is_mirrored_and_reported_pending() {
    let ledger = InMemoryLedger::with_intent(pending_intent("order-4", Uuid::new_v4(), dec!(10)));
    let provider = ScriptedProvider::new(vec![Scripted::Status("confirming")]);

    let outcome = reconciliation::reconcile(&provider, &ledger, "order-4")
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Pending(PaymentStatus::Confirming));
    assert_eq!(
        ledger.status_of("order-4").await,
        Some(PaymentStatus::Confirming)
    );
}

#[tokio::test]
async fn missing_provider_id_fails_fast() {
    let mut intent = pending_intent("order-5", Uuid::new_v4(), dec!(10));
    intent.provider_payment_id = None;
    let ledger = InMemoryLedger::with_intent(intent);
    let provider = ScriptedProvider::new(vec![Scripted::Status("finished")]);

    let result = reconciliation::reconcile(&provider, &ledger, "order-5").await;

    assert!(matches!(
        result,
        Err(ReconcileError::MissingProviderId(order)) if order == "order-5"
    ));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn unknown_intent_is_an_error() {
    let ledger = InMemoryLedger::default();
    let provider = ScriptedProvider::new(vec![Scripted::Status("waiting")]);

    let result = reconciliation::reconcile(&provider, &ledger, "no-such-order").await;

    assert!(matches!(result, Err(ReconcileError::UnknownIntent(_))));
}

#[tokio::test]
async fn transport_error_leaves_intent_untouched() {
    let ledger = InMemoryLedger::with_intent(pending_intent("order-6", Uuid::new_v4(), dec!(10)));
    let provider = ScriptedProvider::new(vec![Scripted::Transport]);

    let result = reconciliation::reconcile(&provider, &ledger, "order-6").await;

    assert!(matches!(result, Err(ReconcileError::Provider(_))));
    // Transport failures never flip status
    assert_eq!(
        ledger.status_of("order-6").await,
        Some(PaymentStatus::Waiting)
    );
}
