//! Poller behavior tests: terminal handling, transport failure escalation,
//! exhaustion, and cancellation

mod common;

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{InMemoryLedger, Scripted, ScriptedProvider, pending_intent};
use mxi_backend::services::payment_poller::{
    PaymentPoller, PollOutcome, PollerConfig, PollerEvent,
};
use mxi_backend::services::reconciliation::PaymentStatus;

fn fast_config(max_attempts: u32) -> PollerConfig {
    PollerConfig {
        poll_interval: Duration::from_millis(1),
        max_attempts,
        max_consecutive_transport_failures: 5,
    }
}

fn setup(
    script: Vec<Scripted>,
    order_id: &str,
    mxi_amount: rust_decimal::Decimal,
) -> (Arc<ScriptedProvider>, Arc<InMemoryLedger>, Uuid) {
    let user_id = Uuid::new_v4();
    let provider = Arc::new(ScriptedProvider::new(script));
    let ledger = Arc::new(InMemoryLedger::with_intent(pending_intent(
        order_id, user_id, mxi_amount,
    )));
    (provider, ledger, user_id)
}

async fn drain_events(
    mut events: tokio::sync::mpsc::UnboundedReceiver<PollerEvent>,
) -> Vec<PollerEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}

#[tokio::test]
async fn poller_stops_on_confirmation_and_credits_once() {
    let (provider, ledger, user_id) = setup(
        vec![
            Scripted::Status("waiting"),
            Scripted::Status("confirming"),
            Scripted::Status("finished"),
        ],
        "poll-1",
        dec!(250),
    );

    let mut handle = PaymentPoller::spawn(
        provider.clone(),
        ledger.clone(),
        "poll-1".to_string(),
        fast_config(60),
    );

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Confirmed);
    assert_eq!(ledger.balance_of(user_id).await, dec!(250));
    assert_eq!(ledger.credits_applied().await, 1);
    assert_eq!(drain_events(events).await, vec![PollerEvent::Confirmed]);
    // Polling stopped at the terminal answer
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn poller_reports_business_failure_distinctly() {
    let (provider, ledger, user_id) = setup(
        vec![Scripted::Status("waiting"), Scripted::Status("failed")],
        "poll-2",
        dec!(10),
    );

    let mut handle = PaymentPoller::spawn(
        provider,
        ledger.clone(),
        "poll-2".to_string(),
        fast_config(60),
    );

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Failed(PaymentStatus::Failed));
    assert_eq!(ledger.balance_of(user_id).await, dec!(0));
    assert_eq!(
        drain_events(events).await,
        vec![PollerEvent::Failed(PaymentStatus::Failed)]
    );
}

#[tokio::test]
async fn five_consecutive_transport_failures_suggest_manual_verification_once() {
    // 7 transport failures in a row, then pending answers until exhaustion:
    // the threshold fires at the 5th and must not fire again at the 6th/7th
    let script = vec![
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Status("waiting"),
    ];
    let (provider, ledger, _user_id) = setup(script, "poll-3", dec!(10));

    let mut handle = PaymentPoller::spawn(provider, ledger, "poll-3".to_string(), fast_config(10));

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Exhausted);

    let collected = drain_events(events).await;
    let manual_suggestions = collected
        .iter()
        .filter(|e| **e == PollerEvent::ManualVerificationSuggested)
        .count();

    assert_eq!(manual_suggestions, 1, "signal fires exactly once");
    assert_eq!(collected.last(), Some(&PollerEvent::Exhausted));
}

#[tokio::test]
async fn pending_answer_resets_the_transport_failure_counter() {
    // 4 failures, a pending answer, 4 more failures: the streak never
    // reaches 5, so no manual verification signal
    let script = vec![
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Status("waiting"),
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Transport,
        Scripted::Status("waiting"),
    ];
    let (provider, ledger, _user_id) = setup(script, "poll-4", dec!(10));

    let mut handle = PaymentPoller::spawn(provider, ledger, "poll-4".to_string(), fast_config(10));

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Exhausted);

    let collected = drain_events(events).await;
    assert!(
        !collected.contains(&PollerEvent::ManualVerificationSuggested),
        "no signal when the streak is broken"
    );
}

#[tokio::test]
async fn exhaustion_is_not_a_payment_failure() {
    let (provider, ledger, _user_id) = setup(vec![Scripted::Status("waiting")], "poll-5", dec!(10));

    let mut handle =
        PaymentPoller::spawn(provider, ledger.clone(), "poll-5".to_string(), fast_config(3));

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Exhausted);
    assert_eq!(
        ledger.status_of("poll-5").await,
        Some(PaymentStatus::Waiting)
    );
    assert_eq!(drain_events(events).await, vec![PollerEvent::Exhausted]);
}

#[tokio::test]
async fn missing_provider_id_stops_the_poller_immediately() {
    let user_id = Uuid::new_v4();
    let mut intent = pending_intent("poll-6", user_id, dec!(10));
    intent.provider_payment_id = None;
    let provider = Arc::new(ScriptedProvider::new(vec![Scripted::Status("waiting")]));
    let ledger = Arc::new(InMemoryLedger::with_intent(intent));

    let mut handle = PaymentPoller::spawn(
        provider.clone(),
        ledger,
        "poll-6".to_string(),
        fast_config(60),
    );

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert!(matches!(outcome, PollOutcome::ConfigurationError(_)));
    assert_eq!(
        provider.calls(),
        0,
        "configuration errors never reach the provider"
    );

    let collected = drain_events(events).await;
    assert!(matches!(
        collected.as_slice(),
        [PollerEvent::ConfigurationError(_)]
    ));
}

#[tokio::test]
async fn cancelled_poller_emits_nothing_further() {
    let (provider, ledger, _user_id) = setup(vec![Scripted::Status("waiting")], "poll-7", dec!(10));

    // Long interval: the poller completes one attempt, then sleeps
    let config = PollerConfig {
        poll_interval: Duration::from_secs(300),
        max_attempts: 60,
        max_consecutive_transport_failures: 5,
    };

    let mut handle = PaymentPoller::spawn(provider, ledger, "poll-7".to_string(), config);

    // Let the first attempt land, then tear down
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.cancel();

    let events = handle.take_events().expect("events not yet taken");
    let outcome = handle.outcome().await;

    assert_eq!(outcome, PollOutcome::Cancelled);
    assert!(drain_events(events).await.is_empty());
}
