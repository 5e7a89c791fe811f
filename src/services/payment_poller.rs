//! Client-side payment confirmation poller
//!
//! Polls reconciliation for a single order while the purchaser waits
//! in-app. The poller is a cancellable task handle: tearing down the owning
//! screen calls `cancel()`, which stops the loop and discards any result
//! from a reconcile pass that was already in flight.
//!
//! Transport failures are tracked in a consecutive counter separate from the
//! attempt count; crossing the threshold emits a single
//! `ManualVerificationSuggested` event without failing the payment.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::services::payment_provider::{PaymentStatusProvider, ProviderError};
use crate::services::reconciliation::{
    self, CreditLedger, PaymentStatus, ReconcileError, ReconcileOutcome,
};

/// Poll cadence while a purchaser waits in-app
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Attempt budget (~30 minutes at the default cadence)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Consecutive transport failures before suggesting manual verification
pub const DEFAULT_MAX_CONSECUTIVE_TRANSPORT_FAILURES: u32 = 5;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub max_consecutive_transport_failures: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_consecutive_transport_failures: DEFAULT_MAX_CONSECUTIVE_TRANSPORT_FAILURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollerEvent {
    /// Payment confirmed (credited by this poller or already credited)
    Confirmed,
    /// Authoritative terminal failure from the provider
    Failed(PaymentStatus),
    /// Transport failures crossed the threshold; the user should be offered
    /// a manual verification path. Emitted at most once per poller.
    ManualVerificationSuggested,
    /// Attempt budget spent with the payment still unresolved. Ambiguous:
    /// this does NOT assert the payment failed.
    Exhausted,
    /// The intent can never be reconciled as configured
    ConfigurationError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed,
    Failed(PaymentStatus),
    Exhausted,
    ConfigurationError(String),
    Cancelled,
}

/// Handle to a running poller. Dropping the handle does not stop the task;
/// teardown goes through `cancel()`.
pub struct PollerHandle {
    task: JoinHandle<PollOutcome>,
    active: Arc<AtomicBool>,
    events: Option<mpsc::UnboundedReceiver<PollerEvent>>,
}

impl PollerHandle {
    /// Stop polling. The flag flips before the abort so a reconcile pass
    /// racing this call cannot emit events afterwards.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Take the event stream. Yields `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PollerEvent>> {
        self.events.take()
    }

    /// Wait for the poller to finish and return its final outcome.
    pub async fn outcome(self) -> PollOutcome {
        self.task.await.unwrap_or(PollOutcome::Cancelled)
    }
}

pub struct PaymentPoller;

impl PaymentPoller {
    pub fn spawn(
        provider: Arc<dyn PaymentStatusProvider>,
        ledger: Arc<dyn CreditLedger>,
        order_id: String,
        config: PollerConfig,
    ) -> PollerHandle {
        let active = Arc::new(AtomicBool::new(true));
        let (tx, events) = mpsc::unbounded_channel();
        let flag = Arc::clone(&active);

        let task = tokio::spawn(async move {
            let emit = |event: PollerEvent| {
                // Discard results that land after teardown
                if flag.load(Ordering::SeqCst) {
                    let _ = tx.send(event);
                }
            };

            let mut consecutive_transport_failures = 0u32;
            let mut manual_verification_suggested = false;

            let mut interval = tokio::time::interval(config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            for attempt in 1..=config.max_attempts {
                interval.tick().await;

                if !flag.load(Ordering::SeqCst) {
                    return PollOutcome::Cancelled;
                }

                match reconciliation::reconcile(provider.as_ref(), ledger.as_ref(), &order_id)
                    .await
                {
                    Ok(ReconcileOutcome::Credited { .. })
                    | Ok(ReconcileOutcome::AlreadyConfirmed) => {
                        emit(PollerEvent::Confirmed);
                        return PollOutcome::Confirmed;
                    }
                    Ok(ReconcileOutcome::Failed(status)) => {
                        emit(PollerEvent::Failed(status));
                        return PollOutcome::Failed(status);
                    }
                    Ok(ReconcileOutcome::Pending(status)) => {
                        consecutive_transport_failures = 0;
                        tracing::debug!(
                            order_id = %order_id,
                            status = %status,
                            attempt = attempt,
                            "Payment still pending"
                        );
                    }
                    Err(
                        e @ (ReconcileError::MissingProviderId(_)
                        | ReconcileError::UnknownIntent(_)
                        | ReconcileError::Provider(ProviderError::Configuration(_))),
                    ) => {
                        // Not a transient condition; retrying cannot help
                        tracing::error!(order_id = %order_id, error = %e, "Poller stopped on configuration error");
                        let message = e.to_string();
                        emit(PollerEvent::ConfigurationError(message.clone()));
                        return PollOutcome::ConfigurationError(message);
                    }
                    Err(e) => {
                        consecutive_transport_failures += 1;
                        tracing::warn!(
                            order_id = %order_id,
                            error = %e,
                            consecutive_failures = consecutive_transport_failures,
                            "Payment status check failed"
                        );

                        if consecutive_transport_failures
                            >= config.max_consecutive_transport_failures
                            && !manual_verification_suggested
                        {
                            manual_verification_suggested = true;
                            emit(PollerEvent::ManualVerificationSuggested);
                        }
                    }
                }
            }

            // Out of attempts with no terminal answer. Deliberately distinct
            // from Failed: the payment may still confirm via the sweep.
            emit(PollerEvent::Exhausted);
            PollOutcome::Exhausted
        });

        PollerHandle {
            task,
            active,
            events: Some(events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_observed_client_behavior() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.max_attempts, 60);
        assert_eq!(config.max_consecutive_transport_failures, 5);
    }
}
