//! Payment Sweep Job
//!
//! Scheduled reconciliation sweep over every payment intent still in a
//! non-terminal state inside the retention window. Runs independently of
//! client activity, so payments confirm even when the purchaser closed the
//! app; the applied-credits guard makes a concurrent in-app poller harmless.

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;
use std::sync::Arc;
use tokio::time::{Duration as TokioDuration, interval};

use crate::entities::{payment_intents, prelude::*};
use crate::services::ledger::SeaOrmLedger;
use crate::services::payment_provider::{NowPaymentsClient, PaymentStatusProvider};
use crate::services::reconciliation::{self, NON_TERMINAL_STATUSES, ReconcileError, ReconcileOutcome};
use crate::services::sync_status;

/// Default sweep cadence in seconds (5 minutes)
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

/// Intents older than this are left to support follow-up
const DEFAULT_RETENTION_HOURS: i64 = 24;

/// Environment variable for the provider API key (required)
const ENV_PROVIDER_API_KEY: &str = "PAYMENT_PROVIDER_API_KEY";

/// Environment variable for the provider base URL
const ENV_PROVIDER_BASE_URL: &str = "PAYMENT_PROVIDER_BASE_URL";

/// Environment variable overriding the sweep cadence
const ENV_SWEEP_INTERVAL: &str = "PAYMENT_SWEEP_INTERVAL_SECS";

/// Environment variable overriding the retention window
const ENV_RETENTION_HOURS: &str = "PAYMENT_SWEEP_RETENTION_HOURS";

const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.nowpayments.io/v1";

pub async fn start_payment_sweep_job(db: DatabaseConnection) {
    tokio::spawn(async move {
        let api_key = match env::var(ENV_PROVIDER_API_KEY) {
            Ok(key) => key,
            Err(_) => {
                tracing::warn!(
                    "PAYMENT_PROVIDER_API_KEY not set - payment sweep job disabled. \
                     Set PAYMENT_PROVIDER_API_KEY to enable."
                );
                return;
            }
        };

        let base_url = env::var(ENV_PROVIDER_BASE_URL)
            .unwrap_or_else(|_| DEFAULT_PROVIDER_BASE_URL.to_string());

        let provider: Arc<dyn PaymentStatusProvider> =
            match NowPaymentsClient::new(api_key, base_url) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to initialize payment provider client");
                    return;
                }
            };

        let interval_secs: u64 = env::var(ENV_SWEEP_INTERVAL)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

        let retention_hours: i64 = env::var(ENV_RETENTION_HOURS)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RETENTION_HOURS);

        tracing::info!(
            interval_secs = interval_secs,
            retention_hours = retention_hours,
            "Starting payment sweep job"
        );

        let ledger = SeaOrmLedger::new(db.clone());
        let mut interval = interval(TokioDuration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            match sweep_pending_payments(&db, provider.as_ref(), &ledger, retention_hours).await {
                Ok(stats) => {
                    tracing::info!(
                        swept = stats.swept,
                        credited = stats.credited,
                        failed = stats.failed,
                        skipped = stats.skipped,
                        errors = stats.errors,
                        "Payment sweep complete"
                    );
                    let _ = sync_status::record_success(
                        &db,
                        sync_status::jobs::PAYMENT_SWEEP,
                        sync_status::intervals::PAYMENT_SWEEP,
                    )
                    .await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Payment sweep failed");
                    let _ = sync_status::record_failure(
                        &db,
                        sync_status::jobs::PAYMENT_SWEEP,
                        &e.to_string(),
                        sync_status::intervals::PAYMENT_SWEEP,
                    )
                    .await;
                }
            }
        }
    });
}

#[derive(Debug, Default)]
struct SweepStats {
    swept: usize,
    credited: usize,
    failed: usize,
    skipped: usize,
    errors: usize,
}

async fn sweep_pending_payments(
    db: &DatabaseConnection,
    provider: &dyn PaymentStatusProvider,
    ledger: &SeaOrmLedger,
    retention_hours: i64,
) -> Result<SweepStats, Box<dyn std::error::Error + Send + Sync>> {
    let cutoff = Utc::now() - Duration::hours(retention_hours);

    let intents = PaymentIntents::find()
        .filter(payment_intents::Column::Status.is_in(NON_TERMINAL_STATUSES))
        .filter(payment_intents::Column::CreatedAt.gte(cutoff))
        .all(db)
        .await?;

    let mut stats = SweepStats::default();

    for intent in intents {
        stats.swept += 1;

        match reconciliation::reconcile(provider, ledger, &intent.order_id).await {
            Ok(ReconcileOutcome::Credited { mxi_amount }) => {
                stats.credited += 1;
                tracing::info!(
                    order_id = %intent.order_id,
                    mxi_amount = %mxi_amount,
                    "Sweep credited confirmed payment"
                );
            }
            Ok(ReconcileOutcome::AlreadyConfirmed) => {}
            Ok(ReconcileOutcome::Failed(status)) => {
                stats.failed += 1;
                tracing::info!(
                    order_id = %intent.order_id,
                    status = %status,
                    "Sweep recorded terminal failure"
                );
            }
            Ok(ReconcileOutcome::Pending(_)) => {}
            Err(e @ ReconcileError::MissingProviderId(_)) => {
                // Configuration fault on the intent; retrying cannot help
                stats.skipped += 1;
                tracing::error!(order_id = %intent.order_id, error = %e, "Skipping unreconcilable intent");
            }
            Err(e) => {
                // Transport or ledger hiccup; the next sweep retries
                stats.errors += 1;
                tracing::warn!(order_id = %intent.order_id, error = %e, "Failed to reconcile intent");
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_window_defaults_to_one_day() {
        assert_eq!(DEFAULT_RETENTION_HOURS, 24);
    }

    #[test]
    fn sweep_only_touches_non_terminal_statuses() {
        assert!(!NON_TERMINAL_STATUSES.contains(&"confirmed"));
        assert!(!NON_TERMINAL_STATUSES.contains(&"finished"));
        assert!(!NON_TERMINAL_STATUSES.contains(&"failed"));
        assert!(NON_TERMINAL_STATUSES.contains(&"waiting"));
    }
}
