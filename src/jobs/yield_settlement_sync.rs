//! Yield Settlement Job
//!
//! Hourly batch that settles vesting yield for every account holding
//! vesting-eligible principal: advances each account's accrual snapshot and
//! records the hourly candle. Safe to re-trigger: settlement merges into the
//! current hour's candle and a zero-elapsed re-run is a no-op.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter};
use std::env;
use tokio::time::{Duration as TokioDuration, interval};

use crate::entities::{prelude::*, users};
use crate::services::settlement;
use crate::services::sync_status;

/// Default settlement cadence in seconds (hourly)
const DEFAULT_SETTLEMENT_INTERVAL_SECS: u64 = 3600;

/// Environment variable overriding the settlement cadence
const ENV_SETTLEMENT_INTERVAL: &str = "SETTLEMENT_INTERVAL_SECS";

pub async fn start_yield_settlement_job(db: DatabaseConnection) {
    tokio::spawn(async move {
        let interval_secs: u64 = env::var(ENV_SETTLEMENT_INTERVAL)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SETTLEMENT_INTERVAL_SECS);

        tracing::info!(
            interval_secs = interval_secs,
            "Starting yield settlement job"
        );

        let mut interval = interval(TokioDuration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            // Overlapping schedule fires converge here: a run that just
            // succeeded keeps the next trigger from re-settling immediately
            match sync_status::should_sync(&db, sync_status::jobs::YIELD_SETTLEMENT).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read settlement job status");
                    continue;
                }
            }

            match settle_all_accounts(&db).await {
                Ok((settled, errors)) => {
                    tracing::info!(
                        settled = settled,
                        errors = errors,
                        "Yield settlement batch complete"
                    );
                    if let Err(e) = sync_status::record_success(
                        &db,
                        sync_status::jobs::YIELD_SETTLEMENT,
                        sync_status::intervals::YIELD_SETTLEMENT,
                    )
                    .await
                    {
                        tracing::error!(error = %e, "Failed to record settlement success");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Yield settlement batch failed");
                    let _ = sync_status::record_failure(
                        &db,
                        sync_status::jobs::YIELD_SETTLEMENT,
                        &e.to_string(),
                        sync_status::intervals::YIELD_SETTLEMENT,
                    )
                    .await;
                }
            }
        }
    });
}

/// Settle every account with nonzero vesting principal. One account failing
/// never aborts the batch.
async fn settle_all_accounts(
    db: &DatabaseConnection,
) -> Result<(usize, usize), Box<dyn std::error::Error + Send + Sync>> {
    let accounts = Users::find()
        .filter(
            Condition::any()
                .add(users::Column::MxiPurchasedDirectly.gt(Decimal::ZERO))
                .add(users::Column::MxiFromUnifiedCommissions.gt(Decimal::ZERO)),
        )
        .all(db)
        .await?;

    if accounts.is_empty() {
        tracing::debug!("No accounts with vesting principal, skipping settlement");
        return Ok((0, 0));
    }

    let now = Utc::now();
    let mut settled = 0;
    let mut errors = 0;

    for account in accounts {
        match settlement::settle_user(db, &account, now).await {
            Ok(()) => settled += 1,
            Err(e) => {
                errors += 1;
                tracing::error!(
                    user_id = %account.id,
                    error = %e,
                    "Failed to settle account"
                );
            }
        }
    }

    Ok((settled, errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_cadence_defaults_to_hourly() {
        assert_eq!(DEFAULT_SETTLEMENT_INTERVAL_SECS, 3600);
    }
}
