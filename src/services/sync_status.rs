//! Background job run bookkeeping
//!
//! Tracks when each scheduled job last ran so an overlapping trigger or a
//! quick restart does not re-run a batch that just completed.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Job names for tracking run status
pub mod jobs {
    pub const YIELD_SETTLEMENT: &str = "yield_settlement_sync";
    pub const PAYMENT_SWEEP: &str = "payment_sweep_sync";
}

/// Default minimum intervals between runs (in seconds)
pub mod intervals {
    pub const YIELD_SETTLEMENT: i32 = 3600; // hourly settlement cadence
    pub const PAYMENT_SWEEP: i32 = 300; // 5 minutes
}

/// Whether a job is due, based on its last successful run.
///
/// True on the first run, after a run that never succeeded, or once
/// `min_interval_secs` has elapsed since the last success.
pub async fn should_sync(db: &DatabaseConnection, job_name: &str) -> Result<bool, BoxError> {
    let status = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    let Some(record) = status else {
        tracing::info!("[{}] First run detected, will run", job_name);
        return Ok(true);
    };

    let Some(last_success) = record.last_success_at else {
        return Ok(true);
    };

    let elapsed = Utc::now()
        .naive_utc()
        .signed_duration_since(last_success);
    let min_interval = Duration::seconds(record.min_interval_secs as i64);

    if elapsed >= min_interval {
        Ok(true)
    } else {
        tracing::debug!(
            "[{}] Skipping run - last success was {}s ago, next in {}s",
            job_name,
            elapsed.num_seconds(),
            (min_interval - elapsed).num_seconds()
        );
        Ok(false)
    }
}

/// Record a successful run
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    default_interval_secs: i32,
) -> Result<(), BoxError> {
    let now = Utc::now().naive_utc();

    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    match existing {
        Some(record) => {
            let update = sync_status::ActiveModel {
                id: Set(record.id),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                success_count: Set(record.success_count + 1),
                ..Default::default()
            };
            update.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                success_count: Set(1),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    Ok(())
}

/// Record a failed run attempt
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    error: &str,
    default_interval_secs: i32,
) -> Result<(), BoxError> {
    let now = Utc::now().naive_utc();

    let existing = SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await?;

    match existing {
        Some(record) => {
            let update = sync_status::ActiveModel {
                id: Set(record.id),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                error_count: Set(record.error_count + 1),
                ..Default::default()
            };
            update.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                error_count: Set(1),
                min_interval_secs: Set(default_interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    Ok(())
}
