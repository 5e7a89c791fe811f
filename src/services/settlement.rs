//! Authoritative settlement and claim application
//!
//! The persisted half of the yield engine: `settle_user` advances an
//! account's accrual snapshot and upserts its hourly candle, `claim_yield`
//! converts accumulated yield into spendable balance atomically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionError, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{prelude::*, users, yield_candles};
use crate::services::yield_engine::{self, BucketState, ClaimError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ClaimFlowError {
    #[error("user {0} not found")]
    UnknownUser(Uuid),
    #[error(transparent)]
    Ineligible(#[from] ClaimError),
    #[error("database error: {0}")]
    Database(String),
}

/// Settle one account as of `now`: compute the session accrual, merge it
/// into the candle for the current hour bucket, and persist the new
/// accumulated figure. Re-running within the same hour merges into the
/// existing candle instead of appending a second row.
pub async fn settle_user(
    db: &DatabaseConnection,
    user: &users::Model,
    now: DateTime<Utc>,
) -> Result<(), BoxError> {
    let principal = user.vesting_principal();
    if principal <= Decimal::ZERO {
        return Ok(());
    }

    let bucket = yield_engine::hour_bucket(now);

    let existing = YieldCandles::find()
        .filter(yield_candles::Column::UserId.eq(user.id))
        .filter(yield_candles::Column::TimestampHour.eq(bucket))
        .one(db)
        .await?;

    let bucket_state = existing.as_ref().map(|c| BucketState {
        open: c.open,
        high: c.high,
        low: c.low,
    });

    let settlement = yield_engine::settle_math(
        principal,
        user.accumulated_yield,
        user.last_yield_update.with_timezone(&Utc),
        now,
        bucket_state,
    );

    let candle = &settlement.candle;
    match existing {
        Some(row) => {
            let update = yield_candles::ActiveModel {
                id: Set(row.id),
                high: Set(candle.high),
                low: Set(candle.low),
                close: Set(candle.close),
                volume: Set(candle.volume),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            };
            update.update(db).await?;
        }
        None => {
            let insert = yield_candles::ActiveModel {
                user_id: Set(user.id),
                timestamp_hour: Set(candle.timestamp_hour.into()),
                open: Set(candle.open),
                high: Set(candle.high),
                low: Set(candle.low),
                close: Set(candle.close),
                volume: Set(candle.volume),
                created_at: Set(Some(now.into())),
                updated_at: Set(Some(now.into())),
                ..Default::default()
            };
            insert.insert(db).await?;
        }
    }

    let update = users::ActiveModel {
        id: Set(user.id),
        accumulated_yield: Set(settlement.new_accumulated_yield),
        last_yield_update: Set(settlement.new_last_yield_update.into()),
        updated_at: Set(Some(now.into())),
        ..Default::default()
    };
    update.update(db).await?;

    tracing::debug!(
        user_id = %user.id,
        session_yield = %settlement.session_yield,
        accumulated_yield = %settlement.new_accumulated_yield,
        "Settled vesting yield"
    );

    Ok(())
}

/// Claim the full accumulated yield into the spendable balance.
///
/// Eligibility and the debit/credit run inside one transaction so a claim
/// can never half-apply: either the yield is zeroed and the balance is
/// credited, or nothing changes.
pub async fn claim_yield(
    db: &DatabaseConnection,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Decimal, ClaimFlowError> {
    let claimed = db
        .transaction::<_, Decimal, ClaimFlowError>(move |txn| {
            Box::pin(async move {
                let user = Users::find_by_id(user_id)
                    .one(txn)
                    .await
                    .map_err(db_err)?
                    .ok_or(ClaimFlowError::UnknownUser(user_id))?;

                let claimed = yield_engine::evaluate_claim(
                    user.accumulated_yield,
                    user.direct_referrals,
                    user.kyc_approved,
                )?;

                let update = users::ActiveModel {
                    id: Set(user.id),
                    accumulated_yield: Set(Decimal::ZERO),
                    mxi_balance: Set(user.mxi_balance + claimed),
                    updated_at: Set(Some(now.into())),
                    ..Default::default()
                };
                update.update(txn).await.map_err(db_err)?;

                Ok(claimed)
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(e) => ClaimFlowError::Database(e.to_string()),
            TransactionError::Transaction(e) => e,
        })?;

    tracing::info!(user_id = %user_id, claimed = %claimed, "Yield claimed");

    Ok(claimed)
}

fn db_err(e: DbErr) -> ClaimFlowError {
    ClaimFlowError::Database(e.to_string())
}
