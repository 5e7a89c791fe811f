use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, Order, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::AppState;
use crate::entities::{prelude::*, yield_candles};
use crate::models::common::ErrorResponse;
use crate::models::vesting::{
    CandlePoint, CandleQuery, CandleSeriesResponse, ClaimErrorResponse, ClaimResponse,
    YieldProjectionResponse,
};
use crate::services::settlement::{self, ClaimFlowError};
use crate::services::yield_engine::{self, ClaimError, MONTHLY_YIELD_RATE};

/// Live yield projection for display ticking. Read-only: the projection is
/// recomputed from the last settlement snapshot and never persisted.
pub async fn get_yield_projection(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<YieldProjectionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user = Users::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| user_not_found(user_id))?;

    let now = Utc::now();
    let principal = user.vesting_principal();
    let last_yield_update = user.last_yield_update.with_timezone(&Utc);
    let projected =
        yield_engine::project_live_yield(principal, user.accumulated_yield, last_yield_update, now);

    Ok(Json(YieldProjectionResponse {
        user_id: user.id,
        principal,
        accumulated_yield: user.accumulated_yield,
        projected_yield: projected,
        monthly_ceiling: principal * MONTHLY_YIELD_RATE,
        last_yield_update,
    }))
}

/// Claim the full accumulated yield into the spendable balance
pub async fn claim_yield(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, (StatusCode, Json<ClaimErrorResponse>)> {
    match settlement::claim_yield(&state.db, user_id, Utc::now()).await {
        Ok(claimed) => Ok(Json(ClaimResponse {
            success: true,
            claimed_amount: claimed,
        })),
        Err(e) => Err(claim_error_response(e)),
    }
}

/// Hourly yield candles for the chart view
pub async fn get_yield_candles(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<CandleQuery>,
) -> Result<Json<CandleSeriesResponse>, (StatusCode, Json<ErrorResponse>)> {
    let hours = query.hours.unwrap_or(24).clamp(1, 24 * 30);
    let cutoff = Utc::now() - Duration::hours(hours);

    let rows = YieldCandles::find()
        .filter(yield_candles::Column::UserId.eq(user_id))
        .filter(yield_candles::Column::TimestampHour.gte(cutoff))
        .order_by(yield_candles::Column::TimestampHour, Order::Asc)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let candles = rows
        .into_iter()
        .map(|row| CandlePoint {
            timestamp_hour: row.timestamp_hour.with_timezone(&Utc),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        })
        .collect();

    Ok(Json(CandleSeriesResponse { user_id, candles }))
}

fn claim_error_response(e: ClaimFlowError) -> (StatusCode, Json<ClaimErrorResponse>) {
    let (status, reason) = match &e {
        ClaimFlowError::UnknownUser(_) => (StatusCode::NOT_FOUND, "unknown_user"),
        ClaimFlowError::Ineligible(ClaimError::InsufficientReferrals { .. }) => {
            (StatusCode::FORBIDDEN, "insufficient_referrals")
        }
        ClaimFlowError::Ineligible(ClaimError::KycNotApproved) => {
            (StatusCode::FORBIDDEN, "kyc_not_approved")
        }
        ClaimFlowError::Ineligible(ClaimError::NothingToClaim) => {
            (StatusCode::BAD_REQUEST, "nothing_to_claim")
        }
        ClaimFlowError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
    };

    (
        status,
        Json(ClaimErrorResponse {
            error: e.to_string(),
            reason: reason.to_string(),
        }),
    )
}

fn db_error(e: sea_orm::DbErr) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Database error: {}", e),
        }),
    )
}

fn user_not_found(user_id: Uuid) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("User {} not found", user_id),
        }),
    )
}
