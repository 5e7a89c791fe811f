use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldProjectionResponse {
    pub user_id: Uuid,
    /// Vesting-eligible principal the projection is computed on
    pub principal: Decimal,
    /// Settled yield as of the last settlement
    pub accumulated_yield: Decimal,
    /// Accumulated plus the in-flight session accrual, ceiling-capped
    pub projected_yield: Decimal,
    pub monthly_ceiling: Decimal,
    pub last_yield_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub claimed_amount: Decimal,
}

/// Claim rejections carry a stable reason code so the client can render
/// specific guidance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimErrorResponse {
    pub error: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandlePoint {
    pub timestamp_hour: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeriesResponse {
    pub user_id: Uuid,
    pub candles: Vec<CandlePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandleQuery {
    /// How many hours of history to return (default 24)
    pub hours: Option<i64>,
}
