use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub order_id: String,
    pub user_id: Uuid,
    pub status: String,
    pub pay_currency: String,
    pub price_amount: Decimal,
    pub expected_mxi_amount: Decimal,
    pub actually_paid: Option<Decimal>,
    pub outcome_amount: Option<Decimal>,
    pub network_fee: Option<Decimal>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub order_id: String,
    /// One of: credited, already_confirmed, failed, pending
    pub outcome: String,
    pub status: String,
    pub credited_mxi: Option<Decimal>,
}
