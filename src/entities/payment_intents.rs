//! SeaORM Entity for tracked provider payments awaiting confirmation

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_intents")]
pub struct Model {
    /// Client-correlatable order key
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    /// Provider-assigned payment id; missing means the intent was never
    /// registered with the provider and cannot be reconciled
    pub provider_payment_id: Option<String>,
    pub user_id: Uuid,
    pub pay_currency: String,
    pub pay_network: Option<String>,
    /// Requested USDT amount
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub price_amount: Decimal,
    /// MXI to credit on confirmation
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub expected_mxi_amount: Decimal,
    /// Mirrored provider status; authoritative transitions go through
    /// the reconciliation state machine
    pub status: String,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))", nullable)]
    pub actually_paid: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))", nullable)]
    pub outcome_amount: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))", nullable)]
    pub network_fee: Option<Decimal>,
    pub confirmed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
