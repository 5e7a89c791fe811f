//! SeaORM Entity for hourly yield candles

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "yield_candles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: Uuid,
    /// Bucket start, truncated to the hour; upsert key together with user_id
    pub timestamp_hour: DateTimeWithTimeZone,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub open: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub high: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub low: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub close: Decimal,
    /// close - open for the bucket
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub volume: Decimal,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
