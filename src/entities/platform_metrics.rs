//! SeaORM Entity for the global platform aggregates row

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Id of the single metrics row seeded by the migration
pub const SINGLETON_ID: i32 = 1;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "platform_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub total_usdt_contributed: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub total_mxi_distributed: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub total_tokens_sold: Decimal,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
