//! SeaORM Entity for the applied-credits idempotence ledger
//!
//! One row per payment credit ever applied to a user balance. Inserting here
//! is part of the same transaction as the balance update, so the primary key
//! on order_id makes crediting at-most-once under concurrent reconciliation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applied_credits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_id: String,
    pub user_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub mxi_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub usdt_amount: Decimal,
    pub applied_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
