//! SeaORM Entity for the users ledger table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    /// Spendable MXI balance
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub mxi_balance: Decimal,
    /// Lifetime USDT contributed through confirmed purchases
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub usdt_contributed: Decimal,
    /// MXI bought directly (vesting-eligible)
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub mxi_purchased_directly: Decimal,
    /// MXI earned from unified referral commissions (vesting-eligible)
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub mxi_from_unified_commissions: Decimal,
    /// MXI won in games (NOT vesting-eligible)
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub mxi_from_games: Decimal,
    /// Settled yield awaiting claim
    #[sea_orm(column_type = "Decimal(Some((30, 12)))")]
    pub accumulated_yield: Decimal,
    /// Point up to which accumulated_yield is authoritative
    pub last_yield_update: DateTimeWithTimeZone,
    pub direct_referrals: i32,
    pub kyc_approved: bool,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Principal eligible for vesting yield: direct purchases plus unified
    /// commissions. Game winnings and claimed yield do not accrue.
    pub fn vesting_principal(&self) -> Decimal {
        self.mxi_purchased_directly + self.mxi_from_unified_commissions
    }
}
