use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table: the per-user ledger row
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Users::MxiBalance)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::UsdtContributed)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::MxiPurchasedDirectly)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::MxiFromUnifiedCommissions)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::MxiFromGames)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::AccumulatedYield)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::LastYieldUpdate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Users::DirectReferrals)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Users::KycApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(Users::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Settlement batch scans for vesting-eligible principal
        manager
            .create_index(
                Index::create()
                    .name("idx_users_purchased_directly")
                    .table(Users::Table)
                    .col(Users::MxiPurchasedDirectly)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    MxiBalance,
    UsdtContributed,
    MxiPurchasedDirectly,
    MxiFromUnifiedCommissions,
    MxiFromGames,
    AccumulatedYield,
    LastYieldUpdate,
    DirectReferrals,
    KycApproved,
    CreatedAt,
    UpdatedAt,
}
