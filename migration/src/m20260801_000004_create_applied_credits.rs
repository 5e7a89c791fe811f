use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create applied_credits table: one row per payment credit ever applied.
        // The primary key on order_id is the idempotence guarantee for crediting.
        manager
            .create_table(
                Table::create()
                    .table(AppliedCredits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppliedCredits::OrderId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AppliedCredits::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppliedCredits::MxiAmount)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppliedCredits::UsdtAmount)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AppliedCredits::AppliedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_applied_credits_user")
                    .table(AppliedCredits::Table)
                    .col(AppliedCredits::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppliedCredits::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AppliedCredits {
    Table,
    OrderId,
    UserId,
    MxiAmount,
    UsdtAmount,
    AppliedAt,
}
