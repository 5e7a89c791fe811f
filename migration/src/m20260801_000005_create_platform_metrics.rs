use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create platform_metrics table: a single global aggregates row
        manager
            .create_table(
                Table::create()
                    .table(PlatformMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlatformMetrics::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PlatformMetrics::TotalUsdtContributed)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlatformMetrics::TotalMxiDistributed)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlatformMetrics::TotalTokensSold)
                            .decimal_len(30, 12)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PlatformMetrics::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Seed the singleton row
        let insert = Query::insert()
            .into_table(PlatformMetrics::Table)
            .columns([PlatformMetrics::Id])
            .values_panic([1.into()])
            .to_owned();

        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PlatformMetrics::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PlatformMetrics {
    Table,
    Id,
    TotalUsdtContributed,
    TotalMxiDistributed,
    TotalTokensSold,
    UpdatedAt,
}
