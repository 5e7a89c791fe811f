use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create yield_candles table: hourly OHLC series of accumulated yield
        manager
            .create_table(
                Table::create()
                    .table(YieldCandles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(YieldCandles::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::TimestampHour)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::Open)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::High)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::Low)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::Close)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::Volume)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(YieldCandles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Settlement upserts by (user_id, timestamp_hour)
        manager
            .create_index(
                Index::create()
                    .name("idx_yield_candles_user_hour")
                    .table(YieldCandles::Table)
                    .col(YieldCandles::UserId)
                    .col(YieldCandles::TimestampHour)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(YieldCandles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum YieldCandles {
    Table,
    Id,
    UserId,
    TimestampHour,
    Open,
    High,
    Low,
    Close,
    Volume,
    CreatedAt,
    UpdatedAt,
}
