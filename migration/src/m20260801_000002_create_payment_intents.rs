use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create payment_intents table tracking in-flight provider payments
        manager
            .create_table(
                Table::create()
                    .table(PaymentIntents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentIntents::OrderId)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ProviderPaymentId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::PayCurrency)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::PayNetwork)
                            .string_len(16)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::PriceAmount)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ExpectedMxiAmount)
                            .decimal_len(30, 12)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ActuallyPaid)
                            .decimal_len(30, 12)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::OutcomeAmount)
                            .decimal_len(30, 12)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::NetworkFee)
                            .decimal_len(30, 12)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // The sweep selects non-terminal intents inside the retention window
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_intents_status_created")
                    .table(PaymentIntents::Table)
                    .col(PaymentIntents::Status)
                    .col(PaymentIntents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_intents_user")
                    .table(PaymentIntents::Table)
                    .col(PaymentIntents::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentIntents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PaymentIntents {
    Table,
    OrderId,
    ProviderPaymentId,
    UserId,
    PayCurrency,
    PayNetwork,
    PriceAmount,
    ExpectedMxiAmount,
    Status,
    ActuallyPaid,
    OutcomeAmount,
    NetworkFee,
    ConfirmedAt,
    CreatedAt,
    UpdatedAt,
}
