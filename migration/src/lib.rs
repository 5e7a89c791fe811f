pub use sea_orm_migration::prelude::*;

mod m20260801_000001_create_users;
mod m20260801_000002_create_payment_intents;
mod m20260801_000003_create_yield_candles;
mod m20260801_000004_create_applied_credits;
mod m20260801_000005_create_platform_metrics;
mod m20260801_000006_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260801_000001_create_users::Migration),
            Box::new(m20260801_000002_create_payment_intents::Migration),
            Box::new(m20260801_000003_create_yield_candles::Migration),
            Box::new(m20260801_000004_create_applied_credits::Migration),
            Box::new(m20260801_000005_create_platform_metrics::Migration),
            Box::new(m20260801_000006_create_sync_status::Migration),
        ]
    }
}
