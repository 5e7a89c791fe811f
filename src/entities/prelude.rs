pub use super::applied_credits::Entity as AppliedCredits;
pub use super::payment_intents::Entity as PaymentIntents;
pub use super::platform_metrics::Entity as PlatformMetrics;
pub use super::sync_status::Entity as SyncStatus;
pub use super::users::Entity as Users;
pub use super::yield_candles::Entity as YieldCandles;
