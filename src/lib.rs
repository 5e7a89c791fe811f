// src/lib.rs

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use services::payment_provider::PaymentStatusProvider;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Absent when the provider credentials are not configured; the manual
    /// reconcile endpoint degrades to 503 and the sweep job stays disabled
    pub payment_provider: Option<Arc<dyn PaymentStatusProvider>>,
}

pub mod entities {
    pub mod prelude;

    pub mod applied_credits;
    pub mod payment_intents;
    pub mod platform_metrics;
    pub mod sync_status;
    pub mod users;
    pub mod yield_candles;
}

pub mod services {
    pub mod ledger;
    pub mod payment_poller;
    pub mod payment_provider;
    pub mod reconciliation;
    pub mod settlement;
    pub mod sync_status;
    pub mod yield_engine;
}

pub mod jobs;
pub mod models;
pub mod handlers;
