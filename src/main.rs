use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mxi_backend::AppState;
use mxi_backend::handlers::{payment, vesting};
use mxi_backend::jobs::{payment_sweep_sync, yield_settlement_sync};
use mxi_backend::services::payment_provider::{NowPaymentsClient, PaymentStatusProvider};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mxi_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    // Payment provider client for the manual reconcile endpoint. The sweep
    // job builds its own from the same variables.
    let payment_provider: Option<Arc<dyn PaymentStatusProvider>> =
        match env::var("PAYMENT_PROVIDER_API_KEY") {
            Ok(api_key) => {
                let base_url = env::var("PAYMENT_PROVIDER_BASE_URL")
                    .unwrap_or_else(|_| "https://api.nowpayments.io/v1".to_string());
                match NowPaymentsClient::new(api_key, base_url) {
                    Ok(client) => Some(Arc::new(client)),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to build payment provider client");
                        None
                    }
                }
            }
            Err(_) => {
                tracing::warn!(
                    "PAYMENT_PROVIDER_API_KEY not set - manual payment reconciliation disabled"
                );
                None
            }
        };

    // Start background jobs
    yield_settlement_sync::start_yield_settlement_job(db.clone()).await;
    payment_sweep_sync::start_payment_sweep_job(db.clone()).await;

    let state = AppState {
        db,
        payment_provider,
    };

    // Build router
    let app = Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route(
            "/api/vesting/{user_id}/yield",
            get(vesting::get_yield_projection),
        )
        .route("/api/vesting/{user_id}/claim", post(vesting::claim_yield))
        .route(
            "/api/vesting/{user_id}/candles",
            get(vesting::get_yield_candles),
        )
        .route("/api/payments/{order_id}", get(payment::get_payment_status))
        .route(
            "/api/payments/{order_id}/reconcile",
            post(payment::reconcile_payment),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .expect("Failed to bind listener");

    tracing::info!(
        "Server listening on {}",
        listener.local_addr().expect("listener has a local address")
    );

    axum::serve(listener, app).await.expect("Server error");
}

async fn banner() -> &'static str {
    "MXI Vesting & Settlement Backend"
}

async fn health() -> &'static str {
    "ok"
}
