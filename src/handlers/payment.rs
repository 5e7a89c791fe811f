use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::EntityTrait;

use crate::AppState;
use crate::entities::{payment_intents, prelude::*};
use crate::models::common::ErrorResponse;
use crate::models::payment::{PaymentStatusResponse, ReconcileResponse};
use crate::services::ledger::SeaOrmLedger;
use crate::services::payment_provider::ProviderError;
use crate::services::reconciliation::{self, ReconcileError, ReconcileOutcome};

/// Status snapshot of a payment intent for polled display
pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let intent = load_intent(&state, &order_id).await?;
    Ok(Json(status_response(intent)))
}

/// One manual reconcile pass against the provider. Used by the "verify my
/// payment" action; safe to trigger while the poller or sweep is running.
pub async fn reconcile_payment(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Json<ReconcileResponse>, (StatusCode, Json<ErrorResponse>)> {
    let provider = state.payment_provider.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Payment provider is not configured".to_string(),
        }),
    ))?;

    let ledger = SeaOrmLedger::new(state.db.clone());

    let outcome = reconciliation::reconcile(provider.as_ref(), &ledger, &order_id)
        .await
        .map_err(reconcile_error_response)?;

    let (outcome_str, credited_mxi) = match &outcome {
        ReconcileOutcome::Credited { mxi_amount } => ("credited", Some(*mxi_amount)),
        ReconcileOutcome::AlreadyConfirmed => ("already_confirmed", None),
        ReconcileOutcome::Failed(_) => ("failed", None),
        ReconcileOutcome::Pending(_) => ("pending", None),
    };

    // Re-read for the authoritative stored status after the pass
    let intent = load_intent(&state, &order_id).await?;

    Ok(Json(ReconcileResponse {
        order_id: intent.order_id,
        outcome: outcome_str.to_string(),
        status: intent.status,
        credited_mxi,
    }))
}

async fn load_intent(
    state: &AppState,
    order_id: &str,
) -> Result<payment_intents::Model, (StatusCode, Json<ErrorResponse>)> {
    PaymentIntents::find_by_id(order_id)
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Database error: {}", e),
                }),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Payment intent '{}' not found", order_id),
                }),
            )
        })
}

fn status_response(intent: payment_intents::Model) -> PaymentStatusResponse {
    PaymentStatusResponse {
        order_id: intent.order_id,
        user_id: intent.user_id,
        status: intent.status,
        pay_currency: intent.pay_currency,
        price_amount: intent.price_amount,
        expected_mxi_amount: intent.expected_mxi_amount,
        actually_paid: intent.actually_paid,
        outcome_amount: intent.outcome_amount,
        network_fee: intent.network_fee,
        confirmed_at: intent.confirmed_at.map(|t| t.with_timezone(&Utc)),
        created_at: intent.created_at.with_timezone(&Utc),
    }
}

fn reconcile_error_response(e: ReconcileError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        ReconcileError::UnknownIntent(_) => StatusCode::NOT_FOUND,
        ReconcileError::MissingProviderId(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReconcileError::Provider(ProviderError::Configuration(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ReconcileError::Provider(_) => StatusCode::BAD_GATEWAY,
        ReconcileError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}
