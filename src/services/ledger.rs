//! SeaORM-backed credit ledger
//!
//! Production implementation of the `CreditLedger` seam. The confirmation
//! credit runs in a single database transaction: an `applied_credits` insert
//! with conflict-do-nothing is the atomic check-and-set, and the balance,
//! metrics, and status writes commit together with it or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait,
};

use crate::entities::{applied_credits, payment_intents, platform_metrics, prelude::*, users};
use crate::services::payment_provider::ProviderPaymentStatus;
use crate::services::reconciliation::{
    CreditLedger, CreditOutcome, IntentSnapshot, LedgerError, PaymentStatus,
};

impl From<DbErr> for LedgerError {
    fn from(e: DbErr) -> Self {
        LedgerError(e.to_string())
    }
}

#[derive(Clone)]
pub struct SeaOrmLedger {
    db: DatabaseConnection,
}

impl SeaOrmLedger {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CreditLedger for SeaOrmLedger {
    async fn load_intent(&self, order_id: &str) -> Result<Option<IntentSnapshot>, LedgerError> {
        let row = PaymentIntents::find_by_id(order_id).one(&self.db).await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = PaymentStatus::parse(&row.status).ok_or_else(|| {
            LedgerError(format!(
                "intent '{}' has unrecognized stored status '{}'",
                row.order_id, row.status
            ))
        })?;

        Ok(Some(IntentSnapshot {
            order_id: row.order_id,
            provider_payment_id: row.provider_payment_id,
            user_id: row.user_id,
            price_amount: row.price_amount,
            expected_mxi_amount: row.expected_mxi_amount,
            status,
        }))
    }

    async fn mirror_provider_state(
        &self,
        order_id: &str,
        status: PaymentStatus,
        payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError> {
        let update = payment_intents::ActiveModel {
            order_id: Set(order_id.to_string()),
            status: Set(status.as_str().to_string()),
            actually_paid: Set(payload.actually_paid),
            outcome_amount: Set(payload.outcome_amount),
            network_fee: Set(payload.network_fee),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        update.update(&self.db).await?;
        Ok(())
    }

    async fn apply_confirmation(
        &self,
        intent: &IntentSnapshot,
        payload: &ProviderPaymentStatus,
        confirmed_at: DateTime<Utc>,
    ) -> Result<CreditOutcome, LedgerError> {
        let intent = intent.clone();
        let payload = payload.clone();

        let outcome = self
            .db
            .transaction::<_, CreditOutcome, DbErr>(move |txn| {
                Box::pin(async move {
                    // Atomic check-and-set: the primary key on order_id means
                    // only one transaction ever inserts this row
                    let credit = applied_credits::ActiveModel {
                        order_id: Set(intent.order_id.clone()),
                        user_id: Set(intent.user_id),
                        mxi_amount: Set(intent.expected_mxi_amount),
                        usdt_amount: Set(intent.price_amount),
                        applied_at: Set(confirmed_at.into()),
                    };

                    let inserted = AppliedCredits::insert(credit)
                        .on_conflict(
                            OnConflict::column(applied_credits::Column::OrderId)
                                .do_nothing()
                                .to_owned(),
                        )
                        .exec_without_returning(txn)
                        .await?;

                    if inserted == 0 {
                        // Lost the race, or a retry after the credit already
                        // committed; no balance effect
                        return Ok(CreditOutcome::AlreadyApplied);
                    }

                    let user = Users::find_by_id(intent.user_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            DbErr::Custom(format!(
                                "user {} missing for intent '{}'",
                                intent.user_id, intent.order_id
                            ))
                        })?;

                    let user_update = users::ActiveModel {
                        id: Set(user.id),
                        mxi_balance: Set(user.mxi_balance + intent.expected_mxi_amount),
                        usdt_contributed: Set(user.usdt_contributed + intent.price_amount),
                        mxi_purchased_directly: Set(user.mxi_purchased_directly
                            + intent.expected_mxi_amount),
                        updated_at: Set(Some(confirmed_at.into())),
                        ..Default::default()
                    };
                    user_update.update(txn).await?;

                    let metrics = PlatformMetrics::find_by_id(platform_metrics::SINGLETON_ID)
                        .one(txn)
                        .await?
                        .ok_or_else(|| DbErr::Custom("platform metrics row missing".to_string()))?;

                    let metrics_update = platform_metrics::ActiveModel {
                        id: Set(metrics.id),
                        total_usdt_contributed: Set(metrics.total_usdt_contributed
                            + intent.price_amount),
                        total_mxi_distributed: Set(metrics.total_mxi_distributed
                            + intent.expected_mxi_amount),
                        total_tokens_sold: Set(metrics.total_tokens_sold
                            + intent.expected_mxi_amount),
                        updated_at: Set(confirmed_at.into()),
                    };
                    metrics_update.update(txn).await?;

                    // Status flip is the last write in the sequence
                    let intent_update = payment_intents::ActiveModel {
                        order_id: Set(intent.order_id.clone()),
                        status: Set(PaymentStatus::Confirmed.as_str().to_string()),
                        actually_paid: Set(payload.actually_paid),
                        outcome_amount: Set(payload.outcome_amount),
                        network_fee: Set(payload.network_fee),
                        confirmed_at: Set(Some(confirmed_at.into())),
                        updated_at: Set(confirmed_at.into()),
                        ..Default::default()
                    };
                    intent_update.update(txn).await?;

                    Ok(CreditOutcome::Applied)
                })
            })
            .await
            .map_err(|e| LedgerError(e.to_string()))?;

        Ok(outcome)
    }

    async fn mark_terminal_failure(
        &self,
        order_id: &str,
        status: PaymentStatus,
        payload: &ProviderPaymentStatus,
    ) -> Result<(), LedgerError> {
        let update = payment_intents::ActiveModel {
            order_id: Set(order_id.to_string()),
            status: Set(status.as_str().to_string()),
            actually_paid: Set(payload.actually_paid),
            outcome_amount: Set(payload.outcome_amount),
            network_fee: Set(payload.network_fee),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        };

        update.update(&self.db).await?;
        Ok(())
    }
}
