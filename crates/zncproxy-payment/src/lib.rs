//! Payment Port (C11): `create_pending`/`observe_webhook` plus a mock
//! gateway implementation (spec.md §4.11).
//!
//! Grounded on `original_source/app/services/payment_service.py`'s
//! `MockPaymentProvider`, redesigned per spec.md §9 to carry an explicit
//! `status` column on the payment intent instead of mutating a
//! transaction's description string to encode pending/succeeded/canceled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::PaymentStatus;
use zncproxy_storage::{queries, StorageDb};

pub struct PendingPayment {
    pub external_id: String,
    pub redirect_url: String,
    pub amount_znc: Decimal,
    pub amount_rub: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Succeeded { user_id: Uuid, amount_znc: Decimal },
    Canceled,
    /// Webhook referenced an intent we don't recognize, or an already
    /// resolved intent was observed again — the caller should no-op.
    Unknown,
}

pub struct WebhookPayload {
    pub external_id: String,
    pub status: String,
}

/// A mock payment gateway for development and testing (spec.md §4.11).
/// The `create_pending`/`observe_webhook` pair is the boundary a real
/// gateway (Stripe, YooKassa) would fill; out of scope here.
#[derive(Clone)]
pub struct MockPaymentProvider {
    db: StorageDb,
    callback_base_url: String,
    znc_to_rub_rate: Decimal,
}

impl MockPaymentProvider {
    pub fn new(db: StorageDb, callback_base_url: String, znc_to_rub_rate: Decimal) -> Self {
        Self {
            db,
            callback_base_url,
            znc_to_rub_rate,
        }
    }

    pub async fn create_pending(
        &self,
        user_id: Uuid,
        amount_znc: Decimal,
    ) -> Result<PendingPayment, ZncProxyError> {
        let external_id = format!("MOCK_PAY_{}", Uuid::new_v4());
        queries::insert_payment_intent(self.db.pool(), user_id, amount_znc, &external_id).await?;

        let redirect_url = format!("{}?payment_id={external_id}", self.callback_base_url);
        Ok(PendingPayment {
            external_id,
            redirect_url,
            amount_znc,
            amount_rub: amount_znc * self.znc_to_rub_rate,
        })
    }

    /// Processes a gateway webhook, resolving the intent exactly once;
    /// a webhook replayed against an already-resolved intent returns
    /// `Unknown` rather than crediting the balance twice.
    pub async fn observe_webhook(
        &self,
        payload: &WebhookPayload,
    ) -> Result<PaymentOutcome, ZncProxyError> {
        let now = Utc::now();
        self.resolve(&payload.external_id, &payload.status, now).await
    }

    /// Test-only entry point mirroring the original provider's
    /// development workflow: marks a pending payment as succeeded
    /// without a real gateway round-trip (spec.md §4.11).
    pub async fn simulate_success(&self, external_id: &str) -> Result<PaymentOutcome, ZncProxyError> {
        self.resolve(external_id, "succeeded", Utc::now()).await
    }

    async fn resolve(
        &self,
        external_id: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, ZncProxyError> {
        let mut tx = self.db.begin().await?;

        let intent = queries::get_payment_intent_for_update(&mut *tx, external_id)
            .await?
            .ok_or_else(|| ZncProxyError::NotFound(format!("payment intent {external_id}")))?;

        if intent.status != PaymentStatus::Pending {
            tx.rollback().await?;
            return Ok(PaymentOutcome::Unknown);
        }

        let outcome = match status {
            "succeeded" => {
                queries::resolve_payment_intent(&mut *tx, intent.id, PaymentStatus::Succeeded, now)
                    .await?;
                PaymentOutcome::Succeeded {
                    user_id: intent.user_id,
                    amount_znc: intent.amount_znc,
                }
            }
            "canceled" => {
                queries::resolve_payment_intent(&mut *tx, intent.id, PaymentStatus::Canceled, now)
                    .await?;
                PaymentOutcome::Canceled
            }
            _ => PaymentOutcome::Unknown,
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn succeeded_outcome_carries_the_original_amount() {
        let outcome = PaymentOutcome::Succeeded {
            user_id: Uuid::nil(),
            amount_znc: dec!(50.00),
        };
        assert_eq!(
            outcome,
            PaymentOutcome::Succeeded {
                user_id: Uuid::nil(),
                amount_znc: dec!(50.00)
            }
        );
    }
}
