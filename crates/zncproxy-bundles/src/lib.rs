//! Bundle Purchase (C8): buy `token_count` tokens of a bundle's duration
//! and scope under a single price deduction (spec.md §4.8).
//!
//! Grounded on `original_source/app/services/bundle_service.py`'s
//! `purchase_bundle` — lock the bundle, lock the user, deduct once, mint
//! tokens via the no-charge path, append exactly one transaction, commit,
//! then trigger the referral bonus outside that commit. Composed from
//! `zncproxy_ledger::Ledger::apply` and `zncproxy_tokens::TokenLifecycle::
//! issue_without_charge` rather than re-deriving the row-lock sequence.

use rust_decimal::Decimal;
use uuid::Uuid;

use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::TransactionKind;
use zncproxy_ledger::Ledger;
use zncproxy_storage::models::{AccessToken, TokenBundle};
use zncproxy_storage::{queries, StorageDb};
use zncproxy_tokens::TokenLifecycle;

pub struct BundlePurchase {
    pub bundle: TokenBundle,
    pub tokens: Vec<(AccessToken, String)>,
    pub cost: Decimal,
    pub new_balance: Decimal,
}

#[derive(Clone)]
pub struct BundleShop {
    db: StorageDb,
    ledger: Ledger,
    tokens: TokenLifecycle,
}

impl BundleShop {
    pub fn new(db: StorageDb, ledger: Ledger, tokens: TokenLifecycle) -> Self {
        Self { db, ledger, tokens }
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<TokenBundle>, ZncProxyError> {
        queries::list_bundles(self.db.pool(), active_only).await
    }

    /// `purchase(bundle_id, user) -> {bundle_name, tokens_generated, cost,
    /// new_balance, tokens}` (spec.md §4.8).
    pub async fn purchase(
        &self,
        bundle_id: Uuid,
        user_id: Uuid,
    ) -> Result<BundlePurchase, ZncProxyError> {
        let bundle = queries::get_bundle_active(self.db.pool(), bundle_id)
            .await?
            .ok_or_else(|| ZncProxyError::BundleNotFound(bundle_id.to_string()))?;

        let mut tx = self.db.begin().await?;

        let new_balance = self
            .ledger
            .apply(
                &mut tx,
                user_id,
                -bundle.total_price,
                TransactionKind::Purchase,
                &format!(
                    "Bundle purchase: {} ({} tokens x {}h)",
                    bundle.name, bundle.token_count, bundle.duration_hours
                ),
                None,
            )
            .await?;

        let mut tokens = Vec::with_capacity(bundle.token_count as usize);
        for _ in 0..bundle.token_count {
            let issued = self
                .tokens
                .issue_without_charge(&mut tx, user_id, bundle.duration_hours, bundle.scope)
                .await?;
            tokens.push(issued);
        }

        tx.commit().await?;

        self.tokens
            .trigger_referral_bonus(user_id, bundle.total_price)
            .await;

        let cost = bundle.total_price;
        Ok(BundlePurchase {
            bundle,
            tokens,
            cost,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bundle_purchase_cost_matches_bundle_total_price() {
        let bundle = TokenBundle {
            id: Uuid::nil(),
            name: "Starter Pack".into(),
            description: String::new(),
            token_count: 5,
            duration_hours: 24,
            scope: zncproxy_core::types::AccessScope::Full,
            discount_percent: dec!(10),
            base_price: dec!(90.00),
            total_price: dec!(81.00),
            is_active: true,
        };
        assert_eq!(bundle.total_price, dec!(81.00));
    }
}
