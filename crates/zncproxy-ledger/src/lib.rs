//! Credit Ledger (C1): atomic balance mutation tied to an append-only
//! transaction log, plus the referral-bonus side effect (spec.md §4.1).
//!
//! Grounded on `original_source/app/services/currency_service.py`'s
//! row-locked `credit_balance`/`award_referral_bonus`, reshaped into a
//! component with an explicit constructor dependency (`StorageDb`) rather
//! than a stateless `CurrencyService` singleton (spec.md §9).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use zncproxy_core::error::ZncProxyError;
use zncproxy_core::money::quantize;
use zncproxy_core::types::TransactionKind;
use zncproxy_storage::{queries, StorageDb};

/// The referral bonus qualifies only above this purchase amount (spec.md
/// §4.1, §8 B3): strictly greater than, not equal to.
const REFERRAL_THRESHOLD: Decimal = dec!(100.00);
const REFERRAL_BONUS_RATE: Decimal = dec!(0.10);

#[derive(Clone)]
pub struct Ledger {
    db: StorageDb,
}

impl Ledger {
    pub fn new(db: StorageDb) -> Self {
        Self { db }
    }

    pub async fn get_balance(&self, user_id: Uuid) -> Result<Decimal, ZncProxyError> {
        let user = queries::get_user(self.db.pool(), user_id)
            .await?
            .ok_or_else(|| ZncProxyError::UserNotFound(user_id.to_string()))?;
        Ok(user.currency_balance)
    }

    /// The core atomic primitive: exclusive row lock, balance mutation,
    /// exactly one appended transaction (spec.md §4.1 Contract). Takes an
    /// already-open transaction so callers (Token Lifecycle, Bundle
    /// Purchase) can compose a balance mutation with other row changes —
    /// e.g. token creation — inside the same commit boundary.
    pub async fn apply<'c>(
        &self,
        tx: &mut Transaction<'c, Postgres>,
        user_id: Uuid,
        signed_amount: Decimal,
        kind: TransactionKind,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<Decimal, ZncProxyError> {
        let user = queries::get_user_for_update(&mut **tx, user_id)
            .await?
            .ok_or_else(|| ZncProxyError::UserNotFound(user_id.to_string()))?;

        let signed_amount = quantize(signed_amount)?;
        let new_balance = quantize(user.currency_balance + signed_amount)?;

        if new_balance < Decimal::ZERO {
            return Err(ZncProxyError::InsufficientBalance {
                need: (-signed_amount).to_string(),
                have: user.currency_balance.to_string(),
            });
        }

        queries::set_user_balance(&mut **tx, user_id, new_balance).await?;
        queries::insert_transaction(
            &mut **tx,
            user_id,
            signed_amount,
            kind,
            description,
            external_ref,
        )
        .await?;

        Ok(new_balance)
    }

    /// `credit(user, amount>0, description, external_ref?) -> new_balance`
    /// (spec.md §4.1). Opens and commits its own transaction — used for
    /// standalone deposits (e.g. a succeeded payment webhook), not for
    /// flows that need to compose with another row mutation.
    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: Decimal,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<Decimal, ZncProxyError> {
        if amount <= Decimal::ZERO {
            return Err(ZncProxyError::InvalidAmount);
        }
        let mut tx = self.db.begin().await?;
        let new_balance = self
            .apply(
                &mut tx,
                user_id,
                amount,
                TransactionKind::Deposit,
                description,
                external_ref,
            )
            .await?;
        tx.commit().await?;
        Ok(new_balance)
    }

    /// Referral bonus trigger (spec.md §4.1). Called *after* the buyer's
    /// purchase has committed; its own failure must never unwind that
    /// purchase (spec.md §7 Propagation), so callers should log rather
    /// than fail the purchase response if this returns `Err`.
    pub async fn maybe_award_referral_bonus(
        &self,
        buyer_id: Uuid,
        purchase_amount: Decimal,
    ) -> Result<Option<Decimal>, ZncProxyError> {
        let buyer = queries::get_user(self.db.pool(), buyer_id)
            .await?
            .ok_or_else(|| ZncProxyError::UserNotFound(buyer_id.to_string()))?;

        let Some(referrer_id) = buyer.referred_by_id else {
            return Ok(None);
        };

        if purchase_amount <= REFERRAL_THRESHOLD {
            return Ok(None);
        }

        let mut tx = self.db.begin().await?;

        // "the first" means exactly one qualifying purchase exists for
        // the buyer after this purchase's own commit (spec.md §4.1).
        let qualifying_count =
            queries::count_large_purchases(&mut *tx, buyer_id, REFERRAL_THRESHOLD).await?;
        if qualifying_count != 1 {
            return Ok(None);
        }

        let bonus = quantize(purchase_amount * REFERRAL_BONUS_RATE)?;
        self.apply(
            &mut tx,
            referrer_id,
            bonus,
            TransactionKind::ReferralBonus,
            &format!("Referral bonus for referred user {buyer_id}"),
            None,
        )
        .await?;
        queries::increment_referral_bonus_earned(&mut *tx, referrer_id, bonus).await?;

        tx.commit().await?;
        Ok(Some(bonus))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referral_threshold_is_exclusive() {
        assert!(!(dec!(100.00) > REFERRAL_THRESHOLD));
        assert!(dec!(100.01) > REFERRAL_THRESHOLD);
    }

    #[test]
    fn referral_bonus_of_100_01_quantizes_to_10_00() {
        let bonus = quantize(dec!(100.01) * REFERRAL_BONUS_RATE).unwrap();
        assert_eq!(bonus, dec!(10.00));
    }
}
