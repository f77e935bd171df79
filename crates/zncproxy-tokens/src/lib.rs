//! Token Lifecycle (C2): generate, lazily-activating validate, read-only
//! check_status, revoke, list (spec.md §4.2).
//!
//! Grounded on `original_source/app/services/token_service.py`, reshaped
//! per spec.md §9 into a component with explicit constructor dependencies
//! (storage, cache, ledger, clock) instead of a stateless
//! `TokenService` classmethod bag. The lazy/irreversible activation state
//! machine mirrors `chronx_core::account::TimeLockContract`'s
//! once-set-never-reverts status fields.

pub mod claims;
pub mod price;
pub mod secret;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use zncproxy_cache::CacheClient;
use zncproxy_core::clock::Clock;
use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::{AccessScope, TransactionKind};
use zncproxy_ledger::Ledger;
use zncproxy_storage::models::AccessToken;
use zncproxy_storage::{queries, StorageDb};

pub use claims::TokenClaims;

fn cache_key(secret_hash: &str) -> String {
    format!("active_token:{secret_hash}")
}

#[derive(Clone)]
pub struct TokenLifecycle {
    db: StorageDb,
    cache: CacheClient,
    ledger: Ledger,
    clock: Arc<dyn Clock>,
}

impl TokenLifecycle {
    pub fn new(db: StorageDb, cache: CacheClient, ledger: Ledger, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            cache,
            ledger,
            clock,
        }
    }

    /// `generate(user, duration_hours, scope) -> (token, secret, cost)`
    /// (spec.md §4.2). Debits the price, creates the token, and appends
    /// exactly one purchase transaction, all in one commit; the referral
    /// bonus trigger runs after that commit per spec.md §4.1.
    pub async fn generate(
        &self,
        user_id: Uuid,
        duration_hours: i32,
        scope: AccessScope,
    ) -> Result<(AccessToken, String, Decimal), ZncProxyError> {
        let price = price::price_for(duration_hours)
            .ok_or(ZncProxyError::InvalidDuration { hours: duration_hours })?;

        let mut tx = self.db.begin().await?;
        let (token, secret) = self
            .issue_token_in_tx(&mut tx, user_id, duration_hours, scope, price)
            .await?;
        tx.commit().await?;

        self.trigger_referral_bonus(user_id, price).await;

        Ok((token, secret, price))
    }

    /// Issues `count` tokens of the same duration/scope under a single
    /// price deduction — the Bundle Purchase primitive (spec.md §4.8),
    /// grounded on `bundle_service.py`'s
    /// `create_token_without_charge` loop. The caller owns the
    /// transaction and the single purchase-transaction row; this method
    /// never touches the ledger.
    pub async fn issue_without_charge<'c>(
        &self,
        tx: &mut Transaction<'c, Postgres>,
        user_id: Uuid,
        duration_hours: i32,
        scope: AccessScope,
    ) -> Result<(AccessToken, String), ZncProxyError> {
        let secret = secret::generate_secret();
        let secret_hash = secret::hash_secret(&secret);
        let token =
            queries::insert_token(&mut **tx, user_id, &secret_hash, duration_hours, scope).await?;
        Ok((token, secret))
    }

    async fn issue_token_in_tx<'c>(
        &self,
        tx: &mut Transaction<'c, Postgres>,
        user_id: Uuid,
        duration_hours: i32,
        scope: AccessScope,
        price: Decimal,
    ) -> Result<(AccessToken, String), ZncProxyError> {
        self.ledger
            .apply(
                tx,
                user_id,
                -price,
                TransactionKind::Purchase,
                &format!("Token purchase: {duration_hours}h {scope:?}"),
                None,
            )
            .await?;
        self.issue_without_charge(tx, user_id, duration_hours, scope)
            .await
    }

    /// Referral bonus is best-effort and logged, never allowed to unwind
    /// the purchase it follows (spec.md §7 Propagation).
    pub async fn trigger_referral_bonus(&self, buyer_id: Uuid, purchase_amount: Decimal) {
        match self
            .ledger
            .maybe_award_referral_bonus(buyer_id, purchase_amount)
            .await
        {
            Ok(Some(bonus)) => {
                tracing::info!(%buyer_id, %bonus, "referral bonus awarded");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%buyer_id, error = %e, "referral bonus trigger failed; purchase stands");
            }
        }
    }

    /// `validate(token_string) -> claims` (activating). Cache first, then
    /// storage; activates on first successful validation (spec.md §4.2).
    pub async fn validate(&self, secret: &str) -> Result<TokenClaims, ZncProxyError> {
        let secret_hash = secret::hash_secret(secret);
        let key = cache_key(&secret_hash);
        let now = self.clock.now();

        if let Ok(Some(json)) = self.cache.get_token(&key).await {
            if let Ok(claims) = serde_json::from_str::<TokenClaims>(&json) {
                // A cache hit is advisory, never definitive (spec.md §4.3):
                // re-check expiry against the current instant.
                if claims.expires_at.map(|e| now < e).unwrap_or(true) {
                    return Ok(claims);
                }
            }
        }

        // Activation is a read-then-write first-writer-wins transition, same
        // as every other mutating flow in this system (Ledger, Session
        // Tracker, Revoke): lock the row before deciding whether to flip it,
        // so two concurrent first validations of the same token can't both
        // observe `activated_at == None` and both activate with a different
        // `now`.
        let mut tx = self.db.begin().await?;
        let token = queries::get_token_by_secret_hash_for_update(&mut *tx, &secret_hash)
            .await?
            .ok_or(ZncProxyError::Unauthorized)?;

        let activated_at = if let Some(activated_at) = token.activated_at {
            let expiry = activated_at + chrono::Duration::hours(token.duration_hours as i64);
            if now >= expiry {
                return Err(ZncProxyError::Unauthorized);
            }
            activated_at
        } else {
            queries::activate_token(&mut *tx, token.id, now).await?;
            now
        };
        tx.commit().await?;

        let expires_at = Some(
            activated_at
                .checked_add_signed(chrono::Duration::hours(token.duration_hours as i64))
                .expect("duration_hours is bounded by the fixed price table"),
        );

        let claims = TokenClaims {
            user_id: token.user_id,
            token_id: token.id,
            duration_hours: token.duration_hours,
            scope: token.scope,
            expires_at,
            is_activated: true,
        };

        let ttl = expires_at.map(|e| (e - now).num_seconds()).unwrap_or(0);
        if let Ok(json) = serde_json::to_string(&claims) {
            if let Err(e) = self.cache.cache_token(&key, &json, ttl).await {
                tracing::warn!(error = %e, "token cache write failed; continuing without cache");
            }
        }

        Ok(claims)
    }

    /// `check_status(token_string) -> claims` (non-activating, spec.md
    /// §4.2): never mutates `activated_at`, never populates the cache for
    /// a not-yet-activated token.
    pub async fn check_status(&self, secret: &str) -> Result<TokenClaims, ZncProxyError> {
        let secret_hash = secret::hash_secret(secret);
        let now = self.clock.now();

        let token = queries::get_token_by_secret_hash(self.db.pool(), &secret_hash)
            .await?
            .ok_or(ZncProxyError::Unauthorized)?;

        let expires_at = token
            .activated_at
            .map(|a| a + chrono::Duration::hours(token.duration_hours as i64));

        if let Some(expiry) = expires_at {
            if now >= expiry {
                return Err(ZncProxyError::Unauthorized);
            }
        }

        Ok(TokenClaims {
            user_id: token.user_id,
            token_id: token.id,
            duration_hours: token.duration_hours,
            scope: token.scope,
            expires_at,
            is_activated: token.activated_at.is_some(),
        })
    }

    /// `revoke(token_id, user) -> refund_amount` (spec.md §4.2): full
    /// refund only when the token was never activated; no proration
    /// (see DESIGN.md for the §1/§4.2 resolution).
    pub async fn revoke(&self, token_id: Uuid, user_id: Uuid) -> Result<Decimal, ZncProxyError> {
        let mut tx = self.db.begin().await?;

        let token = queries::get_token_for_update(&mut *tx, token_id)
            .await?
            .ok_or_else(|| ZncProxyError::TokenNotFound(token_id.to_string()))?;

        if token.user_id != user_id || !token.is_active {
            return Err(ZncProxyError::TokenNotFound(token_id.to_string()));
        }
        if token.activated_at.is_some() {
            return Err(ZncProxyError::CannotRevokeActivated);
        }

        let price = price::price_for(token.duration_hours)
            .ok_or(ZncProxyError::InvalidDuration { hours: token.duration_hours })?;

        let now = self.clock.now();
        queries::revoke_token(&mut *tx, token_id, now).await?;
        self.ledger
            .apply(
                &mut tx,
                user_id,
                price,
                TransactionKind::Refund,
                "Refund: token revoked (not activated)",
                None,
            )
            .await?;

        tx.commit().await?;

        let key = cache_key(&token.secret_hash);
        if let Err(e) = self.cache.evict_token(&key).await {
            tracing::warn!(error = %e, "token cache eviction failed after revoke");
        }

        Ok(price)
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<AccessToken>, ZncProxyError> {
        queries::list_tokens_for_user(self.db.pool(), user_id, active_only).await
    }

    /// Idle-reap wiring point: exposed so a periodic task can evict
    /// expired-but-still-cached entries eagerly. Not required by spec.md
    /// (cache entries expire via TTL regardless); provided for symmetry
    /// with the Session Tracker's `reap_idle`.
    pub async fn evict_expired_from_cache(&self, secret_hash: &str) {
        let key = cache_key(secret_hash);
        let _ = self.cache.evict_token(&key).await;
    }

    #[allow(dead_code)]
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
