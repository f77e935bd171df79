//! Per-entity query functions, generic over anything that implements
//! `sqlx::PgExecutor` so callers can pass either the pool directly or a
//! transaction mid-flight (needed for the row-locked multi-step flows in
//! the Ledger, Token Lifecycle, Session Tracker and Bundle Purchase
//! components).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;
use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::{AccessScope, PaymentStatus, TransactionKind};

use crate::models::{AccessToken, AuditLog, PaymentIntent, ProxySession, TokenBundle, Transaction, User};

// ── Users ──────────────────────────────────────────────────────────────────

pub async fn insert_user<'c>(
    ex: impl PgExecutor<'c>,
    email: &str,
    username: &str,
    credential_digest: &str,
    referral_code: &str,
    referred_by_id: Option<Uuid>,
) -> Result<User, ZncProxyError> {
    sqlx::query_as::<_, User>(
        r#"INSERT INTO users (email, username, credential_digest, referral_code, referred_by_id)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(email)
    .bind(username)
    .bind(credential_digest)
    .bind(referral_code)
    .bind(referred_by_id)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn get_user(ex: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>, ZncProxyError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn get_user_by_email(
    ex: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<User>, ZncProxyError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
        .bind(email)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn get_user_by_referral_code(
    ex: impl PgExecutor<'_>,
    code: &str,
) -> Result<Option<User>, ZncProxyError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

/// Acquires the exclusive row lock spec.md §4.1 requires for balance
/// mutation.
pub async fn get_user_for_update(
    ex: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<User>, ZncProxyError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn set_user_balance(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    new_balance: Decimal,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE users SET currency_balance = $2 WHERE id = $1")
        .bind(id)
        .bind(new_balance)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn increment_referral_bonus_earned(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    delta: Decimal,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE users SET referral_bonus_earned = referral_bonus_earned + $2 WHERE id = $1")
        .bind(id)
        .bind(delta)
        .execute(ex)
        .await?;
    Ok(())
}

/// Count of the buyer's purchase-kind transactions whose absolute amount
/// exceeds `threshold` — used by the referral-bonus "first qualifying
/// purchase" rule (spec.md §4.1).
pub async fn count_large_purchases(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    threshold: Decimal,
) -> Result<i64, ZncProxyError> {
    let (count,): (i64,) = sqlx::query_as(
        r#"SELECT COUNT(*) FROM transactions
           WHERE user_id = $1 AND kind = 'purchase' AND abs(amount) > $2"#,
    )
    .bind(user_id)
    .bind(threshold)
    .fetch_one(ex)
    .await?;
    Ok(count)
}

// ── Access tokens ────────────────────────────────────────────────────────────

pub async fn insert_token(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    secret_hash: &str,
    duration_hours: i32,
    scope: AccessScope,
) -> Result<AccessToken, ZncProxyError> {
    sqlx::query_as::<_, AccessToken>(
        r#"INSERT INTO access_tokens (user_id, secret_hash, duration_hours, scope)
           VALUES ($1, $2, $3, $4)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(secret_hash)
    .bind(duration_hours)
    .bind(scope)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn get_token(
    ex: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<AccessToken>, ZncProxyError> {
    sqlx::query_as::<_, AccessToken>("SELECT * FROM access_tokens WHERE id = $1")
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn get_token_for_update(
    ex: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<AccessToken>, ZncProxyError> {
    sqlx::query_as::<_, AccessToken>("SELECT * FROM access_tokens WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn get_token_by_secret_hash(
    ex: impl PgExecutor<'_>,
    secret_hash: &str,
) -> Result<Option<AccessToken>, ZncProxyError> {
    sqlx::query_as::<_, AccessToken>(
        "SELECT * FROM access_tokens WHERE secret_hash = $1 AND is_active AND revoked_at IS NULL",
    )
    .bind(secret_hash)
    .fetch_optional(ex)
    .await
    .map_err(Into::into)
}

pub async fn get_token_by_secret_hash_for_update(
    ex: impl PgExecutor<'_>,
    secret_hash: &str,
) -> Result<Option<AccessToken>, ZncProxyError> {
    sqlx::query_as::<_, AccessToken>(
        "SELECT * FROM access_tokens WHERE secret_hash = $1 AND is_active AND revoked_at IS NULL FOR UPDATE",
    )
    .bind(secret_hash)
    .fetch_optional(ex)
    .await
    .map_err(Into::into)
}

pub async fn list_tokens_for_user(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    active_only: bool,
) -> Result<Vec<AccessToken>, ZncProxyError> {
    let sql = if active_only {
        "SELECT * FROM access_tokens WHERE user_id = $1 AND is_active ORDER BY created_at DESC"
    } else {
        "SELECT * FROM access_tokens WHERE user_id = $1 ORDER BY created_at DESC"
    };
    sqlx::query_as::<_, AccessToken>(sql)
        .bind(user_id)
        .fetch_all(ex)
        .await
        .map_err(Into::into)
}

pub async fn activate_token(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    activated_at: DateTime<Utc>,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE access_tokens SET activated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(activated_at)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn revoke_token(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    revoked_at: DateTime<Utc>,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE access_tokens SET is_active = FALSE, revoked_at = $2 WHERE id = $1")
        .bind(id)
        .bind(revoked_at)
        .execute(ex)
        .await?;
    Ok(())
}

// ── Transactions ─────────────────────────────────────────────────────────────

pub async fn insert_transaction(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    amount: Decimal,
    kind: TransactionKind,
    description: &str,
    external_ref: Option<&str>,
) -> Result<Transaction, ZncProxyError> {
    sqlx::query_as::<_, Transaction>(
        r#"INSERT INTO transactions (user_id, amount, kind, description, external_ref)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(kind)
    .bind(description)
    .bind(external_ref)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn list_transactions_for_user(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    kind: Option<TransactionKind>,
    limit: i64,
    offset: i64,
) -> Result<Vec<Transaction>, ZncProxyError> {
    match kind {
        Some(k) => sqlx::query_as::<_, Transaction>(
            r#"SELECT * FROM transactions WHERE user_id = $1 AND kind = $2
               ORDER BY created_at DESC LIMIT $3 OFFSET $4"#,
        )
        .bind(user_id)
        .bind(k)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
        .map_err(Into::into),
        None => sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
        .map_err(Into::into),
    }
}

pub async fn count_transactions_for_user(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    kind: Option<TransactionKind>,
) -> Result<i64, ZncProxyError> {
    let (count,): (i64,) = match kind {
        Some(k) => sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(k)
            .fetch_one(ex)
            .await?,
        None => sqlx::query_as("SELECT COUNT(*) FROM transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(ex)
            .await?,
    };
    Ok(count)
}

// ── Proxy sessions ───────────────────────────────────────────────────────────

pub async fn get_active_session_for_token_for_update(
    ex: impl PgExecutor<'_>,
    token_id: Uuid,
) -> Result<Option<ProxySession>, ZncProxyError> {
    sqlx::query_as::<_, ProxySession>(
        "SELECT * FROM proxy_sessions WHERE token_id = $1 AND is_active FOR UPDATE",
    )
    .bind(token_id)
    .fetch_optional(ex)
    .await
    .map_err(Into::into)
}

pub async fn insert_session(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    token_id: Uuid,
    device_id: &str,
    client_ip: &str,
    user_agent: &str,
    bytes: i64,
) -> Result<ProxySession, ZncProxyError> {
    sqlx::query_as::<_, ProxySession>(
        r#"INSERT INTO proxy_sessions (user_id, token_id, device_id, client_ip, user_agent, bytes_total, request_count)
           VALUES ($1, $2, $3, $4, $5, $6, 1)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(token_id)
    .bind(device_id)
    .bind(client_ip)
    .bind(user_agent)
    .bind(bytes)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn touch_session(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    now: DateTime<Utc>,
    client_ip: &str,
    user_agent: &str,
    bytes_delta: i64,
) -> Result<ProxySession, ZncProxyError> {
    sqlx::query_as::<_, ProxySession>(
        r#"UPDATE proxy_sessions
           SET last_activity_at = $2, client_ip = $3, user_agent = $4,
               bytes_total = bytes_total + $5, request_count = request_count + 1
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(now)
    .bind(client_ip)
    .bind(user_agent)
    .bind(bytes_delta)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn close_session(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    ended_at: DateTime<Utc>,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE proxy_sessions SET is_active = FALSE, ended_at = $2 WHERE id = $1")
        .bind(id)
        .bind(ended_at)
        .execute(ex)
        .await?;
    Ok(())
}

/// Bulk-close sessions idle since before `cutoff` (spec.md §4.4 idle
/// reaping). Returns the number of sessions closed.
pub async fn reap_idle_sessions(
    ex: impl PgExecutor<'_>,
    cutoff: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, ZncProxyError> {
    let result = sqlx::query(
        "UPDATE proxy_sessions SET is_active = FALSE, ended_at = $2 WHERE is_active AND last_activity_at < $1",
    )
    .bind(cutoff)
    .bind(now)
    .execute(ex)
    .await?;
    Ok(result.rows_affected())
}

pub async fn list_active_sessions_for_user(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Vec<ProxySession>, ZncProxyError> {
    sqlx::query_as::<_, ProxySession>(
        "SELECT * FROM proxy_sessions WHERE user_id = $1 AND is_active ORDER BY started_at DESC",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await
    .map_err(Into::into)
}

// ── Token bundles ────────────────────────────────────────────────────────────

pub async fn get_bundle_active(
    ex: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<Option<TokenBundle>, ZncProxyError> {
    sqlx::query_as::<_, TokenBundle>("SELECT * FROM token_bundles WHERE id = $1 AND is_active")
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(Into::into)
}

pub async fn list_bundles(
    ex: impl PgExecutor<'_>,
    active_only: bool,
) -> Result<Vec<TokenBundle>, ZncProxyError> {
    let sql = if active_only {
        "SELECT * FROM token_bundles WHERE is_active ORDER BY total_price"
    } else {
        "SELECT * FROM token_bundles ORDER BY total_price"
    };
    sqlx::query_as::<_, TokenBundle>(sql)
        .fetch_all(ex)
        .await
        .map_err(Into::into)
}

// ── Audit logs ───────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub async fn insert_audit_log(
    ex: impl PgExecutor<'_>,
    actor_user_id: Option<Uuid>,
    action: &str,
    target_type: &str,
    target_id: Option<&str>,
    details: serde_json::Value,
    client_ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<AuditLog, ZncProxyError> {
    sqlx::query_as::<_, AuditLog>(
        r#"INSERT INTO audit_logs (actor_user_id, action, target_type, target_id, details, client_ip, user_agent)
           VALUES ($1, $2, $3, $4, $5, $6, $7)
           RETURNING *"#,
    )
    .bind(actor_user_id)
    .bind(action)
    .bind(target_type)
    .bind(target_id)
    .bind(details)
    .bind(client_ip)
    .bind(user_agent)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

// ── Payment intents ──────────────────────────────────────────────────────────

pub async fn insert_payment_intent(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    amount_znc: Decimal,
    external_id: &str,
) -> Result<PaymentIntent, ZncProxyError> {
    sqlx::query_as::<_, PaymentIntent>(
        r#"INSERT INTO payment_intents (user_id, amount_znc, external_id)
           VALUES ($1, $2, $3)
           RETURNING *"#,
    )
    .bind(user_id)
    .bind(amount_znc)
    .bind(external_id)
    .fetch_one(ex)
    .await
    .map_err(Into::into)
}

pub async fn get_payment_intent_for_update(
    ex: impl PgExecutor<'_>,
    external_id: &str,
) -> Result<Option<PaymentIntent>, ZncProxyError> {
    sqlx::query_as::<_, PaymentIntent>(
        "SELECT * FROM payment_intents WHERE external_id = $1 FOR UPDATE",
    )
    .bind(external_id)
    .fetch_optional(ex)
    .await
    .map_err(Into::into)
}

pub async fn resolve_payment_intent(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    status: PaymentStatus,
    resolved_at: DateTime<Utc>,
) -> Result<(), ZncProxyError> {
    sqlx::query("UPDATE payment_intents SET status = $2, resolved_at = $3 WHERE id = $1")
        .bind(id)
        .bind(status)
        .bind(resolved_at)
        .execute(ex)
        .await?;
    Ok(())
}
