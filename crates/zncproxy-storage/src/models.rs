//! Row types mirroring the `0001_init.sql` schema (spec.md §3).

use chrono::{DateTime, Utc};
use serde::Serialize;
use rust_decimal::Decimal;
use uuid::Uuid;
use zncproxy_core::types::{AccessScope, PaymentStatus, TransactionKind};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub credential_digest: String,
    pub is_active: bool,
    pub is_elevated: bool,
    pub currency_balance: Decimal,
    pub referral_code: String,
    pub referred_by_id: Option<Uuid>,
    pub referral_bonus_earned: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub secret_hash: String,
    pub duration_hours: i32,
    pub scope: AccessScope,
    pub created_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Derived expiry; `None` until activation (spec.md §3).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.activated_at
            .map(|a| a + chrono::Duration::hours(self.duration_hours as i64))
    }

    /// `active ∧ revocation_time is null ∧ (activation_time is null ∨ now < expiry)`.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || self.revoked_at.is_some() {
            return false;
        }
        match self.expires_at() {
            Some(expiry) => now < expiry,
            None => true,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub description: String,
    pub external_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProxySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub device_id: String,
    pub client_ip: String,
    pub user_agent: String,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub bytes_total: i64,
    pub request_count: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TokenBundle {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub token_count: i32,
    pub duration_hours: i32,
    pub scope: AccessScope,
    pub discount_percent: Decimal,
    pub base_price: Decimal,
    pub total_price: Decimal,
    pub is_active: bool,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub action: String,
    pub target_type: String,
    pub target_id: Option<String>,
    pub details: serde_json::Value,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_znc: Decimal,
    pub external_id: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}
