use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zncproxy_core::types::AccessScope;

/// What `validate`/`check_status` return on success (spec.md §4.2). Also
/// the shape cached in the Token Cache, keyed by `hex(SHA-256(secret))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub duration_hours: i32,
    pub scope: AccessScope,
    /// `None` until activation.
    pub expires_at: Option<DateTime<Utc>>,
    /// Only meaningful on `check_status`'s response shape (spec.md §6).
    pub is_activated: bool,
}

impl TokenClaims {
    pub fn time_remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expires_at.map(|e| (e - now).num_seconds().max(0))
    }
}
