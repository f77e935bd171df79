//! Session Tracker (C4): the one-session-per-token invariant, device-ID
//! conflict detection, and idle reaping (spec.md §4.4).
//!
//! Grounded on `original_source/app/services/session_service.py`'s
//! `track_request` — select the sole active session for a token, compare
//! `device_id`, either refresh in place or fail with a device conflict —
//! reshaped onto `zncproxy-storage`'s row-locked query set so the
//! select-then-act sequence is race-free under concurrent requests for the
//! same token.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use zncproxy_core::error::ZncProxyError;
use zncproxy_storage::models::ProxySession;
use zncproxy_storage::{queries, StorageDb};

/// Default idle cutoff before a session is reaped (spec.md §4.4, §8 B5).
pub const DEFAULT_IDLE_MINUTES: i64 = 5;

/// How much of the conflicting device's id to surface in the 409 message
/// (spec.md §4.4: "a truncated prefix of the other device").
const DEVICE_PREFIX_LEN: usize = 8;

#[derive(Clone)]
pub struct SessionTracker {
    db: StorageDb,
}

impl SessionTracker {
    pub fn new(db: StorageDb) -> Self {
        Self { db }
    }

    /// `track(user, token, device_id, ip, user_agent, bytes=0) -> session`
    /// (spec.md §4.4). Runs inside its own transaction: locks the token's
    /// sole active session row (if any) before deciding to update or
    /// insert, closing the window where two concurrent requests for the
    /// same token on different devices could both observe "no active
    /// session" and each insert one.
    pub async fn track(
        &self,
        user_id: Uuid,
        token_id: Uuid,
        device_id: &str,
        client_ip: &str,
        user_agent: &str,
        bytes: i64,
        now: DateTime<Utc>,
    ) -> Result<ProxySession, ZncProxyError> {
        let mut tx = self.db.begin().await?;

        let existing =
            queries::get_active_session_for_token_for_update(&mut *tx, token_id).await?;

        let session = match existing {
            Some(active) if active.device_id != device_id => {
                tx.rollback().await?;
                return Err(ZncProxyError::DeviceConflict {
                    since: active.started_at,
                    other_device_prefix: truncate(&active.device_id, DEVICE_PREFIX_LEN),
                });
            }
            Some(active) => {
                queries::touch_session(&mut *tx, active.id, now, client_ip, user_agent, bytes)
                    .await?
            }
            None => {
                queries::insert_session(
                    &mut *tx, user_id, token_id, device_id, client_ip, user_agent, bytes,
                )
                .await?
            }
        };

        tx.commit().await?;
        Ok(session)
    }

    /// `close(session_id)` (spec.md §4.4).
    pub async fn close(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<(), ZncProxyError> {
        queries::close_session(self.db.pool(), session_id, now).await
    }

    /// `reap_idle(threshold)` (spec.md §4.4, §8 B5). `threshold` is the
    /// idle duration, not an absolute cutoff; the cutoff instant is
    /// computed from `now`.
    pub async fn reap_idle(
        &self,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, ZncProxyError> {
        let cutoff = now - threshold;
        let reaped = queries::reap_idle_sessions(self.db.pool(), cutoff, now).await?;
        if reaped > 0 {
            tracing::info!(count = reaped, "reaped idle proxy sessions");
        }
        Ok(reaped)
    }

    /// `active_for(user?)` (spec.md §4.4).
    pub async fn active_for(&self, user_id: Uuid) -> Result<Vec<ProxySession>, ZncProxyError> {
        queries::list_active_sessions_for_user(self.db.pool(), user_id).await
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_prefix_truncates_to_exact_length() {
        assert_eq!(truncate("0123456789abcdef", DEVICE_PREFIX_LEN), "01234567");
    }

    #[test]
    fn device_prefix_handles_short_ids() {
        assert_eq!(truncate("abc", DEVICE_PREFIX_LEN), "abc");
    }

    #[test]
    fn default_idle_window_is_five_minutes() {
        assert_eq!(DEFAULT_IDLE_MINUTES, 5);
    }
}
