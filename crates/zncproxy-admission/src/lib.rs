//! Admission Pipeline (C9): composes Token Lifecycle, Scope Policy,
//! Session Tracker, and Rate Limiter into the exact per-request order of
//! spec.md §4.9 for every proxied HTTP/WS request.
//!
//! Grounded on `chronx-state/src/engine.rs`'s `apply()` discipline —
//! validate every stage before committing any side effect — adapted from
//! a single atomic DB commit to a pipeline where each stage's own
//! component owns its commit, but the fail-fast, no-partial-side-effect
//! shape is the same: a rejection at stage N never runs stage N+1.

use std::sync::Arc;

use uuid::Uuid;

use zncproxy_core::clock::Clock;
use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::{AccessScope, RateLimitClass};
use zncproxy_ratelimit::RateLimiter;
use zncproxy_sessions::SessionTracker;
use zncproxy_storage::{queries, StorageDb};
use zncproxy_tokens::TokenLifecycle;

const MIN_DEVICE_ID_LEN: usize = 8;
const MAX_DEVICE_ID_LEN: usize = 255;

pub struct AdmissionRequest {
    pub device_id: Option<String>,
    pub secret: Option<String>,
    pub path: String,
    pub client_ip: String,
    pub user_agent: String,
}

/// What survives admission: enough to forward the request and to key the
/// audit/log trail, without re-exposing the bearer secret.
pub struct Admitted {
    pub user_id: Uuid,
    pub token_id: Uuid,
    pub scope: AccessScope,
}

#[derive(Clone)]
pub struct AdmissionPipeline {
    db: StorageDb,
    tokens: TokenLifecycle,
    sessions: SessionTracker,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
}

impl AdmissionPipeline {
    pub fn new(
        db: StorageDb,
        tokens: TokenLifecycle,
        sessions: SessionTracker,
        limiter: RateLimiter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            tokens,
            sessions,
            limiter,
            clock,
        }
    }

    /// Runs stages (1)-(6) of spec.md §4.9; stage (7), the actual forward,
    /// is the caller's job once it holds an `Admitted`.
    pub async fn admit(&self, req: AdmissionRequest) -> Result<Admitted, ZncProxyError> {
        if req.path.ends_with(".map") {
            return Err(ZncProxyError::NotFound(req.path));
        }

        let device_id = req.device_id.ok_or(ZncProxyError::MissingDeviceId)?;
        if device_id.len() < MIN_DEVICE_ID_LEN || device_id.len() > MAX_DEVICE_ID_LEN {
            return Err(ZncProxyError::InvalidDeviceId);
        }

        let secret = req.secret.ok_or(ZncProxyError::Unauthorized)?;
        let claims = self.tokens.validate(&secret).await?;

        if !zncproxy_scope::authorize(&req.path, claims.scope) {
            return Err(ZncProxyError::Forbidden);
        }

        let now = self.clock.now();

        match self
            .sessions
            .track(
                claims.user_id,
                claims.token_id,
                &device_id,
                &req.client_ip,
                &req.user_agent,
                0,
                now,
            )
            .await
        {
            Ok(_) => {}
            Err(e @ ZncProxyError::DeviceConflict { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "session tracking failed; proceeding without session state");
            }
        }

        let is_elevated = queries::get_user(self.db.pool(), claims.user_id)
            .await?
            .map(|u| u.is_elevated)
            .unwrap_or(false);

        self.limiter
            .check(
                RateLimitClass::Proxy,
                &claims.token_id.to_string(),
                now,
                is_elevated,
            )
            .await?;

        Ok(Admitted {
            user_id: claims.user_id,
            token_id: claims.token_id,
            scope: claims.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_map_paths_are_recognized() {
        assert!("app.js.map".ends_with(".map"));
        assert!(!"app.js".ends_with(".map"));
    }

    #[test]
    fn device_id_length_bounds_match_spec() {
        assert_eq!(MIN_DEVICE_ID_LEN, 8);
        assert_eq!(MAX_DEVICE_ID_LEN, 255);
    }
}
