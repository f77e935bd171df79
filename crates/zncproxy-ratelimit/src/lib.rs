//! Rate Limiter (C5): the three limit classes of spec.md §4.5 layered over
//! `zncproxy_cache`'s sliding-window primitive, with the admin-bypass and
//! fail-open policies of spec.md §4.5 Policies.

use chrono::{DateTime, Utc};
use zncproxy_cache::CacheClient;
use zncproxy_core::error::ZncProxyError;
use zncproxy_core::types::RateLimitClass;

#[derive(Clone)]
pub struct RateLimiter {
    cache: CacheClient,
}

impl RateLimiter {
    pub fn new(cache: CacheClient) -> Self {
        Self { cache }
    }

    /// Checks and records one request against `class`'s window, keyed by
    /// `identifier`. Bypassed entirely for elevated principals. Fails open
    /// (allows, logs a warning) if the cache backend is unreachable.
    pub async fn check(
        &self,
        class: RateLimitClass,
        identifier: &str,
        now: DateTime<Utc>,
        is_elevated: bool,
    ) -> Result<(), ZncProxyError> {
        if is_elevated {
            return Ok(());
        }

        let (limit, window) = class.limit();
        let key = format!("rate_limit:{}:{}", class.as_str(), identifier);

        match self
            .cache
            .sliding_window_check(&key, now.timestamp(), window, limit)
            .await
        {
            Ok(outcome) if outcome.allowed => Ok(()),
            Ok(outcome) => Err(ZncProxyError::RateLimitExceeded {
                limit,
                window,
                retry_after: outcome.retry_after_secs,
            }),
            Err(e) => {
                tracing::warn!(error = %e, class = class.as_str(), "rate limiter backend unreachable, failing open");
                Ok(())
            }
        }
    }
}
