use rand::Rng;
use redis::AsyncCommands;
use zncproxy_core::error::ZncProxyError;

use crate::client::CacheClient;

/// Outcome of one sliding-window check (spec.md §4.5 algorithm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlidingWindowOutcome {
    pub allowed: bool,
    /// Only meaningful when `allowed` is false.
    pub retry_after_secs: i64,
}

impl CacheClient {
    /// Sliding-window counter backed by a Redis sorted set, exactly as
    /// spec.md §4.5 describes: evict stale entries, count what remains,
    /// reject or admit-and-record.
    ///
    /// `now_secs` and `window_secs` are Unix-epoch seconds so the caller's
    /// `Clock` (not wall-clock `SystemTime`) drives the window, keeping
    /// rate-limiter tests as deterministic as the rest of the suite.
    pub async fn sliding_window_check(
        &self,
        key: &str,
        now_secs: i64,
        window_secs: i64,
        limit: u32,
    ) -> Result<SlidingWindowOutcome, ZncProxyError> {
        let mut conn = self.conn();
        let floor = now_secs - window_secs;

        let _: () = conn.zrembyscore(key, 0, floor).await?;
        let count: u64 = conn.zcard(key).await?;

        if count >= limit as u64 {
            let oldest: Vec<(String, f64)> = conn.zrange_withscores(key, 0, 0).await?;
            let retry_after = match oldest.first() {
                Some((_, score)) => ((*score as i64) + window_secs - now_secs).max(0),
                None => 0,
            };
            return Ok(SlidingWindowOutcome {
                allowed: false,
                retry_after_secs: retry_after,
            });
        }

        let nonce: u32 = rand::thread_rng().gen();
        let member = format!("{now_secs}:{nonce:08x}");
        let _: () = conn.zadd(key, member, now_secs as f64).await?;
        let _: () = conn.expire(key, window_secs).await?;

        Ok(SlidingWindowOutcome {
            allowed: true,
            retry_after_secs: 0,
        })
    }
}
