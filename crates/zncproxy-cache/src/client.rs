use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use zncproxy_core::error::ZncProxyError;

/// A shared Redis connection. Cloning is cheap — `ConnectionManager`
/// multiplexes over a single connection and reconnects transparently.
#[derive(Clone)]
pub struct CacheClient {
    conn: ConnectionManager,
}

impl CacheClient {
    pub async fn connect(redis_url: &str) -> Result<Self, ZncProxyError> {
        let client = redis::Client::open(redis_url).map_err(ZncProxyError::from)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<(), ZncProxyError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// Cache an activated token's serialized claims with the TTL equal to
    /// its remaining validity (spec.md §4.3). A `ttl_secs <= 0` is treated
    /// as already-expired and is not written.
    pub async fn cache_token(
        &self,
        key: &str,
        claims_json: &str,
        ttl_secs: i64,
    ) -> Result<(), ZncProxyError> {
        if ttl_secs <= 0 {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, claims_json, ttl_secs as u64)
            .await?;
        Ok(())
    }

    pub async fn get_token(&self, key: &str) -> Result<Option<String>, ZncProxyError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn evict_token(&self, key: &str) -> Result<(), ZncProxyError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}
