use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use zncproxy_core::error::ZncProxyError;

/// Thin wrapper over a Postgres connection pool, grounded on the
/// teacher's one-struct-per-entity-method convention (`chronx-state::db`),
/// adapted from an embedded sled tree to a pooled relational connection.
#[derive(Clone)]
pub struct StorageDb {
    pool: PgPool,
}

impl StorageDb {
    pub async fn connect(database_url: &str) -> Result<Self, ZncProxyError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), ZncProxyError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ZncProxyError::Storage(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Start a serializable-enough (read-committed default) transaction.
    /// Callers use `SELECT ... FOR UPDATE` for the row locks spec.md §5
    /// requires; Postgres's read-committed isolation plus an explicit row
    /// lock gives the "exclusive row lock on the user/token" contract.
    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, ZncProxyError> {
        self.pool.begin().await.map_err(Into::into)
    }

    /// Probed by `/health` (§4.13): a trivial round-trip.
    pub async fn ping(&self) -> Result<(), ZncProxyError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
