use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use super::{KvStore, StoreError, WriteBatch, WriteOp};

/// PostgreSQL-backed store. One row per document in `kv_entries`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        log::info!("Database migrations complete");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl KvStore for PgStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Json<Value>,)> = sqlx::query_as(
            "SELECT value FROM kv_entries WHERE namespace = $1 AND key = $2",
        )
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(Json(value),)| value))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for op in batch.ops() {
            match op {
                WriteOp::Put { namespace, key, value } => {
                    sqlx::query(
                        "INSERT INTO kv_entries (namespace, key, value) VALUES ($1, $2, $3) \
                         ON CONFLICT (namespace, key) \
                         DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
                    )
                    .bind(namespace)
                    .bind(key)
                    .bind(Json(value))
                    .execute(&mut *tx)
                    .await?;
                }
                WriteOp::Delete { namespace, key } => {
                    sqlx::query("DELETE FROM kv_entries WHERE namespace = $1 AND key = $2")
                        .bind(namespace)
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
