use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{Collection, DocumentStore, Filter, StoreError, Write, WriteBatch};

/// PostgreSQL backend keeping every collection in one JSONB table.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Value>, StoreError> {
        let body = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(body)
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let bodies = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 ORDER BY id",
        )
        .bind(collection.as_str())
        .bind(filter.as_value())
        .fetch_all(&self.pool)
        .await?;
        Ok(bodies)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for write in batch.into_writes() {
            match write {
                Write::Set {
                    collection,
                    id,
                    body,
                } => {
                    sqlx::query(
                        "INSERT INTO documents (collection, id, body, updated_at) \
                         VALUES ($1, $2, $3, NOW()) \
                         ON CONFLICT (collection, id) DO UPDATE \
                         SET body = EXCLUDED.body, updated_at = NOW()",
                    )
                    .bind(collection.as_str())
                    .bind(&id)
                    .bind(&body)
                    .execute(&mut *tx)
                    .await?;
                }
                Write::Delete { collection, id } => {
                    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}
