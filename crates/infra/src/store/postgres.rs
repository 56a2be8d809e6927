//! Postgres-backed document store.
//!
//! All collections share one table; each row holds a whole aggregate as
//! JSONB, keyed by `(collection, id)`. Sequential identifiers are mirrored
//! into `seq` so the next one can be derived with `MAX(seq)`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | Database / PoolClosed / other | `Database` |
//! | JSONB payload that does not decode | `Serialization` |

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use tracing::instrument;

use storefront_core::{AggregateRoot, IdStrategy, Identifier};

use super::{AggregateStore, Document, StoreError, allocate};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS storefront_documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    seq        BIGINT,
    doc        JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (collection, id)
)
"#;

/// Create the document table if it does not exist yet.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("migrate", e))?;
    Ok(())
}

pub struct PostgresStore<A> {
    pool: Arc<PgPool>,
    strategy: IdStrategy,
    last_issued: Mutex<u64>,
    _marker: PhantomData<fn() -> A>,
}

impl<A: Document> PostgresStore<A> {
    pub fn new(pool: PgPool, strategy: IdStrategy) -> Self {
        Self {
            pool: Arc::new(pool),
            strategy,
            last_issued: Mutex::new(0),
            _marker: PhantomData,
        }
    }

    /// Apply the table DDL using this store's pool.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        migrate(&self.pool).await
    }
}

fn key<A: Document>(id: &A::Id) -> (String, Option<i64>) {
    let record = id.record();
    let seq = record.as_sequence().and_then(|n| i64::try_from(n).ok());
    (record.to_string(), seq)
}

fn decode<A: Document>(row: &sqlx::postgres::PgRow) -> Result<A, StoreError> {
    let doc: JsonValue = row.try_get("doc").map_err(|e| map_sqlx_error("decode", e))?;
    Ok(serde_json::from_value(doc)?)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Database(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}

#[async_trait]
impl<A: Document> AggregateStore<A> for PostgresStore<A> {
    #[instrument(skip(self), fields(collection = A::COLLECTION), err)]
    async fn next_id(&self) -> Result<A::Id, StoreError> {
        let mut last = self.last_issued.lock().await;
        if self.strategy == IdStrategy::Sequential {
            let row = sqlx::query(
                "SELECT COALESCE(MAX(seq), 0) AS max_seq FROM storefront_documents WHERE collection = $1",
            )
            .bind(A::COLLECTION)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("next_id", e))?;
            let max: i64 = row.try_get("max_seq").map_err(|e| map_sqlx_error("next_id", e))?;
            *last = (*last).max(u64::try_from(max).unwrap_or(0));
        }
        let (id, issued) = allocate(self.strategy, *last);
        *last = issued;
        Ok(id)
    }

    #[instrument(skip(self), fields(collection = A::COLLECTION), err)]
    async fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let (id, _) = key::<A>(id);
        let row = sqlx::query("SELECT doc FROM storefront_documents WHERE collection = $1 AND id = $2")
            .bind(A::COLLECTION)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load", e))?;
        row.as_ref().map(decode::<A>).transpose()
    }

    #[instrument(skip(self), fields(collection = A::COLLECTION), err)]
    async fn load_all(&self) -> Result<Vec<A>, StoreError> {
        let rows = sqlx::query(
            "SELECT doc FROM storefront_documents WHERE collection = $1 ORDER BY seq NULLS LAST, id",
        )
        .bind(A::COLLECTION)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_all", e))?;
        rows.iter().map(decode::<A>).collect()
    }

    #[instrument(skip(self, aggregate), fields(collection = A::COLLECTION), err)]
    async fn save(&self, aggregate: &A) -> Result<(), StoreError> {
        let (id, seq) = key::<A>(aggregate.id());
        let doc = serde_json::to_value(aggregate)?;
        sqlx::query(
            r#"
            INSERT INTO storefront_documents (collection, id, seq, doc, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (collection, id)
            DO UPDATE SET doc = EXCLUDED.doc, seq = EXCLUDED.seq, updated_at = now()
            "#,
        )
        .bind(A::COLLECTION)
        .bind(id)
        .bind(seq)
        .bind(doc)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(collection = A::COLLECTION), err)]
    async fn remove(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let (id, _) = key::<A>(id);
        let row = sqlx::query(
            "DELETE FROM storefront_documents WHERE collection = $1 AND id = $2 RETURNING doc",
        )
        .bind(A::COLLECTION)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove", e))?;
        row.as_ref().map(decode::<A>).transpose()
    }

    #[instrument(skip(self), fields(collection = A::COLLECTION), err)]
    async fn remove_all(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM storefront_documents WHERE collection = $1")
            .bind(A::COLLECTION)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_all", e))?;
        Ok(result.rows_affected())
    }
}
