//! Document storage boundary.
//!
//! Aggregates are persisted whole, keyed by their identifier, one collection
//! per aggregate type. Every write is a full replace of the stored document
//! (last write wins); callers do read-modify-write through
//! [`AggregateStore::load`] and [`AggregateStore::save`].

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use storefront_carts::Cart;
use storefront_catalog::Product;
use storefront_core::{AggregateRoot, IdStrategy, Identifier, RecordId};

pub use file::JsonFileStore;
pub use memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored document is malformed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(String),

    #[error("store lock poisoned")]
    Poisoned,
}

/// An aggregate that can be persisted as a JSON document.
pub trait Document:
    AggregateRoot + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection (file name, table partition) this aggregate lives in.
    const COLLECTION: &'static str;
}

impl Document for Product {
    const COLLECTION: &'static str = "products";
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";
}

/// Whole-document store for one aggregate type.
#[async_trait]
pub trait AggregateStore<A>: Send + Sync
where
    A: Document,
{
    /// Allocate a fresh identifier. Sequential identifiers are never reissued
    /// by the same store, even after the record holding them is removed.
    async fn next_id(&self) -> Result<A::Id, StoreError>;

    async fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError>;

    /// Every record in the collection, in no particular order.
    async fn load_all(&self) -> Result<Vec<A>, StoreError>;

    /// Insert or fully replace the record with the aggregate's id.
    async fn save(&self, aggregate: &A) -> Result<(), StoreError>;

    /// Remove a record, returning it if it existed.
    async fn remove(&self, id: &A::Id) -> Result<Option<A>, StoreError>;

    /// Remove every record, returning how many were removed.
    async fn remove_all(&self) -> Result<u64, StoreError>;
}

#[async_trait]
impl<A, S> AggregateStore<A> for Arc<S>
where
    A: Document,
    S: AggregateStore<A> + ?Sized,
{
    async fn next_id(&self) -> Result<A::Id, StoreError> {
        (**self).next_id().await
    }

    async fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        (**self).load(id).await
    }

    async fn load_all(&self) -> Result<Vec<A>, StoreError> {
        (**self).load_all().await
    }

    async fn save(&self, aggregate: &A) -> Result<(), StoreError> {
        (**self).save(aggregate).await
    }

    async fn remove(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        (**self).remove(id).await
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        (**self).remove_all().await
    }
}

/// Pick the next identifier under `strategy`, given the highest sequence
/// number already handed out or seen in storage.
pub(crate) fn allocate<I: Identifier>(strategy: IdStrategy, last_sequence: u64) -> (I, u64) {
    match strategy {
        IdStrategy::Sequential => {
            let next = last_sequence.saturating_add(1);
            (I::from_record(RecordId::sequential(next)), next)
        }
        IdStrategy::Random => (I::from_record(RecordId::token()), last_sequence),
    }
}
