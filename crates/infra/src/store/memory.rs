use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use storefront_core::{AggregateRoot, IdStrategy, Identifier};

use super::{AggregateStore, Document, StoreError, allocate};

/// In-memory store for tests/dev. Contents are lost on drop.
#[derive(Debug)]
pub struct InMemoryStore<A: Document> {
    inner: RwLock<BTreeMap<A::Id, A>>,
    sequence: AtomicU64,
    strategy: IdStrategy,
}

impl<A: Document> InMemoryStore<A> {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            sequence: AtomicU64::new(0),
            strategy,
        }
    }

    /// Seed the store with existing records.
    pub fn with_records(strategy: IdStrategy, records: impl IntoIterator<Item = A>) -> Self {
        let store = Self::new(strategy);
        if let Ok(mut map) = store.inner.write() {
            for record in records {
                store.observe(record.id());
                map.insert(*record.id(), record);
            }
        }
        store
    }

    fn observe(&self, id: &A::Id) {
        if let Some(n) = id.record().as_sequence() {
            self.sequence.fetch_max(n, Ordering::SeqCst);
        }
    }
}

impl<A: Document> Default for InMemoryStore<A> {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

#[async_trait]
impl<A: Document> AggregateStore<A> for InMemoryStore<A> {
    async fn next_id(&self) -> Result<A::Id, StoreError> {
        let id = match self.strategy {
            IdStrategy::Sequential => {
                let last = self.sequence.fetch_add(1, Ordering::SeqCst);
                allocate(self.strategy, last).0
            }
            IdStrategy::Random => allocate(self.strategy, 0).0,
        };
        Ok(id)
    }

    async fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<A>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.values().cloned().collect())
    }

    async fn save(&self, aggregate: &A) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        self.observe(aggregate.id());
        map.insert(*aggregate.id(), aggregate.clone());
        Ok(())
    }

    async fn remove(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(map.remove(id))
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let removed = map.len() as u64;
        map.clear();
        Ok(removed)
    }
}
