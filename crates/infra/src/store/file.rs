//! JSON-file backed store.
//!
//! Each collection lives in `<data_dir>/<collection>.json` as a pretty-printed
//! JSON array. Writes go to a temp file in the same directory, are fsynced,
//! then renamed over the target, so readers see either the old or the new
//! array and never a torn one. A missing or empty file reads as an empty
//! collection.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use storefront_core::{AggregateRoot, IdStrategy, Identifier};

use super::{AggregateStore, Document, StoreError, allocate};

pub struct JsonFileStore<A> {
    path: PathBuf,
    strategy: IdStrategy,
    /// Serializes read-modify-write cycles and remembers the last sequence
    /// number handed out, so removing the newest record cannot recycle it.
    write_lock: Mutex<u64>,
    _marker: PhantomData<fn() -> A>,
}

impl<A: Document> JsonFileStore<A> {
    pub fn new(data_dir: impl AsRef<Path>, strategy: IdStrategy) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", A::COLLECTION)),
            strategy,
            write_lock: Mutex::new(0),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<A>, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_all(&self, records: &[A]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(records)?;
        let path = self.path.clone();
        debug!(collection = A::COLLECTION, records = records.len(), "writing collection");
        tokio::task::spawn_blocking(move || atomic_write(&path, &data))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

fn max_sequence<A: Document>(records: &[A]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.id().record().as_sequence())
        .max()
        .unwrap_or(0)
}

#[async_trait]
impl<A: Document> AggregateStore<A> for JsonFileStore<A> {
    async fn next_id(&self) -> Result<A::Id, StoreError> {
        let mut last = self.write_lock.lock().await;
        if self.strategy == IdStrategy::Sequential {
            let records = self.read_all().await?;
            *last = (*last).max(max_sequence(&records));
        }
        let (id, issued) = allocate(self.strategy, *last);
        *last = issued;
        Ok(id)
    }

    async fn load(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let records = self.read_all().await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    async fn load_all(&self) -> Result<Vec<A>, StoreError> {
        self.read_all().await
    }

    async fn save(&self, aggregate: &A) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        match records.iter_mut().find(|r| r.id() == aggregate.id()) {
            Some(existing) => *existing = aggregate.clone(),
            None => records.push(aggregate.clone()),
        }
        self.write_all(&records).await
    }

    async fn remove(&self, id: &A::Id) -> Result<Option<A>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_all().await?;
        let Some(pos) = records.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };
        let removed = records.remove(pos);
        self.write_all(&records).await?;
        Ok(Some(removed))
    }

    async fn remove_all(&self) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let records = self.read_all().await?;
        if records.is_empty() {
            return Ok(0);
        }
        self.write_all(&[]).await?;
        Ok(records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use storefront_carts::{Cart, CartId, Quantity};
    use storefront_catalog::ProductId;

    use super::*;

    fn store(dir: &tempfile::TempDir) -> JsonFileStore<Cart> {
        JsonFileStore::new(dir.path(), IdStrategy::Sequential)
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        assert!(store.load_all().await.unwrap().is_empty());
        assert_eq!(store.next_id().await.unwrap(), CartId::new(1u64));
    }

    #[tokio::test]
    async fn empty_file_is_an_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("carts.json"), "").unwrap();

        assert!(store(&dir).load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_are_visible_to_a_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut cart = Cart::new(CartId::new(1u64));
        cart.add_item(ProductId::new(4u64), Quantity::ONE).unwrap();
        store(&dir).save(&cart).await.unwrap();

        let reopened = store(&dir);
        assert_eq!(reopened.load(&CartId::new(1u64)).await.unwrap(), Some(cart));
        assert_eq!(reopened.next_id().await.unwrap(), CartId::new(2u64));

        let raw = std::fs::read_to_string(reopened.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[0]["products"][0]["productId"], 4);
    }

    #[tokio::test]
    async fn removing_the_newest_record_does_not_recycle_its_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let id = store.next_id().await.unwrap();
        store.save(&Cart::new(id)).await.unwrap();
        assert!(store.remove(&id).await.unwrap().is_some());

        assert_ne!(store.next_id().await.unwrap(), id);
    }

    #[tokio::test]
    async fn malformed_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("carts.json"), "{not json").unwrap();

        match store(&dir).load_all().await {
            Err(StoreError::Serialization(_)) => {}
            other => panic!("expected Serialization error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remove_all_reports_count_and_leaves_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        for _ in 0..3 {
            let id = store.next_id().await.unwrap();
            store.save(&Cart::new(id)).await.unwrap();
        }

        assert_eq!(store.remove_all().await.unwrap(), 3);
        assert_eq!(store.remove_all().await.unwrap(), 0);
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(serde_json::from_str::<Vec<Cart>>(&raw).unwrap(), vec![]);
    }

    #[tokio::test]
    async fn concurrent_saves_keep_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(store(&dir));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = store.next_id().await.unwrap();
                store.save(&Cart::new(id)).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 8);
    }
}
