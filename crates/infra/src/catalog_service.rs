//! Catalog operations over an [`AggregateStore`] of products.
//!
//! Each mutation is a read-modify-write against the store. Observers are told
//! about a change only after the store accepted it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use storefront_catalog::query::{self, ListQuery, Page};
use storefront_catalog::{CatalogEvent, CatalogObserver, NewProduct, Product, ProductId, ProductPatch};
use storefront_core::{DomainError, Identifier};

use crate::error::ServiceResult;
use crate::store::AggregateStore;

pub struct CatalogService<S> {
    store: S,
    observers: Vec<Arc<dyn CatalogObserver>>,
}

impl<S> CatalogService<S>
where
    S: AggregateStore<Product>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CatalogObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn list_products(&self, query: &ListQuery) -> ServiceResult<Page<Product>> {
        let products = self.store.load_all().await?;
        Ok(query::list(products, query))
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .load(&id)
            .await?
            .ok_or_else(|| DomainError::ProductNotFound(id.record()).into())
    }

    pub async fn add_product(&self, fields: NewProduct) -> ServiceResult<Product> {
        fields.validate()?;
        let id = self.store.next_id().await?;
        let product = Product::create(id, fields)?;
        self.store.save(&product).await?;

        self.emit(CatalogEvent::added(product.clone()));
        Ok(product)
    }

    /// Apply a partial update. An empty patch returns the product unchanged
    /// without writing.
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        let mut product = self.get_product(id).await?;
        if patch.is_empty() {
            return Ok(product);
        }
        product.apply_patch(patch)?;
        self.store.save(&product).await?;

        self.emit(CatalogEvent::updated(product.clone()));
        Ok(product)
    }

    /// Remove a product and return it. Carts that reference it are left as
    /// they are.
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<Product> {
        let removed = self
            .store
            .remove(&id)
            .await?
            .ok_or(DomainError::ProductNotFound(id.record()))?;

        self.emit(CatalogEvent::deleted(id));
        Ok(removed)
    }

    /// Notify every observer. The write is already committed, so a panicking
    /// observer is contained and the remaining observers still run.
    fn emit(&self, event: CatalogEvent) {
        for observer in &self.observers {
            let _ = panic::catch_unwind(AssertUnwindSafe(|| observer.notify(&event)));
        }
    }
}
