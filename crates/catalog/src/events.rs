//! Catalog change notifications.
//!
//! The catalog service invokes every registered [`CatalogObserver`] after a
//! mutation has been persisted. How the notification travels further (SSE,
//! websockets, a message broker) is up to the observer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::product::{Product, ProductId};

/// Event: ProductAdded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAdded {
    pub product: Product,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductUpdated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdated {
    pub product: Product,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ProductDeleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDeleted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogEvent {
    ProductAdded(ProductAdded),
    ProductUpdated(ProductUpdated),
    ProductDeleted(ProductDeleted),
}

impl CatalogEvent {
    pub fn added(product: Product) -> Self {
        Self::ProductAdded(ProductAdded {
            product,
            occurred_at: Utc::now(),
        })
    }

    pub fn updated(product: Product) -> Self {
        Self::ProductUpdated(ProductUpdated {
            product,
            occurred_at: Utc::now(),
        })
    }

    pub fn deleted(product_id: ProductId) -> Self {
        Self::ProductDeleted(ProductDeleted {
            product_id,
            occurred_at: Utc::now(),
        })
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProductAdded(_) => "catalog.product.added",
            Self::ProductUpdated(_) => "catalog.product.updated",
            Self::ProductDeleted(_) => "catalog.product.deleted",
        }
    }

    pub fn product_id(&self) -> ProductId {
        match self {
            Self::ProductAdded(e) => e.product.id_typed(),
            Self::ProductUpdated(e) => e.product.id_typed(),
            Self::ProductDeleted(e) => e.product_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::ProductAdded(e) => e.occurred_at,
            Self::ProductUpdated(e) => e.occurred_at,
            Self::ProductDeleted(e) => e.occurred_at,
        }
    }
}

/// Hook invoked after a catalog mutation succeeds.
///
/// Implementations must not block; delivery is best-effort.
pub trait CatalogObserver: Send + Sync {
    fn notify(&self, event: &CatalogEvent);
}

impl<F> CatalogObserver for F
where
    F: Fn(&CatalogEvent) + Send + Sync,
{
    fn notify(&self, event: &CatalogEvent) {
        self(event)
    }
}
