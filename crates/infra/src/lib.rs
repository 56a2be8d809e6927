//! Infrastructure layer: document stores and the services that drive the
//! catalog and cart aggregates through them.

pub mod cart_service;
pub mod catalog_service;
pub mod error;
pub mod store;


pub use cart_service::{CartDetails, CartLine, CartService, DeleteAck};
pub use catalog_service::CatalogService;
pub use error::{ServiceError, ServiceResult};
pub use store::{AggregateStore, Document, InMemoryStore, JsonFileStore, StoreError};

#[cfg(feature = "postgres")]
pub use store::PostgresStore;
