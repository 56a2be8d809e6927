//! Catalog domain module.
//!
//! Product aggregate, the listing engine (filter / sort / paginate) and the
//! change-notification hook. Pure domain logic: no IO, no HTTP, no storage.

pub mod events;
pub mod product;
pub mod query;

pub use events::{CatalogEvent, CatalogObserver};
pub use product::{NewProduct, Product, ProductId, ProductPatch};
pub use query::{ListQuery, Page, ProductFilter, RawListQuery, SortOrder};
