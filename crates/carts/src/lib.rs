//! Carts domain module.
//!
//! Cart aggregate and its line-item transformations, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod cart;

pub use cart::{Cart, CartId, LineItem, Quantity};
