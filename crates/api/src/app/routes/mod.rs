use axum::Router;

pub mod carts;
pub mod products;
pub mod system;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/api/products", products::router())
        .nest("/api/carts", carts::router())
}
