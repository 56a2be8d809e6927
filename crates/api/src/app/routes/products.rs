use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
};

use storefront_catalog::{ListQuery, NewProduct, ProductId, ProductPatch, RawListQuery};

use crate::app::routes::system;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(add_product))
        .route("/events", get(system::catalog_stream))
        .route("/:pid", get(get_product).put(update_product).delete(delete_product))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(raw): Query<RawListQuery>,
) -> axum::response::Response {
    let query = ListQuery::from_raw(&raw);
    match services.catalog().list_products(&query).await {
        Ok(page) => dto::ok(dto::ProductListResponse::new(page, &query)),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().get_product(id).await {
        Ok(product) => dto::ok(product),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> axum::response::Response {
    let fields: NewProduct = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().add_product(fields).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id_typed(), code = product.code(), "product added");
            dto::success(StatusCode::CREATED, product)
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /api/products/:pid
///
/// Partial update. Fields not present in the body are left untouched and an
/// `id` in the body is ignored.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let patch: ProductPatch = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().update_product(id, patch).await {
        Ok(product) => dto::ok(product),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(pid): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match dto::parse_id(&pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.catalog().delete_product(id).await {
        Ok(product) => {
            tracing::info!(product_id = %id, "product deleted");
            dto::ok(product)
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
