use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post},
};

use storefront_carts::CartId;
use storefront_catalog::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_cart))
        .route("/all", delete(delete_all_carts))
        .route("/:cid", get(get_cart).put(set_items).delete(clear_cart))
        .route("/:cid/purge", delete(delete_cart))
        .route(
            "/:cid/products/:pid",
            post(add_item).put(set_item_quantity).delete(remove_item),
        )
}

fn parse_ids(cid: &str, pid: &str) -> Result<(CartId, ProductId), axum::response::Response> {
    Ok((dto::parse_id(cid)?, dto::parse_id(pid)?))
}

pub async fn create_cart(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.carts().create_cart().await {
        Ok(cart) => {
            tracing::info!(cart_id = %cart.id_typed(), "cart created");
            dto::success(StatusCode::CREATED, cart)
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// GET /api/carts/:cid
///
/// The cart with each line's product resolved; lines whose product was
/// deleted carry `product: null`.
pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    let id: CartId = match dto::parse_id(&cid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.carts().get_cart_with_products(id).await {
        Ok(details) => dto::ok(details),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// PUT /api/carts/:cid
///
/// Replace every line item with `{"products": [{"productId", "quantity"}]}`.
pub async fn set_items(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let id: CartId = match dto::parse_id(&cid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let req: dto::SetItemsRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let items = match req.into_items() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.carts().set_items(id, items).await {
        Ok(cart) => dto::ok(cart),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// DELETE /api/carts/:cid
///
/// Empties the cart. The cart itself survives; see `/purge`.
pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    let id: CartId = match dto::parse_id(&cid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.carts().clear(id).await {
        Ok(cart) => dto::ok(cart),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Path(cid): Path<String>,
) -> axum::response::Response {
    let id: CartId = match dto::parse_id(&cid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.carts().delete_cart(id).await {
        Ok(ack) => dto::ok(ack),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_all_carts(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.carts().delete_all_carts().await {
        Ok(ack) => {
            tracing::info!(deleted_count = ack.deleted_count, "all carts deleted");
            dto::ok(ack)
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
    body: Bytes,
) -> axum::response::Response {
    let (cart_id, product_id) = match parse_ids(&cid, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let req: dto::AddItemRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match req.quantity() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.carts().add_item(cart_id, product_id, quantity).await {
        Ok(cart) => dto::ok(cart),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn set_item_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
    body: Bytes,
) -> axum::response::Response {
    let (cart_id, product_id) = match parse_ids(&cid, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let req: dto::SetQuantityRequest = match dto::parse_body(&body) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let quantity = match req.quantity() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.carts().set_item_quantity(cart_id, product_id, quantity).await {
        Ok(cart) => dto::ok(cart),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path((cid, pid)): Path<(String, String)>,
) -> axum::response::Response {
    let (cart_id, product_id) = match parse_ids(&cid, &pid) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.carts().remove_item(cart_id, product_id).await {
        Ok(cart) => dto::ok(cart),
        Err(e) => errors::service_error_to_response(e),
    }
}
