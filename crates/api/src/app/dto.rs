use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use storefront_carts::{LineItem, Quantity};
use storefront_catalog::{ListQuery, Page, Product, ProductId};
use storefront_core::{DomainError, RecordId};

use crate::app::errors;

pub const PRODUCTS_PATH: &str = "/api/products";

// -------------------------
// Envelopes
// -------------------------

pub fn success<T: Serialize>(status: StatusCode, payload: T) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "status": "success",
            "payload": payload,
        })),
    )
        .into_response()
}

pub fn ok<T: Serialize>(payload: T) -> axum::response::Response {
    success(StatusCode::OK, payload)
}

/// Decode a JSON request body. An empty body decodes as `{}`, which lets
/// types with all-optional fields accept a bare request.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, axum::response::Response> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"{}" } else { body };
    serde_json::from_slice(body).map_err(|e| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", format!("invalid JSON body: {e}"))
    })
}

/// Parse a path segment into a typed identifier.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /api/carts/:cid/products/:pid`. Missing quantity means 1.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddItemRequest {
    pub quantity: Option<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SetQuantityRequest {
    pub quantity: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    pub product_id: JsonValue,
    #[serde(default)]
    pub quantity: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct SetItemsRequest {
    pub products: Vec<LineItemRequest>,
}

impl AddItemRequest {
    pub fn quantity(&self) -> Result<Option<Quantity>, DomainError> {
        self.quantity.as_ref().map(parse_quantity).transpose()
    }
}

impl SetQuantityRequest {
    pub fn quantity(&self) -> Result<Quantity, DomainError> {
        match &self.quantity {
            Some(value) => parse_quantity(value),
            None => Err(DomainError::invalid_quantity("quantity is required")),
        }
    }
}

impl SetItemsRequest {
    /// Line items in request order. A line without a quantity gets 1.
    pub fn into_items(self) -> Result<Vec<LineItem>, DomainError> {
        self.products
            .into_iter()
            .map(|line| {
                let product_id = parse_product_ref(&line.product_id)?;
                let quantity = match &line.quantity {
                    Some(q) => parse_quantity(q)?,
                    None => Quantity::ONE,
                };
                Ok(LineItem::new(product_id, quantity))
            })
            .collect()
    }
}

/// Quantities arrive as JSON numbers or numeric strings.
pub fn parse_quantity(value: &JsonValue) -> Result<Quantity, DomainError> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Quantity::new(i)
            } else if n.is_u64() {
                Err(DomainError::invalid_quantity(format!("{n} is too large")))
            } else {
                Quantity::from_f64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        JsonValue::String(s) => s.parse(),
        other => Err(DomainError::invalid_quantity(format!("{other} is not a number"))),
    }
}

/// Product references in bodies may be numbers or strings.
pub fn parse_product_ref(value: &JsonValue) -> Result<ProductId, DomainError> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .map(|n| ProductId::new(RecordId::sequential(n)))
            .ok_or_else(|| DomainError::invalid_id(n.to_string())),
        JsonValue::String(s) => s.parse(),
        other => Err(DomainError::invalid_id(other.to_string())),
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    #[serde(flatten)]
    pub page: Page<Product>,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

impl ProductListResponse {
    pub fn new(page: Page<Product>, query: &ListQuery) -> Self {
        let prev_link = page.prev_page.map(|p| page_link(query, p));
        let next_link = page.next_page.map(|p| page_link(query, p));
        Self {
            page,
            prev_link,
            next_link,
        }
    }
}

/// Listing URL for `page` carrying the rest of the query unchanged.
pub fn page_link(query: &ListQuery, page: u32) -> String {
    let params = query
        .query_pairs(page)
        .into_iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(&v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{PRODUCTS_PATH}?{params}")
}

#[cfg(test)]
mod tests {
    use storefront_catalog::RawListQuery;

    use super::*;

    #[test]
    fn quantities_accept_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity(&json!(2)).unwrap().get(), 2);
        assert_eq!(parse_quantity(&json!(2.0)).unwrap().get(), 2);
        assert_eq!(parse_quantity(&json!("3")).unwrap().get(), 3);

        for bad in [json!(2.5), json!(0), json!(-1), json!("many"), json!(null), json!(u64::MAX)] {
            assert!(
                matches!(parse_quantity(&bad), Err(DomainError::InvalidQuantity(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn product_refs_accept_numbers_and_strings() {
        assert_eq!(parse_product_ref(&json!(7)).unwrap(), ProductId::new(7u64));
        assert_eq!(parse_product_ref(&json!("7")).unwrap(), ProductId::new(7u64));
        assert!(parse_product_ref(&json!(-1)).is_err());
        assert!(parse_product_ref(&json!("seven")).is_err());
    }

    #[test]
    fn set_items_defaults_missing_quantity() {
        let req: SetItemsRequest =
            serde_json::from_value(json!({"products": [{"productId": 1}, {"productId": "2", "quantity": "4"}]}))
                .unwrap();
        let items = req.into_items().unwrap();
        assert_eq!(items[0], LineItem::new(ProductId::new(1u64), Quantity::ONE));
        assert_eq!(items[1].quantity.get(), 4);
    }

    #[test]
    fn empty_add_body_means_default_quantity() {
        let req: AddItemRequest = parse_body(b"").unwrap();
        assert_eq!(req.quantity().unwrap(), None);
        assert!(parse_body::<AddItemRequest>(b"{oops").is_err());
    }

    #[test]
    fn links_encode_filter_values() {
        let query = ListQuery::from_raw(&RawListQuery {
            query: Some("green tea".to_string()),
            category: Some("a&b".to_string()),
            ..Default::default()
        });
        assert_eq!(
            page_link(&query, 2),
            "/api/products?limit=10&page=2&sort=asc&query=green%20tea&category=a%26b&status="
        );
    }
}
