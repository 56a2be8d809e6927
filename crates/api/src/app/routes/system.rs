use std::sync::Arc;

use axum::{extract::Extension, response::sse::Event as SseEvent};

use crate::app::dto;
use crate::app::services::{self, AppServices};

pub async fn health() -> axum::response::Response {
    dto::ok(serde_json::json!({ "service": "storefront-api" }))
}

/// GET /api/products/events
///
/// Server-Sent Events stream of catalog changes. The SSE event name is the
/// catalog event type (`catalog.product.added`, `.updated`, `.deleted`).
pub async fn catalog_stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    services::catalog_sse_stream(services)
}
