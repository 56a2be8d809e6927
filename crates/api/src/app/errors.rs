use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::{DomainError, ErrorKind};
use storefront_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "the storage backend failed to complete the request",
            )
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let code = match &err {
        DomainError::ProductNotFound(_) => "product_not_found",
        DomainError::CartNotFound(_) => "cart_not_found",
        DomainError::ItemNotFound { .. } => "item_not_found",
        DomainError::InvalidQuantity(_) => "invalid_quantity",
        DomainError::Validation(_) => "validation_error",
        DomainError::InvalidId(_) => "invalid_id",
    };
    json_error(status_for(err.kind()), code, err.to_string())
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::StorageFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "status": "error",
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
