//! Domain error model.

use thiserror::Error;

use crate::id::RecordId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification the boundary layer maps onto responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    StorageFailure,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing records). Storage failures belong to the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("product {0} not found")]
    ProductNotFound(RecordId),

    #[error("cart {0} not found")]
    CartNotFound(RecordId),

    #[error("product {product_id} is not in cart {cart_id}")]
    ItemNotFound {
        cart_id: RecordId,
        product_id: RecordId,
    },

    /// A line-item quantity was not a positive integer.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_quantity(msg: impl Into<String>) -> Self {
        Self::InvalidQuantity(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound(_) | Self::CartNotFound(_) | Self::ItemNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::InvalidQuantity(_) | Self::Validation(_) | Self::InvalidId(_) => {
                ErrorKind::InvalidInput
            }
        }
    }
}
