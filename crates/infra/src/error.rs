use thiserror::Error;

use storefront_core::{DomainError, ErrorKind};

use crate::store::StoreError;

/// Failure of a catalog or cart operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(e) => e.kind(),
            Self::Store(_) => ErrorKind::StorageFailure,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
