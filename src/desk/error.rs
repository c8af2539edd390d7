use crate::{domain, storage::StoreError};

/// Failures raised by desk operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity does not exist, or is not of the expected kind.
    #[error("{0} not found")]
    NotFound(String),

    /// The acting user may not perform the operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The operation clashes with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A domain rule was violated.
    #[error(transparent)]
    Domain(#[from] domain::Error),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    pub(crate) fn not_found(what: &str, id: u64) -> Self {
        Self::NotFound(format!("{what} {id}"))
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }
}
