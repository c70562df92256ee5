//! Errors surfaced to document clients.

use thiserror::Error;

use crate::store::StoreError;
use crate::transfer::TransferError;

/// Rejections and failures from the document view.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Document id is not of the form `id:<digits>`.
    #[error("invalid document id: {0:?}")]
    InvalidDocumentId(String),

    /// Path does not match any addressable shape.
    #[error("unsupported path: {0:?}")]
    UnsupportedPath(String),

    /// Only read-only opens are allowed.
    #[error("unsupported open mode: {0:?}")]
    UnsupportedMode(String),

    /// The view is read-only, or the path cannot take this operation.
    #[error("{operation} is not supported on {path:?}")]
    UnsupportedOperation {
        operation: &'static str,
        path: String,
    },

    /// The root, document or payload does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Transfer(TransferError),
}

impl DocumentError {
    pub(crate) fn unsupported(operation: &'static str, path: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation,
            path: path.into(),
        }
    }

    /// True for rejections caused by the shape of the request rather than state.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDocumentId(_)
                | Self::UnsupportedPath(_)
                | Self::UnsupportedMode(_)
                | Self::UnsupportedOperation { .. }
        )
    }
}

impl From<StoreError> for DocumentError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RecordNotFound(id) => Self::NotFound(format!("download {id}")),
            other => Self::Store(other),
        }
    }
}

impl From<TransferError> for DocumentError {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::NotFound(id) => Self::NotFound(format!("payload for download {id}")),
            TransferError::Store(store) => Self::from(store),
            other @ TransferError::Io { .. } => Self::Transfer(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found_maps_to_not_found() {
        let err = DocumentError::from(StoreError::RecordNotFound(4));
        assert!(matches!(err, DocumentError::NotFound(ref what) if what == "download 4"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_transfer_not_found_maps_to_not_found() {
        let err = DocumentError::from(TransferError::NotFound(8));
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[test]
    fn test_client_errors() {
        assert!(DocumentError::InvalidDocumentId("x".into()).is_client_error());
        assert!(DocumentError::UnsupportedMode("w".into()).is_client_error());
        assert!(DocumentError::unsupported("insert", "roots").is_client_error());
    }
}
