//! Addressable shapes of the document tree.

use std::fmt;
use std::str::FromStr;

use super::DocumentError;

/// A parsed document path.
///
/// ```text
/// roots
/// roots/{rootId}
/// roots/{rootId}/docs/{docId}
/// roots/{rootId}/docs/{docId}/contents
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfsPath {
    Roots,
    Root { root_id: String },
    Document { root_id: String, document_id: String },
    Contents { root_id: String, document_id: String },
}

impl VfsPath {
    /// Root id, when the path names one.
    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        match self {
            Self::Roots => None,
            Self::Root { root_id }
            | Self::Document { root_id, .. }
            | Self::Contents { root_id, .. } => Some(root_id),
        }
    }

    /// Document id, when the path names one.
    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::Roots | Self::Root { .. } => None,
            Self::Document { document_id, .. } | Self::Contents { document_id, .. } => {
                Some(document_id)
            }
        }
    }
}

impl FromStr for VfsPath {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(DocumentError::UnsupportedPath(s.to_string()));
        }

        match segments.as_slice() {
            ["roots"] => Ok(Self::Roots),
            ["roots", root_id] => Ok(Self::Root {
                root_id: (*root_id).to_string(),
            }),
            ["roots", root_id, "docs", document_id] => Ok(Self::Document {
                root_id: (*root_id).to_string(),
                document_id: (*document_id).to_string(),
            }),
            ["roots", root_id, "docs", document_id, "contents"] => Ok(Self::Contents {
                root_id: (*root_id).to_string(),
                document_id: (*document_id).to_string(),
            }),
            _ => Err(DocumentError::UnsupportedPath(s.to_string())),
        }
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Roots => write!(f, "roots"),
            Self::Root { root_id } => write!(f, "roots/{root_id}"),
            Self::Document {
                root_id,
                document_id,
            } => write!(f, "roots/{root_id}/docs/{document_id}"),
            Self::Contents {
                root_id,
                document_id,
            } => write!(f, "roots/{root_id}/docs/{document_id}/contents"),
        }
    }
}
