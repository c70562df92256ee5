//! Read-only document tree over stored downloads.
//!
//! The tree has one root directory; each visible download is a document
//! inside it. Rows are rebuilt from fresh snapshots on every query.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use download_provider::documents::{DocumentConfig, DocumentProvider, QueryRow};
//! use download_provider::record::RecordFactory;
//! use download_provider::store::DownloadStore;
//! use download_provider::transfer::LocalFileEngine;
//! use download_provider::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(DownloadStore::new(Database::new_in_memory().await?));
//! let records = Arc::new(RecordFactory::new());
//! let engine = Arc::new(LocalFileEngine::new(store.clone(), records.clone()));
//! let provider = DocumentProvider::new(store, engine, records, DocumentConfig::default());
//!
//! let roots = provider.query("roots").await?;
//! assert!(matches!(roots.as_slice(), [QueryRow::Root(_)]));
//! # Ok(())
//! # }
//! ```

mod error;
mod id;
mod mode;
mod node;
mod path;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

pub use error::DocumentError;
pub use id::{document_id, parse_document_id};
pub use mode::OpenMode;
pub use node::{
    DEFAULT_MIME_TYPE, DIRECTORY_MIME_TYPE, DocumentFlags, DocumentNode, RootNode, StatusLabels,
    display_name, project_document,
};
pub use path::VfsPath;

use crate::record::{DownloadRecord, RecordFactory, SnapshotRow};
use crate::store::RecordStore;
use crate::transfer::{ContentHandle, TransferEngine};

/// Identifier of the single root.
pub const ROOT_ID: &str = "downloads";

/// Document id of the root directory.
pub const ROOT_DOCUMENT_ID: &str = "downloads";

/// Default title of the root.
pub const DEFAULT_ROOT_TITLE: &str = "Downloads";

/// Presentation settings for the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    pub root_title: String,
    pub labels: StatusLabels,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            root_title: DEFAULT_ROOT_TITLE.to_string(),
            labels: StatusLabels::default(),
        }
    }
}

/// One row of a query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryRow {
    Root(RootNode),
    Document(DocumentNode),
}

/// Virtual filesystem over the download store.
pub struct DocumentProvider {
    store: Arc<dyn RecordStore>,
    transfer: Arc<dyn TransferEngine>,
    records: Arc<RecordFactory>,
    config: DocumentConfig,
}

impl DocumentProvider {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        transfer: Arc<dyn TransferEngine>,
        records: Arc<RecordFactory>,
        config: DocumentConfig,
    ) -> Self {
        Self {
            store,
            transfer,
            records,
            config,
        }
    }

    /// The single root row.
    #[must_use]
    pub fn root(&self) -> RootNode {
        RootNode {
            root_id: ROOT_ID.to_string(),
            document_id: ROOT_DOCUMENT_ID.to_string(),
            title: self.config.root_title.clone(),
        }
    }

    /// Lists the rows addressed by `path`.
    ///
    /// - `roots`: exactly one root row
    /// - `roots/{rootId}`: every visible download
    /// - `roots/{rootId}/docs/{docId}` and `.../contents`: that one document
    ///   (a `contents` path on the root directory is rejected)
    ///
    /// Downloads whose rows cannot be read are left out of listings and
    /// logged; they do not fail the query.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::UnsupportedPath`] for unknown shapes,
    /// [`DocumentError::InvalidDocumentId`] for malformed ids and
    /// [`DocumentError::NotFound`] for unknown roots or downloads.
    #[instrument(skip(self))]
    pub async fn query(&self, path: &str) -> Result<Vec<QueryRow>, DocumentError> {
        let parsed: VfsPath = path.parse()?;
        match &parsed {
            VfsPath::Roots => Ok(vec![QueryRow::Root(self.root())]),
            VfsPath::Root { root_id } => {
                check_root(root_id)?;
                let documents = self.list_documents().await?;
                Ok(documents.into_iter().map(QueryRow::Document).collect())
            }
            VfsPath::Document {
                root_id,
                document_id,
            }
            | VfsPath::Contents {
                root_id,
                document_id,
            } => {
                check_root(root_id)?;
                let node = self.document(&parsed, document_id).await?;
                Ok(vec![QueryRow::Document(node)])
            }
        }
    }

    /// Mime type of the addressed node, `None` when the download has not completed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::query`].
    #[instrument(skip(self))]
    pub async fn get_type(&self, path: &str) -> Result<Option<String>, DocumentError> {
        let parsed: VfsPath = path.parse()?;
        match &parsed {
            VfsPath::Roots => Ok(Some(DIRECTORY_MIME_TYPE.to_string())),
            VfsPath::Root { root_id } => {
                check_root(root_id)?;
                Ok(Some(DIRECTORY_MIME_TYPE.to_string()))
            }
            VfsPath::Document {
                root_id,
                document_id,
            }
            | VfsPath::Contents {
                root_id,
                document_id,
            } => {
                check_root(root_id)?;
                Ok(self.document(&parsed, document_id).await?.mime_type)
            }
        }
    }

    /// Opens a completed download's payload.
    ///
    /// The mode is checked before anything else is touched.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::UnsupportedMode`] for any mode but `r`,
    /// [`DocumentError::UnsupportedOperation`] for directories and
    /// [`DocumentError::NotFound`] when no completed payload exists.
    #[instrument(skip(self))]
    pub async fn open(&self, path: &str, mode: &str) -> Result<ContentHandle, DocumentError> {
        let mode: OpenMode = mode.parse()?;
        if !mode.is_read_only() {
            return Err(DocumentError::UnsupportedMode(mode.as_str().to_string()));
        }

        let parsed: VfsPath = path.parse()?;
        let id = record_id(&parsed, "open")?;
        let handle = self.transfer.open_for_read(id).await?;
        debug!(id, bytes = handle.len(), "opened payload");
        Ok(handle)
    }

    /// Deletes the addressed download.
    ///
    /// No ownership check is made; whoever can reach this call can delete.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidDocumentId`] for malformed ids (the
    /// store is not touched), [`DocumentError::UnsupportedOperation`] for
    /// directories and [`DocumentError::NotFound`] for unknown downloads.
    #[instrument(skip(self))]
    pub async fn delete(&self, path: &str) -> Result<(), DocumentError> {
        let parsed: VfsPath = path.parse()?;
        let id = record_id(&parsed, "delete")?;
        self.store.delete(id).await?;
        info!(id, "deleted download");
        Ok(())
    }

    /// Always rejected; the tree is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`DocumentError::UnsupportedOperation`].
    pub fn insert(&self, path: &str, _values: &SnapshotRow) -> Result<i64, DocumentError> {
        Err(DocumentError::unsupported("insert", path))
    }

    /// Always rejected; the tree is read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`DocumentError::UnsupportedOperation`].
    pub fn update(&self, path: &str, _values: &SnapshotRow) -> Result<u64, DocumentError> {
        Err(DocumentError::unsupported("update", path))
    }

    /// Node addressed by a document or contents path.
    async fn document(
        &self,
        path: &VfsPath,
        document_id: &str,
    ) -> Result<DocumentNode, DocumentError> {
        if document_id == ROOT_DOCUMENT_ID {
            // a directory has no contents stream
            if matches!(path, VfsPath::Contents { .. }) {
                return Err(DocumentError::unsupported("contents", path.to_string()));
            }
            return Ok(DocumentNode::directory(
                ROOT_DOCUMENT_ID,
                self.config.root_title.clone(),
            ));
        }
        let id = parse_document_id(document_id)?;
        let snapshot = self
            .store
            .snapshot(id)
            .await?
            .ok_or_else(|| DocumentError::NotFound(format!("download {id}")))?;
        let record = self.records.build(&snapshot).map_err(|error| {
            warn!(id, %error, "unreadable download");
            DocumentError::NotFound(format!("download {id}"))
        })?;
        Ok(self.project(&record))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentNode>, DocumentError> {
        let snapshots = self.store.list_visible_snapshots().await?;
        let mut documents = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            match self.records.build(snapshot) {
                Ok(record) => documents.push(self.project(&record)),
                Err(error) => warn!(id = ?snapshot.id(), %error, "skipping unreadable download"),
            }
        }
        debug!(
            listed = documents.len(),
            skipped = snapshots.len() - documents.len(),
            "listed documents"
        );
        Ok(documents)
    }

    fn project(&self, record: &DownloadRecord) -> DocumentNode {
        project_document(record, &self.config.labels)
    }
}

fn check_root(root_id: &str) -> Result<(), DocumentError> {
    if root_id == ROOT_ID {
        Ok(())
    } else {
        Err(DocumentError::NotFound(format!("root {root_id}")))
    }
}

/// Record id behind a document path; directories are rejected.
fn record_id(path: &VfsPath, operation: &'static str) -> Result<i64, DocumentError> {
    let (root_id, document_id) = match path {
        VfsPath::Document {
            root_id,
            document_id,
        }
        | VfsPath::Contents {
            root_id,
            document_id,
        } => (root_id, document_id),
        VfsPath::Roots | VfsPath::Root { .. } => {
            return Err(DocumentError::unsupported(operation, path.to_string()));
        }
    };
    check_root(root_id)?;
    if document_id == ROOT_DOCUMENT_ID {
        return Err(DocumentError::unsupported(operation, path.to_string()));
    }
    parse_document_id(document_id)
}
