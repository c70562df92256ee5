//! Access to downloaded payloads.
//!
//! The byte transfer itself happens elsewhere; this module only hands out
//! read-only handles to payloads that finished successfully.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

use crate::record::{DownloadStatus, RecordFactory};
use crate::store::{RecordStore, StoreError};

/// Errors from opening a payload.
#[derive(Debug, Error)]
pub enum TransferError {
    /// No successfully completed payload exists for this download.
    #[error("no completed payload for download {0}")]
    NotFound(i64),

    /// The payload file could not be opened or read.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-only handle to a payload file.
#[derive(Debug)]
pub struct ContentHandle {
    path: PathBuf,
    file: File,
    len: u64,
}

impl ContentHandle {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size at open time.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the remaining payload into memory.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Io`] if reading fails.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>, TransferError> {
        let mut buf = Vec::with_capacity(usize::try_from(self.len).unwrap_or(0));
        self.file
            .read_to_end(&mut buf)
            .await
            .map_err(|source| TransferError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(buf)
    }

    /// Gives up the handle wrapper for streaming use.
    #[must_use]
    pub fn into_file(self) -> File {
        self.file
    }
}

/// Opens payloads for completed downloads.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Opens the payload for `id` read-only.
    async fn open_for_read(&self, id: i64) -> Result<ContentHandle, TransferError>;
}

/// Serves payloads from the local path recorded on success.
pub struct LocalFileEngine {
    store: Arc<dyn RecordStore>,
    records: Arc<RecordFactory>,
}

impl LocalFileEngine {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, records: Arc<RecordFactory>) -> Self {
        Self { store, records }
    }
}

#[async_trait]
impl TransferEngine for LocalFileEngine {
    #[instrument(skip(self))]
    async fn open_for_read(&self, id: i64) -> Result<ContentHandle, TransferError> {
        let Some(snapshot) = self.store.snapshot(id).await? else {
            return Err(TransferError::NotFound(id));
        };
        let record = match self.records.build(&snapshot) {
            Ok(record) => record,
            Err(error) => {
                warn!(id, %error, "unreadable record, treating payload as missing");
                return Err(TransferError::NotFound(id));
            }
        };
        if record.status != DownloadStatus::Success {
            debug!(id, status = %record.status, "payload not complete");
            return Err(TransferError::NotFound(id));
        }
        let Some(path) = record.file_path.map(PathBuf::from) else {
            return Err(TransferError::NotFound(id));
        };

        let file = match OpenOptions::new().read(true).open(&path).await {
            Ok(file) => file,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(id, path = %path.display(), "payload file is gone");
                return Err(TransferError::NotFound(id));
            }
            Err(source) => return Err(TransferError::Io { path, source }),
        };
        let len = file
            .metadata()
            .await
            .map_err(|source| TransferError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        Ok(ContentHandle { path, file, len })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::Database;
    use crate::store::{CompletedPayload, DownloadStore, NewDownload};

    async fn setup() -> (DownloadStore, LocalFileEngine) {
        let store = DownloadStore::new(Database::new_in_memory().await.unwrap());
        let engine = LocalFileEngine::new(
            Arc::new(store.clone()),
            Arc::new(RecordFactory::seeded(0)),
        );
        (store, engine)
    }

    #[tokio::test]
    async fn test_open_for_read_returns_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let (store, engine) = setup().await;
        let id = store
            .insert(&NewDownload::new("https://example.com/a.txt"), 0)
            .await
            .unwrap();
        let payload = CompletedPayload {
            total_bytes: 5,
            file_path: path.to_string_lossy().into_owned(),
            mime_type: None,
        };
        store.mark_success(id, &payload, 1).await.unwrap();

        let handle = engine.open_for_read(id).await.unwrap();
        assert_eq!(handle.len(), 5);
        assert_eq!(handle.read_to_end().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_open_for_read_rejects_incomplete_download() {
        let (store, engine) = setup().await;
        let id = store
            .insert(&NewDownload::new("https://example.com/a.txt"), 0)
            .await
            .unwrap();
        assert!(matches!(
            engine.open_for_read(id).await,
            Err(TransferError::NotFound(found)) if found == id
        ));
    }

    #[tokio::test]
    async fn test_open_for_read_unknown_id() {
        let (_store, engine) = setup().await;
        assert!(matches!(
            engine.open_for_read(404).await,
            Err(TransferError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_open_for_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (store, engine) = setup().await;
        let id = store
            .insert(&NewDownload::new("https://example.com/a.txt"), 0)
            .await
            .unwrap();
        let payload = CompletedPayload {
            total_bytes: 5,
            file_path: dir.path().join("gone.txt").to_string_lossy().into_owned(),
            mime_type: None,
        };
        store.mark_success(id, &payload, 1).await.unwrap();
        assert!(matches!(
            engine.open_for_read(id).await,
            Err(TransferError::NotFound(_))
        ));
    }
}
