//! Repository seam for download record reads and deletion.
//!
//! The scheduler and the document view depend on this trait instead of
//! [`DownloadStore`] so tests can hand them canned snapshots.

use async_trait::async_trait;

use super::{DownloadStore, Result};
use crate::record::RecordSnapshot;

/// Data-access contract for record snapshots.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Reads one download with its headers.
    async fn snapshot(&self, id: i64) -> Result<Option<RecordSnapshot>>;

    /// Reads every download.
    async fn list_snapshots(&self) -> Result<Vec<RecordSnapshot>>;

    /// Reads downloads that belong in document listings.
    async fn list_visible_snapshots(&self) -> Result<Vec<RecordSnapshot>>;

    /// Removes one download.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Records that the completion notice was sent; `true` the first time.
    async fn claim_completion_notice(&self, id: i64) -> Result<bool>;
}

#[async_trait]
impl RecordStore for DownloadStore {
    async fn snapshot(&self, id: i64) -> Result<Option<RecordSnapshot>> {
        DownloadStore::snapshot(self, id).await
    }

    async fn list_snapshots(&self) -> Result<Vec<RecordSnapshot>> {
        DownloadStore::list_snapshots(self).await
    }

    async fn list_visible_snapshots(&self) -> Result<Vec<RecordSnapshot>> {
        DownloadStore::list_visible_snapshots(self).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        DownloadStore::delete(self, id).await
    }

    async fn claim_completion_notice(&self, id: i64) -> Result<bool> {
        DownloadStore::claim_completion_notice(self, id).await
    }
}
