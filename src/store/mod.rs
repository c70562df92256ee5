//! Store module for download record persistence.
//!
//! This module provides `SQLite`-backed storage for download rows and their
//! request headers. Reads hand back [`RecordSnapshot`]s: every column is copied
//! out of the query result before it is dropped, and record construction
//! happens afterwards.
//!
//! # Overview
//!
//! - [`DownloadStore`] - Main interface for store operations
//! - [`RecordStore`] - Read/delete/notice seam used by the scheduler and documents
//! - [`NewDownload`] - Fields for inserting a download
//! - [`StoreError`] - Operation error types
//!
//! # Example
//!
//! ```no_run
//! use download_provider::store::{DownloadStore, NewDownload};
//! use download_provider::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new_in_memory().await?;
//! let store = DownloadStore::new(db);
//!
//! let id = store
//!     .insert(&NewDownload::new("https://example.com/paper.pdf"), 0)
//!     .await?;
//! let snapshot = store.snapshot(id).await?;
//! assert!(snapshot.is_some());
//! # Ok(())
//! # }
//! ```

mod error;
mod repository;

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row};
use tracing::{debug, instrument};

pub use error::{StoreDbErrorKind, StoreError};
pub use repository::RecordStore;

use crate::db::Database;
use crate::record::{
    Control, Destination, DownloadStatus, FieldValue, NotificationTarget, RecordSnapshot,
    SnapshotRow, Visibility, columns, retry_field,
};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Returns `Ok(())` if at least one row was affected; otherwise [`StoreError::RecordNotFound`].
fn check_affected(id: i64, rows_affected: u64) -> Result<()> {
    if rows_affected == 0 {
        Err(StoreError::RecordNotFound(id))
    } else {
        Ok(())
    }
}

/// Fields for a new download row.
#[derive(Debug, Clone)]
pub struct NewDownload {
    pub uri: String,
    pub destination: Destination,
    pub control: Control,
    pub visibility: Visibility,
    pub mime_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub notification_target: Option<NotificationTarget>,
    pub cookies: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub visible_in_ui: bool,
    /// Extra request headers, stored as child rows in order.
    pub headers: Vec<(String, String)>,
}

impl NewDownload {
    /// A visible, running download to external storage with no extras.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            destination: Destination::External,
            control: Control::Run,
            visibility: Visibility::Visible,
            mime_type: None,
            title: None,
            description: None,
            notification_target: None,
            cookies: None,
            user_agent: None,
            referer: None,
            visible_in_ui: true,
            headers: Vec::new(),
        }
    }
}

/// Payload facts reported by the transfer engine on success.
#[derive(Debug, Clone, Default)]
pub struct CompletedPayload {
    /// -1 when the engine never learned the size.
    pub total_bytes: i64,
    pub file_path: String,
    /// Overrides the stored mime type when present.
    pub mime_type: Option<String>,
}

/// `SQLite` store for download rows.
#[derive(Debug, Clone)]
pub struct DownloadStore {
    db: Database,
}

impl DownloadStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a download and its header rows in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] if `uri` is not an absolute URL,
    /// or [`StoreError::Database`] if the insert fails.
    #[instrument(skip(self, download), fields(uri = %download.uri))]
    pub async fn insert(&self, download: &NewDownload, now: i64) -> Result<i64> {
        url::Url::parse(&download.uri).map_err(|e| StoreError::invalid("uri", e.to_string()))?;

        let (package, class, extras) = match &download.notification_target {
            Some(target) => (
                Some(target.package.as_str()),
                target.class.as_deref(),
                target.extras.as_deref(),
            ),
            None => (None, None, None),
        };

        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query(
            r"INSERT INTO downloads (
                uri,
                destination,
                control,
                status,
                visibility,
                last_modified_ms,
                mime_type,
                title,
                description,
                notification_package,
                notification_class,
                notification_extras,
                cookies,
                user_agent,
                referer,
                visible_in_ui
              )
              VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(&download.uri)
        .bind(download.destination.code())
        .bind(download.control.code())
        .bind(DownloadStatus::Pending.code())
        .bind(download.visibility.code())
        .bind(now)
        .bind(download.mime_type.as_deref())
        .bind(download.title.as_deref())
        .bind(download.description.as_deref())
        .bind(package)
        .bind(class)
        .bind(extras)
        .bind(download.cookies.as_deref())
        .bind(download.user_agent.as_deref())
        .bind(download.referer.as_deref())
        .bind(download.visible_in_ui)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.try_get("id")?;

        for (name, value) in &download.headers {
            sqlx::query("INSERT INTO request_headers (download_id, header, value) VALUES (?, ?, ?)")
                .bind(id)
                .bind(name)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(id, headers = download.headers.len(), "inserted download");
        Ok(id)
    }

    /// Appends a request header row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if the download does not exist.
    #[instrument(skip(self, value))]
    pub async fn add_header(&self, id: i64, name: &str, value: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(StoreError::invalid("header", "empty header name"));
        }
        let result = sqlx::query(
            r"INSERT INTO request_headers (download_id, header, value)
              SELECT id, ?, ? FROM downloads WHERE id = ?",
        )
        .bind(name)
        .bind(value)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Reads one download with its headers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a query fails.
    #[instrument(skip(self))]
    pub async fn snapshot(&self, id: i64) -> Result<Option<RecordSnapshot>> {
        let row = sqlx::query("SELECT * FROM downloads WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let row = snapshot_row(&row)?;

        let headers = sqlx::query_as::<_, (String, String)>(
            "SELECT header, value FROM request_headers WHERE download_id = ? ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Some(RecordSnapshot { row, headers }))
    }

    /// Reads every download, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a query fails.
    #[instrument(skip(self))]
    pub async fn list_snapshots(&self) -> Result<Vec<RecordSnapshot>> {
        self.list_where("SELECT * FROM downloads ORDER BY id ASC")
            .await
    }

    /// Reads the downloads shown in document listings, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a query fails.
    #[instrument(skip(self))]
    pub async fn list_visible_snapshots(&self) -> Result<Vec<RecordSnapshot>> {
        self.list_where("SELECT * FROM downloads WHERE visible_in_ui != 0 ORDER BY id ASC")
            .await
    }

    async fn list_where(&self, sql: &str) -> Result<Vec<RecordSnapshot>> {
        let rows = sqlx::query(sql).fetch_all(self.db.pool()).await?;
        let header_rows = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT download_id, header, value FROM request_headers ORDER BY id ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut headers: HashMap<i64, Vec<(String, String)>> = HashMap::new();
        for (download_id, name, value) in header_rows {
            headers.entry(download_id).or_default().push((name, value));
        }

        rows.iter()
            .map(|row| -> Result<RecordSnapshot> {
                let id: i64 = row.try_get(columns::ID)?;
                Ok(RecordSnapshot {
                    row: snapshot_row(row)?,
                    headers: headers.remove(&id).unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Removes a download and its header rows.
    ///
    /// Performs no ownership check; callers decide who may delete.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM request_headers WHERE download_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM downloads WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        check_affected(id, result.rows_affected())?;
        tx.commit().await?;
        Ok(())
    }

    /// Sets the caller intent (run/pause).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn set_control(&self, id: i64, control: Control, now: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE downloads SET control = ?, last_modified_ms = ? WHERE id = ?",
        )
        .bind(control.code())
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Records that the transfer engine started an attempt.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn mark_running(&self, id: i64, now: i64) -> Result<()> {
        self.set_status(id, DownloadStatus::Running, now).await
    }

    /// Pauses a download until connectivity returns, without counting a failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn mark_waiting_for_network(&self, id: i64, now: i64) -> Result<()> {
        self.set_status(id, DownloadStatus::RunningPaused, now).await
    }

    /// Records a retryable failure: bumps the failure count, stores the
    /// server retry-after (0 when none) and pauses the download.
    ///
    /// The redirect count in the packed field is preserved.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn mark_paused_for_retry(
        &self,
        id: i64,
        retry_after: Option<u32>,
        now: i64,
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        let packed: Option<(i64,)> =
            sqlx::query_as("SELECT retry_redirect FROM downloads WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((packed,)) = packed else {
            return Err(StoreError::RecordNotFound(id));
        };
        let (_, redirect_count) = retry_field::unpack_column(packed);
        let repacked = retry_field::pack(retry_after.unwrap_or(0), redirect_count);

        sqlx::query(
            r"UPDATE downloads
              SET status = ?,
                  num_failed = num_failed + 1,
                  retry_redirect = ?,
                  last_modified_ms = ?
              WHERE id = ?",
        )
        .bind(DownloadStatus::RunningPaused.code())
        .bind(repacked)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Follows one more redirect in the current attempt chain (wraps past 15).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn record_redirect(&self, id: i64) -> Result<u8> {
        let mut tx = self.db.pool().begin().await?;
        let packed: Option<(i64,)> =
            sqlx::query_as("SELECT retry_redirect FROM downloads WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((packed,)) = packed else {
            return Err(StoreError::RecordNotFound(id));
        };
        let (retry_after, redirect_count) = retry_field::unpack_column(packed);
        let next = redirect_count.wrapping_add(1) & retry_field::MAX_REDIRECT_COUNT;

        sqlx::query("UPDATE downloads SET retry_redirect = ? WHERE id = ?")
            .bind(retry_field::pack(retry_after, next))
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(next)
    }

    /// Records a terminal failure code (`400..=599`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidInput`] for codes outside the failure
    /// range, or [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn mark_failed(&self, id: i64, code: u16, now: i64) -> Result<()> {
        if !(400..=599).contains(&code) {
            return Err(StoreError::invalid(
                "status",
                format!("{code} is not a failure code"),
            ));
        }
        let result = sqlx::query(
            r"UPDATE downloads
              SET status = ?, completion_notified = 0, last_modified_ms = ?
              WHERE id = ?",
        )
        .bind(DownloadStatus::Failed(code).code())
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Marks the completion notice for the current terminal status as sent.
    ///
    /// Returns `true` only for the caller that flipped the flag, so a notice
    /// goes out once even across processes. Reaching a terminal status again
    /// re-arms it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the update fails.
    #[instrument(skip(self))]
    pub async fn claim_completion_notice(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE downloads SET completion_notified = 1 WHERE id = ? AND completion_notified = 0",
        )
        .bind(id)
        .execute(self.db.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Records a successful transfer and clears retry state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self, payload), fields(path = %payload.file_path))]
    pub async fn mark_success(&self, id: i64, payload: &CompletedPayload, now: i64) -> Result<()> {
        let result = sqlx::query(
            r"UPDATE downloads
              SET status = ?,
                  num_failed = 0,
                  retry_redirect = 0,
                  completion_notified = 0,
                  total_bytes = ?,
                  current_bytes = CASE WHEN ? >= 0 THEN ? ELSE current_bytes END,
                  file_path = ?,
                  mime_type = COALESCE(?, mime_type),
                  last_modified_ms = ?
              WHERE id = ?",
        )
        .bind(DownloadStatus::Success.code())
        .bind(payload.total_bytes)
        .bind(payload.total_bytes)
        .bind(payload.total_bytes)
        .bind(&payload.file_path)
        .bind(payload.mime_type.as_deref())
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Updates transfer progress counters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RecordNotFound`] if no download has this id.
    #[instrument(skip(self))]
    pub async fn update_progress(&self, id: i64, current_bytes: i64, total_bytes: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE downloads SET current_bytes = ?, total_bytes = ? WHERE id = ?",
        )
        .bind(current_bytes)
        .bind(total_bytes)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }

    /// Counts downloads with the given status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn count_by_status(&self, status: DownloadStatus) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM downloads WHERE status = ?")
            .bind(status.code())
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn set_status(&self, id: i64, status: DownloadStatus, now: i64) -> Result<()> {
        let result = sqlx::query(
            "UPDATE downloads SET status = ?, last_modified_ms = ? WHERE id = ?",
        )
        .bind(status.code())
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        check_affected(id, result.rows_affected())
    }
}

/// Copies every column of a `downloads` row into a [`SnapshotRow`].
fn snapshot_row(row: &SqliteRow) -> Result<SnapshotRow> {
    let mut snapshot = SnapshotRow::new();
    for column in row.columns() {
        let name = column.name();
        let value = if columns::INTEGER_COLUMNS.contains(&name) {
            FieldValue::from(row.try_get::<Option<i64>, _>(column.ordinal())?)
        } else {
            FieldValue::from(row.try_get::<Option<String>, _>(column.ordinal())?)
        };
        snapshot.set(name, value);
    }
    Ok(snapshot)
}
