//! In-memory view of one download's persisted state.
//!
//! A [`DownloadRecord`] is built from a [`RecordSnapshot`] every time a
//! download is inspected. Records are never written back; callers change a
//! download through [`crate::store::DownloadStore`] and rebuild.
//!
//! # Example
//!
//! ```
//! use download_provider::record::{DownloadRecord, RecordSnapshot};
//!
//! let snapshot = RecordSnapshot::default();
//! let result = DownloadRecord::from_snapshot(&snapshot, &mut rand::thread_rng());
//! assert!(result.is_err()); // no columns at all
//! ```

mod codes;
mod error;
mod factory;
pub mod retry_field;
mod snapshot;

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;

pub use codes::{
    Control, Destination, DownloadStatus, STATUS_PENDING, STATUS_RUNNING, STATUS_RUNNING_PAUSED,
    STATUS_SUCCESS, Visibility, failure,
};
pub use error::RecordError;
pub use factory::RecordFactory;
pub use snapshot::{FieldValue, RecordSnapshot, SnapshotRow, columns};

/// Upper bound (inclusive) of the per-record jitter draw.
pub const MAX_JITTER_FUZZ: u16 = 1000;

/// Header name derived from the record's cookies.
pub const COOKIE_HEADER: &str = "Cookie";

/// Header name derived from the record's referer.
pub const REFERER_HEADER: &str = "Referer";

/// Component to notify when a download completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationTarget {
    pub package: String,
    pub class: Option<String>,
    pub extras: Option<String>,
}

/// Snapshot of one download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    pub id: i64,
    pub source_uri: String,
    pub destination: Destination,
    pub control: Control,
    pub status: DownloadStatus,
    pub visibility: Visibility,
    /// Consecutive failures since the last success.
    pub num_failed_attempts: u32,
    /// Server-provided lower bound from the last failure, 0 when absent.
    pub retry_after_seconds: u32,
    pub redirect_count: u8,
    pub last_modification_time_millis: i64,
    /// -1 when unknown.
    pub total_bytes: i64,
    /// -1 when unknown.
    pub current_bytes: i64,
    pub mime_type: Option<String>,
    pub display_title: Option<String>,
    pub description: Option<String>,
    pub notification_target: Option<NotificationTarget>,
    pub etag: Option<String>,
    pub cookies: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub media_scanned: bool,
    /// Local path of the payload once the transfer engine has written it.
    pub file_path: Option<String>,
    /// Whether the visibility-filtered listing includes this download.
    pub visible_in_ui: bool,
    /// Drawn in `0..=MAX_JITTER_FUZZ` on every construction; not persisted.
    pub jitter_fuzz: u16,
    pub request_headers: BTreeMap<String, String>,
}

impl DownloadRecord {
    /// Creates a record for a download the transfer engine has not started.
    ///
    /// All optional fields are empty and `jitter_fuzz` is 0.
    #[must_use]
    pub fn new(id: i64, source_uri: impl Into<String>) -> Self {
        Self {
            id,
            source_uri: source_uri.into(),
            destination: Destination::External,
            control: Control::Run,
            status: DownloadStatus::NotStarted,
            visibility: Visibility::Visible,
            num_failed_attempts: 0,
            retry_after_seconds: 0,
            redirect_count: 0,
            last_modification_time_millis: 0,
            total_bytes: -1,
            current_bytes: -1,
            mime_type: None,
            display_title: None,
            description: None,
            notification_target: None,
            etag: None,
            cookies: None,
            user_agent: None,
            referer: None,
            media_scanned: false,
            file_path: None,
            visible_in_ui: true,
            jitter_fuzz: 0,
            request_headers: BTreeMap::new(),
        }
    }

    /// Builds a record from a stored row and its header rows.
    ///
    /// Every required column must be present; `file_path` and
    /// `visible_in_ui` default to `None` / `true` when absent. Header rows are
    /// applied in order, then `Cookie` and `Referer` are derived from the
    /// record's own fields and win over any header row of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::MissingField`] if a required column is absent,
    /// or [`RecordError::InvalidField`] if a column holds an unusable value.
    pub fn from_snapshot<R: Rng + ?Sized>(
        snapshot: &RecordSnapshot,
        rng: &mut R,
    ) -> Result<Self, RecordError> {
        let row = &snapshot.row;

        let id = row.integer(columns::ID)?;
        let source_uri = row.text(columns::URI)?;

        let destination_code = row.integer(columns::DESTINATION)?;
        let destination = Destination::from_code(destination_code).ok_or_else(|| {
            RecordError::invalid(
                columns::DESTINATION,
                format!("unknown code {destination_code}"),
            )
        })?;

        let control_code = row.integer(columns::CONTROL)?;
        let control = Control::from_code(control_code).ok_or_else(|| {
            RecordError::invalid(columns::CONTROL, format!("unknown code {control_code}"))
        })?;

        let status_code = row.integer(columns::STATUS)?;
        let status = DownloadStatus::from_code(status_code).ok_or_else(|| {
            RecordError::invalid(columns::STATUS, format!("unknown code {status_code}"))
        })?;

        let visibility_code = row.integer(columns::VISIBILITY)?;
        let visibility = Visibility::from_code(visibility_code).ok_or_else(|| {
            RecordError::invalid(
                columns::VISIBILITY,
                format!("unknown code {visibility_code}"),
            )
        })?;

        let num_failed = row.integer(columns::NUM_FAILED)?;
        let num_failed_attempts = u32::try_from(num_failed).map_err(|_| {
            RecordError::invalid(columns::NUM_FAILED, format!("out of range: {num_failed}"))
        })?;

        let (retry_after_seconds, redirect_count) =
            retry_field::unpack_column(row.integer(columns::RETRY_REDIRECT)?);

        let last_modification_time_millis = row.integer(columns::LAST_MODIFIED_MS)?;
        let total_bytes = row.integer(columns::TOTAL_BYTES)?;
        let current_bytes = row.integer(columns::CURRENT_BYTES)?;
        let mime_type = row.optional_text(columns::MIME_TYPE)?;
        let display_title = row.optional_text(columns::TITLE)?;
        let description = row.optional_text(columns::DESCRIPTION)?;

        let notification_package = row.optional_text(columns::NOTIFICATION_PACKAGE)?;
        let notification_class = row.optional_text(columns::NOTIFICATION_CLASS)?;
        let notification_extras = row.optional_text(columns::NOTIFICATION_EXTRAS)?;
        let notification_target = notification_package.map(|package| NotificationTarget {
            package,
            class: notification_class,
            extras: notification_extras,
        });

        let etag = row.optional_text(columns::ETAG)?;
        let cookies = row.optional_text(columns::COOKIES)?;
        let user_agent = row.optional_text(columns::USER_AGENT)?;
        let referer = row.optional_text(columns::REFERER)?;
        let media_scanned = row.integer(columns::MEDIA_SCANNED)? != 0;

        let file_path = if row.contains(columns::FILE_PATH) {
            row.optional_text(columns::FILE_PATH)?
        } else {
            None
        };
        let visible_in_ui = if row.contains(columns::VISIBLE_IN_UI) {
            row.integer(columns::VISIBLE_IN_UI)? != 0
        } else {
            true
        };

        let request_headers = merge_headers(&snapshot.headers, cookies.as_deref(), referer.as_deref());

        Ok(Self {
            id,
            source_uri,
            destination,
            control,
            status,
            visibility,
            num_failed_attempts,
            retry_after_seconds,
            redirect_count,
            last_modification_time_millis,
            total_bytes,
            current_bytes,
            mime_type,
            display_title,
            description,
            notification_target,
            etag,
            cookies,
            user_agent,
            referer,
            media_scanned,
            file_path,
            visible_in_ui,
            jitter_fuzz: draw_jitter_fuzz(rng),
            request_headers,
        })
    }

    /// Returns the total size when the server reported one.
    #[must_use]
    pub fn known_total_bytes(&self) -> Option<u64> {
        u64::try_from(self.total_bytes).ok()
    }

    /// Returns the packed retry/redirect value as stored.
    #[must_use]
    pub fn packed_retry_field(&self) -> i32 {
        retry_field::pack(self.retry_after_seconds, self.redirect_count)
    }
}

impl fmt::Display for DownloadRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DownloadRecord {{ id: {}, uri: {}, status: {}, control: {:?} }}",
            self.id, self.source_uri, self.status, self.control
        )
    }
}

/// Draws a fresh jitter value in `0..=MAX_JITTER_FUZZ`.
pub fn draw_jitter_fuzz<R: Rng + ?Sized>(rng: &mut R) -> u16 {
    rng.gen_range(0..=MAX_JITTER_FUZZ)
}

fn merge_headers(
    rows: &[(String, String)],
    cookies: Option<&str>,
    referer: Option<&str>,
) -> BTreeMap<String, String> {
    let mut headers: BTreeMap<String, String> = rows.iter().cloned().collect();
    if let Some(cookies) = cookies {
        headers.insert(COOKIE_HEADER.to_string(), cookies.to_string());
    }
    if let Some(referer) = referer {
        headers.insert(REFERER_HEADER.to_string(), referer.to_string());
    }
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn full_row() -> SnapshotRow {
        SnapshotRow::new()
            .with(columns::ID, 7_i64)
            .with(columns::URI, "https://example.com/files/report.pdf")
            .with(columns::DESTINATION, 3_i64)
            .with(columns::CONTROL, 0_i64)
            .with(columns::STATUS, 193_i64)
            .with(columns::VISIBILITY, 1_i64)
            .with(columns::NUM_FAILED, 2_i64)
            .with(
                columns::RETRY_REDIRECT,
                i64::from(retry_field::pack(120, 3)),
            )
            .with(columns::LAST_MODIFIED_MS, 1_700_000_000_000_i64)
            .with(columns::TOTAL_BYTES, 4096_i64)
            .with(columns::CURRENT_BYTES, 1024_i64)
            .with(columns::MIME_TYPE, Some("application/pdf"))
            .with(columns::TITLE, Some("Report"))
            .with(columns::DESCRIPTION, None::<&str>)
            .with(columns::NOTIFICATION_PACKAGE, Some("com.example.app"))
            .with(columns::NOTIFICATION_CLASS, Some("Receiver"))
            .with(columns::NOTIFICATION_EXTRAS, None::<&str>)
            .with(columns::ETAG, Some("\"v1\""))
            .with(columns::COOKIES, Some("session=abc"))
            .with(columns::USER_AGENT, None::<&str>)
            .with(columns::REFERER, None::<&str>)
            .with(columns::MEDIA_SCANNED, 1_i64)
    }

    fn snapshot(row: SnapshotRow, headers: &[(&str, &str)]) -> RecordSnapshot {
        RecordSnapshot {
            row,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_from_snapshot_populates_every_field() {
        let mut rng = StdRng::seed_from_u64(1);
        let record = DownloadRecord::from_snapshot(&snapshot(full_row(), &[]), &mut rng).unwrap();

        assert_eq!(record.id, 7);
        assert_eq!(record.destination, Destination::CacheNoRoaming);
        assert_eq!(record.control, Control::Run);
        assert_eq!(record.status, DownloadStatus::RunningPaused);
        assert_eq!(record.visibility, Visibility::VisibleNotifyCompleted);
        assert_eq!(record.num_failed_attempts, 2);
        assert_eq!(record.retry_after_seconds, 120);
        assert_eq!(record.redirect_count, 3);
        assert_eq!(record.total_bytes, 4096);
        assert_eq!(record.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(
            record.notification_target,
            Some(NotificationTarget {
                package: "com.example.app".to_string(),
                class: Some("Receiver".to_string()),
                extras: None,
            })
        );
        assert!(record.media_scanned);
        assert!(record.visible_in_ui);
        assert!(record.file_path.is_none());
        assert!(record.jitter_fuzz <= MAX_JITTER_FUZZ);
    }

    #[test]
    fn test_from_snapshot_missing_column_fails_whole_record() {
        for column in [
            columns::ID,
            columns::STATUS,
            columns::RETRY_REDIRECT,
            columns::DESCRIPTION,
            columns::MEDIA_SCANNED,
        ] {
            let mut row = full_row();
            row.remove(column);
            let result = DownloadRecord::from_snapshot(&snapshot(row, &[]), &mut rand::thread_rng());
            assert_eq!(result, Err(RecordError::MissingField(column)));
        }
    }

    #[test]
    fn test_from_snapshot_rejects_unknown_status_code() {
        let row = full_row().with(columns::STATUS, 201_i64);
        let err = DownloadRecord::from_snapshot(&snapshot(row, &[]), &mut rand::thread_rng())
            .unwrap_err();
        assert_eq!(err.column(), "status");
    }

    #[test]
    fn test_from_snapshot_rejects_negative_failure_count() {
        let row = full_row().with(columns::NUM_FAILED, -1_i64);
        let err = DownloadRecord::from_snapshot(&snapshot(row, &[]), &mut rand::thread_rng())
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidField { column: "num_failed", .. }));
    }

    #[test]
    fn test_derived_cookie_overrides_header_row() {
        let headers = [("Cookie", "stale=1"), ("Accept", "*/*")];
        let record =
            DownloadRecord::from_snapshot(&snapshot(full_row(), &headers), &mut rand::thread_rng())
                .unwrap();
        assert_eq!(record.request_headers.get("Cookie").unwrap(), "session=abc");
        assert_eq!(record.request_headers.get("Accept").unwrap(), "*/*");
        assert!(!record.request_headers.contains_key("Referer"));
    }

    #[test]
    fn test_derived_referer_added_and_duplicate_rows_keep_last() {
        let row = full_row().with(columns::REFERER, Some("https://example.com/"));
        let headers = [("X-Token", "one"), ("X-Token", "two"), ("Referer", "https://other/")];
        let record =
            DownloadRecord::from_snapshot(&snapshot(row, &headers), &mut rand::thread_rng())
                .unwrap();
        assert_eq!(record.request_headers.get("X-Token").unwrap(), "two");
        assert_eq!(
            record.request_headers.get("Referer").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_jitter_redrawn_per_construction() {
        let snap = snapshot(full_row(), &[]);
        let mut rng = StdRng::seed_from_u64(42);
        let draws: Vec<u16> = (0..32)
            .map(|_| {
                DownloadRecord::from_snapshot(&snap, &mut rng)
                    .unwrap()
                    .jitter_fuzz
            })
            .collect();
        assert!(draws.iter().all(|fuzz| *fuzz <= MAX_JITTER_FUZZ));
        assert!(
            draws.windows(2).any(|pair| pair[0] != pair[1]),
            "32 draws should not all be identical"
        );
    }

    #[test]
    fn test_optional_supplement_columns_default_when_absent() {
        let row = full_row()
            .with(columns::FILE_PATH, Some("/data/report.pdf"))
            .with(columns::VISIBLE_IN_UI, 0_i64);
        let record =
            DownloadRecord::from_snapshot(&snapshot(row, &[]), &mut rand::thread_rng()).unwrap();
        assert_eq!(record.file_path.as_deref(), Some("/data/report.pdf"));
        assert!(!record.visible_in_ui);
    }

    #[test]
    fn test_new_record_defaults() {
        let record = DownloadRecord::new(1, "https://example.com/a");
        assert_eq!(record.status, DownloadStatus::NotStarted);
        assert_eq!(record.known_total_bytes(), None);
        assert_eq!(record.packed_retry_field(), 0);
        assert!(record.to_string().contains("not_started"));
    }
}
