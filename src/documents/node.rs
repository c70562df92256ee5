//! Derived rows of the document tree.

use serde::Serialize;

use super::id::document_id;
use crate::record::{DownloadRecord, DownloadStatus};

/// Mime type of the root directory document.
pub const DIRECTORY_MIME_TYPE: &str = "inode/directory";

/// Mime type shown for completed downloads that never reported one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Summaries shown for downloads that have not completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLabels {
    pub queued: String,
    pub running: String,
    pub error: String,
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            queued: "Queued".to_string(),
            running: "Running".to_string(),
            error: "Error".to_string(),
        }
    }
}

/// What a client may do with a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentFlags {
    pub supports_delete: bool,
    pub supports_thumbnail: bool,
}

/// The single root of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootNode {
    pub root_id: String,
    /// Document id of the root directory.
    pub document_id: String,
    pub title: String,
}

/// One row of a document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentNode {
    pub document_id: String,
    pub display_name: String,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
    pub summary: Option<String>,
    pub last_modified: Option<i64>,
    pub flags: DocumentFlags,
}

impl DocumentNode {
    /// The directory document listing every download.
    #[must_use]
    pub fn directory(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            display_name: title.into(),
            mime_type: Some(DIRECTORY_MIME_TYPE.to_string()),
            size: None,
            summary: None,
            last_modified: None,
            flags: DocumentFlags::default(),
        }
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.mime_type.as_deref() == Some(DIRECTORY_MIME_TYPE)
    }
}

/// Renders one download as a document row.
///
/// Only completed downloads expose size and mime type; every other status
/// shows a label instead.
#[must_use]
pub fn project_document(record: &DownloadRecord, labels: &StatusLabels) -> DocumentNode {
    let (size, mime_type, summary) = match record.status {
        DownloadStatus::Success => (
            record.known_total_bytes(),
            Some(
                record
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            ),
            record.description.clone(),
        ),
        DownloadStatus::NotStarted | DownloadStatus::Pending | DownloadStatus::RunningPaused => {
            (None, None, Some(labels.queued.clone()))
        }
        DownloadStatus::Running => (None, None, Some(labels.running.clone())),
        DownloadStatus::Failed(_) => (None, None, Some(labels.error.clone())),
    };

    let supports_thumbnail = mime_type
        .as_deref()
        .is_some_and(|mime| mime.starts_with("image/"));

    DocumentNode {
        document_id: document_id(record.id),
        display_name: display_name(record),
        mime_type,
        size,
        summary,
        last_modified: Some(record.last_modification_time_millis),
        flags: DocumentFlags {
            supports_delete: true,
            supports_thumbnail,
        },
    }
}

/// Title, else the last path segment of the source URI, else `download-{id}`.
#[must_use]
pub fn display_name(record: &DownloadRecord) -> String {
    if let Some(title) = record
        .display_title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
    {
        return title.to_string();
    }

    url::Url::parse(&record.source_uri)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|segment| !segment.is_empty())
                .next_back()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("download-{}", record.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: DownloadStatus) -> DownloadRecord {
        let mut record = DownloadRecord::new(7, "https://example.com/files/report.pdf");
        record.status = status;
        record
    }

    // ==================== Status Table Tests ====================

    #[test]
    fn test_success_with_unknown_size() {
        let mut r = record(DownloadStatus::Success);
        r.total_bytes = -1;
        let node = project_document(&r, &StatusLabels::default());
        assert_eq!(node.size, None);
        assert_eq!(node.mime_type.as_deref(), Some(DEFAULT_MIME_TYPE));
    }

    #[test]
    fn test_success_with_known_size_and_description() {
        let mut r = record(DownloadStatus::Success);
        r.total_bytes = 4096;
        r.description = Some("Quarterly report".to_string());
        let node = project_document(&r, &StatusLabels::default());
        assert_eq!(node.size, Some(4096));
        assert_eq!(node.summary.as_deref(), Some("Quarterly report"));
    }

    #[test]
    fn test_image_success_supports_thumbnail() {
        let mut r = record(DownloadStatus::Success);
        r.mime_type = Some("image/png".to_string());
        let node = project_document(&r, &StatusLabels::default());
        assert!(node.flags.supports_thumbnail);
        assert!(node.flags.supports_delete);
    }

    #[test]
    fn test_running_clears_mime_and_size() {
        let mut r = record(DownloadStatus::Running);
        r.mime_type = Some("image/png".to_string());
        r.total_bytes = 100;
        let node = project_document(&r, &StatusLabels::default());
        assert_eq!(node.mime_type, None);
        assert_eq!(node.size, None);
        assert!(!node.flags.supports_thumbnail);
        assert!(node.flags.supports_delete);
        assert_eq!(node.summary.as_deref(), Some("Running"));
    }

    #[test]
    fn test_running_without_mime_has_no_thumbnail() {
        let node = project_document(&record(DownloadStatus::Running), &StatusLabels::default());
        assert_eq!(node.mime_type, None);
        assert!(!node.flags.supports_thumbnail);
    }

    #[test]
    fn test_waiting_statuses_show_queued() {
        for status in [
            DownloadStatus::NotStarted,
            DownloadStatus::Pending,
            DownloadStatus::RunningPaused,
        ] {
            let node = project_document(&record(status), &StatusLabels::default());
            assert_eq!(node.summary.as_deref(), Some("Queued"), "{status}");
        }
    }

    #[test]
    fn test_failure_uses_custom_error_label() {
        let labels = StatusLabels {
            error: "Fehler".to_string(),
            ..StatusLabels::default()
        };
        let node = project_document(&record(DownloadStatus::Failed(495)), &labels);
        assert_eq!(node.summary.as_deref(), Some("Fehler"));
        assert_eq!(node.size, None);
    }

    // ==================== Display Name Tests ====================

    #[test]
    fn test_display_name_prefers_title() {
        let mut r = record(DownloadStatus::Success);
        r.display_title = Some("My Report".to_string());
        assert_eq!(display_name(&r), "My Report");
    }

    #[test]
    fn test_display_name_falls_back_to_last_segment() {
        let mut r = record(DownloadStatus::Success);
        r.display_title = Some("   ".to_string());
        assert_eq!(display_name(&r), "report.pdf");

        r.source_uri = "https://example.com/dir/".to_string();
        assert_eq!(display_name(&r), "dir");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut r = record(DownloadStatus::Success);
        r.source_uri = "https://example.com/".to_string();
        assert_eq!(display_name(&r), "download-7");
        r.source_uri = "not a uri".to_string();
        assert_eq!(display_name(&r), "download-7");
    }

    #[test]
    fn test_directory_node() {
        let node = DocumentNode::directory("downloads", "Downloads");
        assert!(node.is_directory());
        assert!(!node.flags.supports_delete);
    }
}
