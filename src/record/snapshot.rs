//! Column-keyed snapshot of one stored download row.
//!
//! The store copies every selected column into a [`SnapshotRow`] before the
//! query result is dropped, so record construction never touches a live cursor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RecordError;

/// Column names of the `downloads` table.
pub mod columns {
    pub const ID: &str = "id";
    pub const URI: &str = "uri";
    pub const DESTINATION: &str = "destination";
    pub const CONTROL: &str = "control";
    pub const STATUS: &str = "status";
    pub const VISIBILITY: &str = "visibility";
    pub const NUM_FAILED: &str = "num_failed";
    pub const RETRY_REDIRECT: &str = "retry_redirect";
    pub const LAST_MODIFIED_MS: &str = "last_modified_ms";
    pub const TOTAL_BYTES: &str = "total_bytes";
    pub const CURRENT_BYTES: &str = "current_bytes";
    pub const MIME_TYPE: &str = "mime_type";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const NOTIFICATION_PACKAGE: &str = "notification_package";
    pub const NOTIFICATION_CLASS: &str = "notification_class";
    pub const NOTIFICATION_EXTRAS: &str = "notification_extras";
    pub const ETAG: &str = "etag";
    pub const COOKIES: &str = "cookies";
    pub const USER_AGENT: &str = "user_agent";
    pub const REFERER: &str = "referer";
    pub const MEDIA_SCANNED: &str = "media_scanned";
    pub const FILE_PATH: &str = "file_path";
    pub const VISIBLE_IN_UI: &str = "visible_in_ui";
    pub const COMPLETION_NOTIFIED: &str = "completion_notified";

    /// Columns holding integers; everything else is text.
    pub const INTEGER_COLUMNS: &[&str] = &[
        ID,
        DESTINATION,
        CONTROL,
        STATUS,
        VISIBILITY,
        NUM_FAILED,
        RETRY_REDIRECT,
        LAST_MODIFIED_MS,
        TOTAL_BYTES,
        CURRENT_BYTES,
        MEDIA_SCANNED,
        VISIBLE_IN_UI,
        COMPLETION_NOTIFIED,
    ];
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Column name to value map for one row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    fields: BTreeMap<String, FieldValue>,
}

impl SnapshotRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<FieldValue>) {
        self.fields.insert(column.to_string(), value.into());
    }

    /// Removes a column entirely (distinct from setting it to NULL).
    pub fn remove(&mut self, column: &str) -> Option<FieldValue> {
        self.fields.remove(column)
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    /// Required non-null integer column.
    pub(crate) fn integer(&self, column: &'static str) -> Result<i64, RecordError> {
        match self.get(column) {
            None => Err(RecordError::MissingField(column)),
            Some(FieldValue::Integer(value)) => Ok(*value),
            Some(FieldValue::Null) => Err(RecordError::invalid(column, "unexpected NULL")),
            Some(FieldValue::Text(_)) => Err(RecordError::invalid(column, "expected integer")),
        }
    }

    /// Required non-null text column.
    pub(crate) fn text(&self, column: &'static str) -> Result<String, RecordError> {
        match self.optional_text(column)? {
            Some(value) => Ok(value),
            None => Err(RecordError::invalid(column, "unexpected NULL")),
        }
    }

    /// Required column that may hold NULL.
    pub(crate) fn optional_text(&self, column: &'static str) -> Result<Option<String>, RecordError> {
        match self.get(column) {
            None => Err(RecordError::MissingField(column)),
            Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Text(value)) => Ok(Some(value.clone())),
            Some(FieldValue::Integer(_)) => Err(RecordError::invalid(column, "expected text")),
        }
    }
}

/// One row plus its `(header, value)` child rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSnapshot {
    pub row: SnapshotRow,
    pub headers: Vec<(String, String)>,
}

impl RecordSnapshot {
    /// Record id if the row carries a usable one, for diagnostics.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.row.integer(columns::ID).ok()
    }
}
