//! Error types for record construction.

use thiserror::Error;

/// A stored row could not be turned into a [`super::DownloadRecord`].
///
/// Construction is all-or-nothing: any of these aborts the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// A required column is absent from the snapshot.
    #[error("missing required field '{0}' in download snapshot")]
    MissingField(&'static str),

    /// A column is present but holds an unusable value.
    #[error("invalid value for field '{column}': {reason}")]
    InvalidField {
        column: &'static str,
        reason: String,
    },
}

impl RecordError {
    pub(crate) fn invalid(column: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            column,
            reason: reason.into(),
        }
    }

    /// Name of the offending column.
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Self::MissingField(column) | Self::InvalidField { column, .. } => column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message_names_column() {
        let err = RecordError::MissingField("status");
        assert!(err.to_string().contains("'status'"));
        assert_eq!(err.column(), "status");
    }

    #[test]
    fn test_invalid_field_message_includes_reason() {
        let err = RecordError::invalid("control", "unknown code 7");
        assert_eq!(
            err.to_string(),
            "invalid value for field 'control': unknown code 7"
        );
    }
}
