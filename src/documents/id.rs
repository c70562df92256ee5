//! Document id <-> record id mapping.

use super::DocumentError;

const PREFIX: &str = "id:";

/// Document id for a download.
#[must_use]
pub fn document_id(record_id: i64) -> String {
    format!("{PREFIX}{record_id}")
}

/// Parses a document id produced by [`document_id`].
///
/// Accepts exactly `id:` followed by an optional `-` and ASCII digits, so
/// every `i64` round-trips. Anything else is rejected; there is no fallback
/// value.
///
/// # Errors
///
/// Returns [`DocumentError::InvalidDocumentId`] for malformed ids.
pub fn parse_document_id(document_id: &str) -> Result<i64, DocumentError> {
    let invalid = || DocumentError::InvalidDocumentId(document_id.to_string());
    let number = document_id.strip_prefix(PREFIX).ok_or_else(invalid)?;
    let digits = number.strip_prefix('-').unwrap_or(number);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    number.parse::<i64>().map_err(|_| invalid())
}
