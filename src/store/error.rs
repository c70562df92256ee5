//! Error types for download store operations.

use std::fmt;

use thiserror::Error;

/// SQLite primary result codes the store tells apart.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;
const SQLITE_CONSTRAINT: i32 = 19;

/// Why a database call failed, as far as callers can act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreDbErrorKind {
    /// Another connection or process holds the write lock.
    Busy,
    /// A value broke a CHECK, NOT NULL or foreign-key rule of the schema.
    Constraint,
    /// A stored column could not be read as the expected type.
    Decode,
    /// The pool is closed, exhausted, or the file cannot be reached.
    Unavailable,
    /// Anything else.
    Other,
}

impl StoreDbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::Database(database_error) => {
                classify_database_error(database_error.as_ref())
            }
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => Self::Decode,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable
            }
            _ => Self::Other,
        }
    }

    /// Hint appended to the error message, empty when there is nothing to add.
    #[must_use]
    pub fn suggestion(self) -> &'static str {
        match self {
            Self::Busy => {
                "\n  Suggestion: Another process is writing the database; retry once it finishes"
            }
            Self::Constraint => "\n  Suggestion: A value is outside the range the schema accepts",
            Self::Unavailable => "\n  Suggestion: Check that the database file is reachable",
            Self::Decode | Self::Other => "",
        }
    }
}

impl fmt::Display for StoreDbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Busy => "busy",
            Self::Constraint => "constraint",
            Self::Decode => "decode",
            Self::Unavailable => "unavailable",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

/// Classifies by primary result code; extended codes keep it in the low byte.
fn classify_database_error(
    database_error: &(dyn sqlx::error::DatabaseError + 'static),
) -> StoreDbErrorKind {
    let primary = database_error
        .code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| code & 0xFF);

    match primary {
        Some(SQLITE_BUSY | SQLITE_LOCKED) => StoreDbErrorKind::Busy,
        Some(SQLITE_CONSTRAINT) => StoreDbErrorKind::Constraint,
        _ if matches!(database_error.kind(), sqlx::error::ErrorKind::Other) => {
            StoreDbErrorKind::Other
        }
        _ => StoreDbErrorKind::Constraint,
    }
}

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}{hint}", hint = .kind.suggestion())]
    Database {
        kind: StoreDbErrorKind,
        message: String,
    },

    /// No download exists with this id.
    #[error(
        "download not found: id {0}\n  Suggestion: The download may have been deleted or the ID is incorrect"
    )]
    RecordNotFound(i64),

    /// Caller passed a value the store refuses to persist.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: StoreDbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}
