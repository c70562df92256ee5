//! Download Provider Core Library
//!
//! This library tracks background downloads, decides when a stalled or
//! failed download may (re)start, and exposes completed downloads through a
//! read-only document tree.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`db`] - Database connection and schema management
//! - [`record`] - Download records built from stored snapshots
//! - [`store`] - `SQLite` persistence for download rows and headers
//! - [`network`] - Network eligibility policy and connectivity facts
//! - [`scheduler`] - Backoff, readiness and the periodic scheduler tick
//! - [`notify`] - Completion notification delivery
//! - [`transfer`] - Read-only access to downloaded payloads
//! - [`documents`] - Virtual filesystem over visible downloads

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod db;
pub mod documents;
pub mod network;
pub mod notify;
pub mod record;
pub mod scheduler;
pub mod store;
pub mod transfer;

// Re-export commonly used types
pub use db::{Database, DatabaseOptions, DbError};
pub use documents::{DocumentError, DocumentNode, DocumentProvider, QueryRow, VfsPath};
pub use network::{ConnectivityProvider, NetworkType, StaticConnectivity, can_use_network};
pub use record::{
    Control, Destination, DownloadRecord, DownloadStatus, RecordError, RecordFactory,
    RecordSnapshot, Visibility,
};
pub use scheduler::{DownloadScheduler, RetryScheduler, SchedulerConfig, TickReport};
pub use store::{DownloadStore, NewDownload, RecordStore, StoreError};
pub use transfer::{LocalFileEngine, TransferEngine, TransferError};
