//! Start/restart eligibility with exponential backoff for stalled downloads.
//!
//! This module provides [`RetryScheduler`], a set of pure decision functions
//! over a [`DownloadRecord`] snapshot. None of them touch the store; callers
//! act on the answer through the transfer engine.
//!
//! # Backoff
//!
//! ```text
//! restart = last_modified + retry_after                       when retry_after > 0
//! restart = last_modified + base * (1000 + fuzz) * 2^(n - 1)  otherwise
//! ```
//!
//! `fuzz` is the record's `jitter_fuzz` (0..=1000), so with the default
//! base of 30 the first retry lands 30-60 seconds after the failure.
//!
//! # Example
//!
//! ```
//! use download_provider::record::{DownloadRecord, DownloadStatus};
//! use download_provider::scheduler::RetryScheduler;
//!
//! let scheduler = RetryScheduler::default();
//! let mut record = DownloadRecord::new(1, "https://example.com/a.bin");
//! record.status = DownloadStatus::RunningPaused;
//! record.num_failed_attempts = 1;
//! record.last_modification_time_millis = 0;
//!
//! assert_eq!(scheduler.restart_time(&record), 30_000);
//! assert!(!scheduler.is_ready_to_start(&record, 29_999));
//! assert!(scheduler.is_ready_to_start(&record, 30_001));
//! ```

use tracing::{debug, trace};

use crate::network;
use crate::record::{Control, DownloadRecord, DownloadStatus, Visibility};

/// Default backoff base. Multiplied by `1000 + jitter`, so it reads as seconds
/// when timestamps are milliseconds.
pub const DEFAULT_BASE_DELAY: i64 = 30;

/// Pure retry and eligibility decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryScheduler {
    base_delay: i64,
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryScheduler {
    /// Creates a scheduler with a custom backoff base (clamped to at least 1).
    #[must_use]
    pub fn new(base_delay: i64) -> Self {
        Self {
            base_delay: base_delay.max(1),
        }
    }

    #[must_use]
    pub fn base_delay(&self) -> i64 {
        self.base_delay
    }

    /// Earliest time a failed download may be retried.
    ///
    /// Only meaningful when `num_failed_attempts > 0`; callers must check.
    /// A server-provided retry-after is added to the millisecond timestamp
    /// as-is, without unit conversion, matching the stored data.
    #[must_use]
    pub fn restart_time(&self, record: &DownloadRecord) -> i64 {
        debug_assert!(
            record.num_failed_attempts > 0,
            "restart_time requires at least one failed attempt"
        );

        if record.retry_after_seconds > 0 {
            return record
                .last_modification_time_millis
                .saturating_add(i64::from(record.retry_after_seconds));
        }

        let exponent = record.num_failed_attempts.saturating_sub(1);
        let backoff = self
            .base_delay
            .saturating_mul(1000 + i64::from(record.jitter_fuzz))
            .saturating_mul(2_i64.saturating_pow(exponent));

        record.last_modification_time_millis.saturating_add(backoff)
    }

    /// Whether a download the scheduler has not acted on yet should start now.
    #[must_use]
    pub fn is_ready_to_start(&self, record: &DownloadRecord, now: i64) -> bool {
        if record.control == Control::Paused {
            return false;
        }
        let ready = match record.status {
            DownloadStatus::NotStarted | DownloadStatus::Pending => true,
            // running without a live attempt means the process died mid-transfer
            DownloadStatus::Running => true,
            DownloadStatus::RunningPaused => self.paused_ready(record, now),
            DownloadStatus::Success | DownloadStatus::Failed(_) => false,
        };
        trace!(id = record.id, status = %record.status, ready, "start check");
        ready
    }

    /// Whether a download that may already be active should be restarted now.
    ///
    /// Same as [`Self::is_ready_to_start`] except `Running` is not eligible.
    #[must_use]
    pub fn is_ready_to_restart(&self, record: &DownloadRecord, now: i64) -> bool {
        if record.control == Control::Paused {
            return false;
        }
        let ready = match record.status {
            DownloadStatus::NotStarted | DownloadStatus::Pending => true,
            DownloadStatus::RunningPaused => self.paused_ready(record, now),
            DownloadStatus::Running | DownloadStatus::Success | DownloadStatus::Failed(_) => false,
        };
        trace!(id = record.id, status = %record.status, ready, "restart check");
        ready
    }

    /// Whether a completion notification should be shown for this download.
    #[must_use]
    pub fn has_completion_notification(record: &DownloadRecord) -> bool {
        record.status.is_completed() && record.visibility == Visibility::VisibleNotifyCompleted
    }

    /// Network policy for this download's destination.
    #[must_use]
    pub fn can_use_network(record: &DownloadRecord, available: bool, roaming: bool) -> bool {
        network::can_use_network(available, roaming, record.destination)
    }

    /// Milliseconds until this download next needs attention.
    ///
    /// `None` unless the download is paused mid-transfer; `Some(0)` when it is
    /// already due.
    #[must_use]
    pub fn next_action_delay(&self, record: &DownloadRecord, now: i64) -> Option<i64> {
        if record.status != DownloadStatus::RunningPaused {
            return None;
        }
        if record.num_failed_attempts == 0 {
            return Some(0);
        }
        let when = self.restart_time(record);
        if when <= now {
            Some(0)
        } else {
            Some(when.saturating_sub(now))
        }
    }

    fn paused_ready(&self, record: &DownloadRecord, now: i64) -> bool {
        if record.num_failed_attempts == 0 {
            // paused only for connectivity
            return true;
        }
        let restart_at = self.restart_time(record);
        debug!(
            id = record.id,
            failures = record.num_failed_attempts,
            restart_at,
            now,
            "backoff check"
        );
        restart_at < now
    }
}
