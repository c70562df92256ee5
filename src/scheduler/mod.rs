//! Download scheduling: retry decisions and the periodic tick that applies them.
//!
//! - [`RetryScheduler`] - pure backoff and readiness decisions over one record
//! - [`DownloadScheduler`] - loads records, consults connectivity and reports
//!   what to start on each tick
//! - [`parse_retry_after`] - turns a server `Retry-After` value into the stored field

mod retry;
mod retry_after;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub use retry::{DEFAULT_BASE_DELAY, RetryScheduler};
pub use retry_after::{MAX_RETRY_AFTER_SECS, MIN_RETRY_AFTER_SECS, parse_retry_after};

use crate::network::ConnectivityProvider;
use crate::notify::{CompletionNotice, CompletionNotifier};
use crate::record::{Control, DownloadRecord, RecordError, RecordFactory};
use crate::store::{RecordStore, StoreError};

/// Errors from loading a record for a scheduling decision.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("download {id} is malformed: {source}")]
    Record {
        id: i64,
        #[source]
        source: RecordError,
    },
}

/// Scheduler tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Backoff base multiplied by `1000 + jitter` per failure.
    pub base_delay: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Downloads that are ready and may use the network now.
    pub to_start: Vec<i64>,
    /// Downloads that are ready but the network policy forbids.
    pub blocked_on_network: Vec<i64>,
    /// Milliseconds until the earliest pending backoff elapses.
    pub next_wakeup_ms: Option<i64>,
    /// Downloads whose completion notice was sent during this tick.
    pub notified: Vec<i64>,
    /// Rows that could not be turned into records.
    pub skipped: usize,
}

/// Applies [`RetryScheduler`] decisions to stored downloads.
pub struct DownloadScheduler {
    store: Arc<dyn RecordStore>,
    connectivity: Arc<dyn ConnectivityProvider>,
    notifier: Arc<dyn CompletionNotifier>,
    records: Arc<RecordFactory>,
    retry: RetryScheduler,
}

impl DownloadScheduler {
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        connectivity: Arc<dyn ConnectivityProvider>,
        notifier: Arc<dyn CompletionNotifier>,
        records: Arc<RecordFactory>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            connectivity,
            notifier,
            records,
            retry: RetryScheduler::new(config.base_delay),
        }
    }

    #[must_use]
    pub fn retry_scheduler(&self) -> &RetryScheduler {
        &self.retry
    }

    /// Whether a download the scheduler has not acted on should start now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Store`] if the download cannot be loaded
    /// (including [`StoreError::RecordNotFound`]), or
    /// [`SchedulerError::Record`] if its row is malformed.
    #[instrument(skip(self))]
    pub async fn should_start(&self, id: i64, now: i64) -> Result<bool, SchedulerError> {
        let record = self.load(id).await?;
        Ok(self.retry.is_ready_to_start(&record, now) && self.network_allows(&record))
    }

    /// Whether a possibly active download should be restarted now.
    ///
    /// # Errors
    ///
    /// Same as [`Self::should_start`].
    #[instrument(skip(self))]
    pub async fn should_restart(&self, id: i64, now: i64) -> Result<bool, SchedulerError> {
        let record = self.load(id).await?;
        Ok(self.retry.is_ready_to_restart(&record, now) && self.network_allows(&record))
    }

    /// Scans every download once.
    ///
    /// Each record is built from one snapshot, so its jitter and deadline are
    /// fixed for the whole tick. Malformed rows are skipped and counted.
    /// Completion notices are claimed in the store, so repeated ticks, even
    /// from separate processes, send each one once.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Store`] if listing or claiming a notice fails.
    #[instrument(skip(self))]
    pub async fn tick(&self, now: i64) -> Result<TickReport, SchedulerError> {
        let snapshots = self.store.list_snapshots().await?;
        let mut report = TickReport::default();

        for snapshot in &snapshots {
            let record = match self.records.build(snapshot) {
                Ok(record) => record,
                Err(error) => {
                    warn!(id = ?snapshot.id(), %error, "skipping malformed download");
                    report.skipped += 1;
                    continue;
                }
            };

            if RetryScheduler::has_completion_notification(&record) {
                if self.store.claim_completion_notice(record.id).await? {
                    self.notifier
                        .notify_completed(CompletionNotice::from(&record));
                    report.notified.push(record.id);
                }
                continue;
            }

            if self.retry.is_ready_to_start(&record, now) {
                if self.network_allows(&record) {
                    report.to_start.push(record.id);
                } else {
                    report.blocked_on_network.push(record.id);
                }
                continue;
            }

            if record.control == Control::Run {
                if let Some(delay) = self.retry.next_action_delay(&record, now) {
                    // restart_time == now is not yet ready; check again next millisecond
                    let delay = delay.max(1);
                    report.next_wakeup_ms =
                        Some(report.next_wakeup_ms.map_or(delay, |current| current.min(delay)));
                }
            }
        }

        if report.to_start.is_empty() && report.notified.is_empty() {
            debug!(records = snapshots.len(), "tick found nothing to do");
        } else {
            info!(
                start = report.to_start.len(),
                blocked = report.blocked_on_network.len(),
                notified = report.notified.len(),
                "tick"
            );
        }
        Ok(report)
    }

    async fn load(&self, id: i64) -> Result<DownloadRecord, SchedulerError> {
        let snapshot = self
            .store
            .snapshot(id)
            .await?
            .ok_or(StoreError::RecordNotFound(id))?;
        self.records
            .build(&snapshot)
            .map_err(|source| SchedulerError::Record { id, source })
    }

    fn network_allows(&self, record: &DownloadRecord) -> bool {
        RetryScheduler::can_use_network(
            record,
            self.connectivity.available(),
            self.connectivity.roaming(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::network::StaticConnectivity;
    use crate::notify::ChannelNotifier;
    use crate::record::{RecordSnapshot, SnapshotRow, columns};

    /// Store serving fixed snapshots.
    struct FixedStore {
        rows: Vec<RecordSnapshot>,
        claimed: Mutex<HashSet<i64>>,
    }

    #[async_trait]
    impl RecordStore for FixedStore {
        async fn snapshot(&self, id: i64) -> crate::store::Result<Option<RecordSnapshot>> {
            Ok(self.rows.iter().find(|s| s.id() == Some(id)).cloned())
        }

        async fn list_snapshots(&self) -> crate::store::Result<Vec<RecordSnapshot>> {
            Ok(self.rows.clone())
        }

        async fn list_visible_snapshots(&self) -> crate::store::Result<Vec<RecordSnapshot>> {
            Ok(self.rows.clone())
        }

        async fn delete(&self, id: i64) -> crate::store::Result<()> {
            Err(StoreError::RecordNotFound(id))
        }

        async fn claim_completion_notice(&self, id: i64) -> crate::store::Result<bool> {
            Ok(self.claimed.lock().unwrap().insert(id))
        }
    }

    fn row(id: i64, status: i64, destination: i64, visibility: i64) -> RecordSnapshot {
        let mut row = SnapshotRow::new();
        for column in columns::INTEGER_COLUMNS {
            row.set(column, 0_i64);
        }
        for column in [
            columns::MIME_TYPE,
            columns::TITLE,
            columns::DESCRIPTION,
            columns::NOTIFICATION_PACKAGE,
            columns::NOTIFICATION_CLASS,
            columns::NOTIFICATION_EXTRAS,
            columns::ETAG,
            columns::COOKIES,
            columns::USER_AGENT,
            columns::REFERER,
            columns::FILE_PATH,
        ] {
            row.set(column, crate::record::FieldValue::Null);
        }
        row.set(columns::ID, id);
        row.set(columns::URI, "https://example.com/f");
        row.set(columns::STATUS, status);
        row.set(columns::DESTINATION, destination);
        row.set(columns::VISIBILITY, visibility);
        row.set(columns::VISIBLE_IN_UI, 1_i64);
        RecordSnapshot {
            row,
            headers: Vec::new(),
        }
    }

    fn scheduler(
        rows: Vec<RecordSnapshot>,
        connectivity: StaticConnectivity,
    ) -> (DownloadScheduler, tokio::sync::mpsc::Receiver<CompletionNotice>) {
        let (notifier, rx) = ChannelNotifier::channel(8);
        let scheduler = DownloadScheduler::new(
            Arc::new(FixedStore {
                rows,
                claimed: Mutex::new(HashSet::new()),
            }),
            Arc::new(connectivity),
            Arc::new(notifier),
            Arc::new(RecordFactory::seeded(5)),
            SchedulerConfig::default(),
        );
        (scheduler, rx)
    }

    #[tokio::test]
    async fn test_should_start_unknown_id_is_not_found() {
        let (scheduler, _rx) = scheduler(Vec::new(), StaticConnectivity::default());
        assert!(matches!(
            scheduler.should_start(3, 0).await,
            Err(SchedulerError::Store(StoreError::RecordNotFound(3)))
        ));
    }

    #[tokio::test]
    async fn test_should_start_malformed_row() {
        let mut bad = row(2, 190, 0, 0);
        bad.row.remove(columns::URI);
        let (scheduler, _rx) = scheduler(vec![bad], StaticConnectivity::default());
        assert!(matches!(
            scheduler.should_start(2, 0).await,
            Err(SchedulerError::Record { id: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_should_start_requires_network() {
        let rows = vec![row(1, 190, 0, 0)];
        let (online, _rx) = scheduler(rows.clone(), StaticConnectivity::default());
        assert!(online.should_start(1, 0).await.unwrap());

        let (offline, _rx) = scheduler(rows, StaticConnectivity::offline());
        assert!(!offline.should_start(1, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_should_restart_skips_running() {
        let (scheduler, _rx) = scheduler(vec![row(1, 192, 0, 0)], StaticConnectivity::default());
        assert!(scheduler.should_start(1, 0).await.unwrap());
        assert!(!scheduler.should_restart(1, 0).await.unwrap());
    }

    #[tokio::test]
    async fn test_tick_splits_ready_records_by_network_policy() {
        let roaming = StaticConnectivity {
            available: true,
            roaming: true,
            network_type: crate::network::NetworkType::Mobile,
        };
        // destination 3 is cache-no-roaming
        let rows = vec![row(1, 190, 0, 0), row(2, 190, 3, 0)];
        let (scheduler, _rx) = scheduler(rows, roaming);

        let report = scheduler.tick(0).await.unwrap();
        assert_eq!(report.to_start, vec![1]);
        assert_eq!(report.blocked_on_network, vec![2]);
    }

    #[tokio::test]
    async fn test_tick_notifies_completion_once() {
        let rows = vec![row(1, 200, 0, 1), row(2, 200, 0, 0)];
        let (scheduler, mut rx) = scheduler(rows, StaticConnectivity::default());

        let first = scheduler.tick(0).await.unwrap();
        assert_eq!(first.notified, vec![1]);
        assert_eq!(rx.try_recv().unwrap().id, 1);

        let second = scheduler.tick(1).await.unwrap();
        assert!(second.notified.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tick_reports_earliest_backoff() {
        let mut waiting = row(1, 193, 0, 0);
        waiting.row.set(columns::NUM_FAILED, 1_i64);
        waiting.row.set(columns::LAST_MODIFIED_MS, 0_i64);
        let (scheduler, _rx) = scheduler(vec![waiting], StaticConnectivity::default());

        let report = scheduler.tick(10_000).await.unwrap();
        assert!(report.to_start.is_empty());
        let wakeup = report.next_wakeup_ms.unwrap();
        // base 30 * (1000 + jitter) lands between 30 and 60 seconds
        assert!((20_000..=50_000).contains(&wakeup), "{wakeup}");
    }

    #[tokio::test]
    async fn test_tick_skips_malformed_rows() {
        let mut bad = row(2, 190, 0, 0);
        bad.row.set(columns::STATUS, 7_i64);
        let (scheduler, _rx) = scheduler(vec![row(1, 190, 0, 0), bad], StaticConnectivity::default());

        let report = scheduler.tick(0).await.unwrap();
        assert_eq!(report.to_start, vec![1]);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_tick_with_exhausted_backoff_and_negative_clock() {
        let mut exhausted = row(1, 193, 0, 0);
        exhausted.row.set(columns::NUM_FAILED, 64_i64);
        let (scheduler, _rx) = scheduler(vec![exhausted], StaticConnectivity::default());

        let report = scheduler.tick(-1).await.unwrap();
        assert!(report.to_start.is_empty());
        assert_eq!(report.next_wakeup_ms, Some(i64::MAX));
    }
}
