//! Completion notification delivery.
//!
//! Notifiers are fire-and-forget: [`CompletionNotifier::notify_completed`]
//! never blocks and never reports failure to the caller.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::record::{DownloadRecord, DownloadStatus, NotificationTarget};

/// What a completion notification carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionNotice {
    pub id: i64,
    pub status: DownloadStatus,
    pub title: Option<String>,
    pub target: Option<NotificationTarget>,
}

impl From<&DownloadRecord> for CompletionNotice {
    fn from(record: &DownloadRecord) -> Self {
        Self {
            id: record.id,
            status: record.status,
            title: record.display_title.clone(),
            target: record.notification_target.clone(),
        }
    }
}

/// Sink for completion notifications.
pub trait CompletionNotifier: Send + Sync {
    fn notify_completed(&self, notice: CompletionNotice);
}

/// Logs each notice at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl CompletionNotifier for TracingNotifier {
    fn notify_completed(&self, notice: CompletionNotice) {
        info!(
            id = notice.id,
            status = %notice.status,
            title = notice.title.as_deref().unwrap_or(""),
            target = notice.target.as_ref().map_or("", |t| t.package.as_str()),
            "download completed"
        );
    }
}

/// Forwards notices into a bounded channel, dropping them when it is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<CompletionNotice>,
}

impl ChannelNotifier {
    #[must_use]
    pub fn new(sender: mpsc::Sender<CompletionNotice>) -> Self {
        Self { sender }
    }

    /// Creates a notifier and the receiving end of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CompletionNotice>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }
}

impl CompletionNotifier for ChannelNotifier {
    fn notify_completed(&self, notice: CompletionNotice) {
        let id = notice.id;
        if let Err(error) = self.sender.try_send(notice) {
            warn!(id, %error, "dropping completion notice");
        }
    }
}
