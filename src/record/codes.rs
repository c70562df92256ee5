//! Closed enumerations for the integer codes persisted on each download row.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage target category for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Shared external storage.
    External,
    /// App-private cache partition.
    CachePartition,
    /// Cache partition that may be purged under storage pressure.
    CachePartitionPurgeable,
    /// Cache partition; the transfer must not run while roaming.
    CacheNoRoaming,
    /// Caller supplied an explicit file location.
    FileUri,
}

impl Destination {
    /// All destination kinds, in code order.
    pub const ALL: [Self; 5] = [
        Self::External,
        Self::CachePartition,
        Self::CachePartitionPurgeable,
        Self::CacheNoRoaming,
        Self::FileUri,
    ];

    /// Returns the stored integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::External => 0,
            Self::CachePartition => 1,
            Self::CachePartitionPurgeable => 2,
            Self::CacheNoRoaming => 3,
            Self::FileUri => 4,
        }
    }

    /// Decodes a stored integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::External),
            1 => Some(Self::CachePartition),
            2 => Some(Self::CachePartitionPurgeable),
            3 => Some(Self::CacheNoRoaming),
            4 => Some(Self::FileUri),
            _ => None,
        }
    }
}

/// Caller intent for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Run,
    Paused,
}

impl Control {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Run => 0,
            Self::Paused => 1,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Run),
            1 => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Whether and when a notification is shown for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Shown while running, not after completion.
    Visible,
    /// Shown while running and after completion.
    VisibleNotifyCompleted,
    /// Never shown.
    Hidden,
}

impl Visibility {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Visible => 0,
            Self::VisibleNotifyCompleted => 1,
            Self::Hidden => 2,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Visible),
            1 => Some(Self::VisibleNotifyCompleted),
            2 => Some(Self::Hidden),
            _ => None,
        }
    }
}

/// Stored code for [`DownloadStatus::Pending`].
pub const STATUS_PENDING: i64 = 190;
/// Stored code for [`DownloadStatus::Running`].
pub const STATUS_RUNNING: i64 = 192;
/// Stored code for [`DownloadStatus::RunningPaused`].
pub const STATUS_RUNNING_PAUSED: i64 = 193;
/// Stored code for [`DownloadStatus::Success`].
pub const STATUS_SUCCESS: i64 = 200;

/// Failure codes the transfer engine writes. Any code in `400..=599`
/// is accepted as a failure; these are the ones it produces itself.
pub mod failure {
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_ACCEPTABLE: u16 = 406;
    pub const LENGTH_REQUIRED: u16 = 411;
    pub const PRECONDITION_FAILED: u16 = 412;
    pub const CANCELED: u16 = 490;
    pub const UNKNOWN_ERROR: u16 = 491;
    pub const FILE_ERROR: u16 = 492;
    pub const UNHANDLED_REDIRECT: u16 = 493;
    pub const UNHANDLED_HTTP_CODE: u16 = 494;
    pub const HTTP_DATA_ERROR: u16 = 495;
    pub const HTTP_EXCEPTION: u16 = 496;
    pub const TOO_MANY_REDIRECTS: u16 = 497;
    pub const INSUFFICIENT_SPACE: u16 = 498;
    pub const DEVICE_NOT_FOUND: u16 = 499;
}

/// Transfer status of a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// Code 0: the transfer engine has not touched the record yet.
    NotStarted,
    Pending,
    Running,
    /// Stopped mid-transfer, waiting for connectivity or a retry deadline.
    RunningPaused,
    Success,
    /// Terminal failure carrying its `400..=599` code.
    Failed(u16),
}

impl DownloadStatus {
    /// Returns the stored integer code.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::NotStarted => 0,
            Self::Pending => STATUS_PENDING,
            Self::Running => STATUS_RUNNING,
            Self::RunningPaused => STATUS_RUNNING_PAUSED,
            Self::Success => STATUS_SUCCESS,
            Self::Failed(code) => i64::from(code),
        }
    }

    /// Decodes a stored integer code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NotStarted),
            STATUS_PENDING => Some(Self::Pending),
            STATUS_RUNNING => Some(Self::Running),
            STATUS_RUNNING_PAUSED => Some(Self::RunningPaused),
            STATUS_SUCCESS => Some(Self::Success),
            400..=599 => u16::try_from(code).ok().map(Self::Failed),
            _ => None,
        }
    }

    /// Returns true for terminal codes (success or failure).
    #[must_use]
    pub fn is_completed(self) -> bool {
        match self {
            Self::Success | Self::Failed(_) => true,
            Self::NotStarted | Self::Pending | Self::Running | Self::RunningPaused => false,
        }
    }

    /// Returns true for terminal failure codes.
    #[must_use]
    pub fn is_error(self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::Running => "running",
            Self::RunningPaused => "running_paused",
            Self::Success => "success",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(code) => write!(f, "failed({code})"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
