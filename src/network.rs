//! Network eligibility policy and the connectivity facts it consumes.
//!
//! [`can_use_network`] is a pure function; resolving whether a network is
//! available or roaming is the job of a [`ConnectivityProvider`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::record::Destination;

/// Kind of the currently active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    #[default]
    None,
    Mobile,
    Wifi,
    Ethernet,
    Bluetooth,
    Other,
}

impl NetworkType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Mobile => "mobile",
            Self::Wifi => "wifi",
            Self::Ethernet => "ethernet",
            Self::Bluetooth => "bluetooth",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "mobile" => Ok(Self::Mobile),
            "wifi" => Ok(Self::Wifi),
            "ethernet" => Ok(Self::Ethernet),
            "bluetooth" => Ok(Self::Bluetooth),
            "other" => Ok(Self::Other),
            _ => Err(format!("invalid network type: {s}")),
        }
    }
}

/// Decides whether a download headed for `destination` may use the network now.
///
/// `available` must already account for per-caller restrictions.
#[must_use]
pub fn can_use_network(available: bool, roaming: bool, destination: Destination) -> bool {
    if !available {
        return false;
    }
    match destination {
        Destination::CacheNoRoaming => !roaming,
        Destination::External
        | Destination::CachePartition
        | Destination::CachePartitionPurgeable
        | Destination::FileUri => true,
    }
}

/// Live connectivity facts.
pub trait ConnectivityProvider: Send + Sync {
    /// Whether any usable network exists for this caller.
    fn available(&self) -> bool;

    /// Whether the active network is roaming.
    fn roaming(&self) -> bool;

    /// Kind of the active network.
    fn active_network_type(&self) -> NetworkType;
}

/// Connectivity facts fixed at construction, e.g. from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticConnectivity {
    pub available: bool,
    pub roaming: bool,
    pub network_type: NetworkType,
}

impl StaticConnectivity {
    /// Connected, not roaming.
    #[must_use]
    pub fn online(network_type: NetworkType) -> Self {
        Self {
            available: true,
            roaming: false,
            network_type,
        }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self {
            available: false,
            roaming: false,
            network_type: NetworkType::None,
        }
    }
}

impl Default for StaticConnectivity {
    fn default() -> Self {
        Self::online(NetworkType::Wifi)
    }
}

impl ConnectivityProvider for StaticConnectivity {
    fn available(&self) -> bool {
        self.available
    }

    fn roaming(&self) -> bool {
        self.roaming
    }

    fn active_network_type(&self) -> NetworkType {
        self.network_type
    }
}
