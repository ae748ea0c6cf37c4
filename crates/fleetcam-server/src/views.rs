//! Output shapes built from the canonical store records.
//!
//! Each caller gets its own type: the device sees its operational fields and
//! the server's clock, administrators see the full record without the
//! storage row id, fleet listings see identity and freshness only.

use chrono::{DateTime, Utc};
use fleetcam_shared::DeviceId;
use fleetcam_store::{DeviceConfig, DeviceSummary, ErrorLogEntry};
use serde::Serialize;

/// What a device receives when it fetches its configuration.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub paused: bool,
    pub backup: bool,
    pub px_format: String,
    pub resolution: u8,
    pub hours: Vec<String>,
    /// Server response time in Unix milliseconds, as a decimal string.
    pub timestamp: String,
}

impl DeviceView {
    pub fn from_config(config: DeviceConfig, now: DateTime<Utc>) -> Self {
        Self {
            paused: config.paused,
            backup: config.backup,
            px_format: config.px_format,
            resolution: config.resolution,
            hours: config.hours,
            timestamp: now.timestamp_millis().to_string(),
        }
    }
}

/// Full-fidelity configuration for management tooling.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    pub id: DeviceId,
    pub paused: bool,
    pub backup: bool,
    pub resolution: u8,
    pub hours: Vec<String>,
    pub px_format: String,
    pub last_modified: DateTime<Utc>,
    pub last_pinged: DateTime<Utc>,
}

impl From<DeviceConfig> for AdminView {
    fn from(config: DeviceConfig) -> Self {
        Self {
            id: config.id,
            paused: config.paused,
            backup: config.backup,
            resolution: config.resolution,
            hours: config.hours,
            px_format: config.px_format,
            last_modified: config.last_modified,
            last_pinged: config.last_pinged,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummaryView {
    pub id: DeviceId,
    pub last_modified: DateTime<Utc>,
    pub last_pinged: DateTime<Utc>,
}

impl From<DeviceSummary> for DeviceSummaryView {
    fn from(summary: DeviceSummary) -> Self {
        Self {
            id: summary.id,
            last_modified: summary.last_modified,
            last_pinged: summary.last_pinged,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorView {
    pub id: DeviceId,
    pub error: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<ErrorLogEntry> for ErrorView {
    fn from(entry: ErrorLogEntry) -> Self {
        Self {
            id: entry.id,
            error: entry.error,
            timestamp: entry.timestamp,
        }
    }
}
