//! Records persisted in the SQLite database.
//!
//! [`DeviceConfig`] is the canonical record; the projections handed to
//! devices and administrators are built from it by the server.

use chrono::{DateTime, Utc};
use fleetcam_shared::constants::{DEFAULT_HOURS, DEFAULT_PX_FORMAT, DEFAULT_RESOLUTION};
use fleetcam_shared::DeviceId;

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Configuration state of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Storage row identifier. Never leaves the server.
    pub record_id: i64,
    /// Identity the device assigned to itself.
    pub id: DeviceId,
    /// Whether the device should halt normal operation.
    pub paused: bool,
    /// Whether backup mode is requested.
    pub backup: bool,
    /// Encoded capture resolution, always within 0..=63.
    pub resolution: u8,
    /// Active operating windows as time-of-day strings.
    pub hours: Vec<String>,
    /// Pixel/image encoding identifier.
    pub px_format: String,
    /// When an admin update was last applied.
    pub last_modified: DateTime<Utc>,
    /// When the device last fetched its configuration.
    pub last_pinged: DateTime<Utc>,
}

/// Values written for a device on its first registering fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultConfig {
    pub paused: bool,
    pub backup: bool,
    pub resolution: u8,
    pub hours: Vec<String>,
    pub px_format: String,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            paused: false,
            backup: false,
            resolution: DEFAULT_RESOLUTION,
            hours: DEFAULT_HOURS.iter().map(|h| h.to_string()).collect(),
            px_format: DEFAULT_PX_FORMAT.to_string(),
        }
    }
}

/// Fields an admin update replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPatch {
    pub paused: bool,
    pub px_format: String,
    pub resolution: u8,
    pub hours: Vec<String>,
}

/// Identity and freshness of one device, for fleet overviews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub id: DeviceId,
    pub last_modified: DateTime<Utc>,
    pub last_pinged: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ErrorLogEntry
// ---------------------------------------------------------------------------

/// One reported device error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLogEntry {
    /// Insertion sequence number, unique across the whole log.
    pub seq: i64,
    /// Reporting device.
    pub id: DeviceId,
    /// Device-defined error code.
    pub error: i64,
    /// When the server received the report.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ImageRecord
// ---------------------------------------------------------------------------

/// A blob name registered under a device's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: DeviceId,
    pub name: String,
    pub recorded_at: DateTime<Utc>,
}
