//! Config store: one [`DeviceConfig`] per device identity.
//!
//! Reads and writes touch different timestamps. A device fetch only moves
//! `last_pinged`; an admin update only moves `last_modified`. The admin read
//! touches nothing.

use chrono::{DateTime, Utc};
use fleetcam_shared::DeviceId;
use rusqlite::{params, OptionalExtension, Transaction, TransactionBehavior};

use crate::database::{parse_device_id, parse_timestamp, Database};
use crate::error::{Result, StoreError};
use crate::models::{ConfigPatch, DefaultConfig, DeviceConfig, DeviceSummary};

const CONFIG_COLUMNS: &str =
    "record_id, device_id, paused, backup, resolution, hours, px_format, last_modified, last_pinged";

impl Database {
    // ------------------------------------------------------------------
    // Device-facing
    // ------------------------------------------------------------------

    /// Fetch the config of `id` on behalf of the device itself, refreshing
    /// its `last_pinged` to `now`.
    ///
    /// When no record exists and `register_if_absent` is set, a record with
    /// `defaults` is created first. The conditional insert and the ping run
    /// in one transaction, so concurrent first contacts still produce a
    /// single record. Returns `None` for an unknown device that did not ask
    /// to be registered.
    pub fn fetch_or_register(
        &self,
        id: &DeviceId,
        register_if_absent: bool,
        defaults: &DefaultConfig,
        now: DateTime<Utc>,
    ) -> Result<Option<DeviceConfig>> {
        // IMMEDIATE takes the write lock up front, so a concurrent writer
        // makes this wait on the busy timeout instead of failing mid-way.
        let tx = Transaction::new_unchecked(self.conn(), TransactionBehavior::Immediate)?;
        let now_str = now.to_rfc3339();

        if register_if_absent {
            let inserted = tx.execute(
                "INSERT INTO devices
                     (device_id, paused, backup, resolution, hours, px_format, last_modified, last_pinged)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(device_id) DO NOTHING",
                params![
                    id.as_str(),
                    defaults.paused,
                    defaults.backup,
                    defaults.resolution,
                    serde_json::to_string(&defaults.hours)?,
                    defaults.px_format,
                    now_str,
                ],
            )?;
            if inserted > 0 {
                tracing::info!(device = %id, "registered new device");
            }
        }

        let config = tx
            .query_row(
                &format!(
                    "UPDATE devices SET last_pinged = ?2
                     WHERE device_id = ?1
                     RETURNING {CONFIG_COLUMNS}"
                ),
                params![id.as_str(), now_str],
                row_to_config,
            )
            .optional()?;

        tx.commit()?;
        Ok(config)
    }

    // ------------------------------------------------------------------
    // Admin-facing
    // ------------------------------------------------------------------

    /// Read the config of `id` without side effects.
    pub fn fetch_for_admin(&self, id: &DeviceId) -> Result<Option<DeviceConfig>> {
        let config = self
            .conn()
            .query_row(
                &format!("SELECT {CONFIG_COLUMNS} FROM devices WHERE device_id = ?1"),
                params![id.as_str()],
                row_to_config,
            )
            .optional()?;
        Ok(config)
    }

    /// List identity and freshness of every known device, ordered by id.
    pub fn list_summaries(&self) -> Result<Vec<DeviceSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT device_id, last_modified, last_pinged
             FROM devices
             ORDER BY device_id ASC",
        )?;

        let rows = stmt.query_map([], row_to_summary)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    /// Replace the patchable fields of `id` and set `last_modified` to
    /// `now`. Fails with [`StoreError::NotFound`] for an unknown device;
    /// an update never creates a record.
    pub fn apply_update(&self, id: &DeviceId, patch: &ConfigPatch, now: DateTime<Utc>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE devices
             SET paused = ?2, px_format = ?3, resolution = ?4, hours = ?5, last_modified = ?6
             WHERE device_id = ?1",
            params![
                id.as_str(),
                patch.paused,
                patch.px_format,
                patch.resolution,
                serde_json::to_string(&patch.hours)?,
                now.to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceConfig> {
    let record_id: i64 = row.get(0)?;
    let id_str: String = row.get(1)?;
    let paused: bool = row.get(2)?;
    let backup: bool = row.get(3)?;
    let resolution: u8 = row.get(4)?;
    let hours_json: String = row.get(5)?;
    let px_format: String = row.get(6)?;
    let modified_str: String = row.get(7)?;
    let pinged_str: String = row.get(8)?;

    let hours: Vec<String> = serde_json::from_str(&hours_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(DeviceConfig {
        record_id,
        id: parse_device_id(1, &id_str)?,
        paused,
        backup,
        resolution,
        hours,
        px_format,
        last_modified: parse_timestamp(7, &modified_str)?,
        last_pinged: parse_timestamp(8, &pinged_str)?,
    })
}

fn row_to_summary(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceSummary> {
    let id_str: String = row.get(0)?;
    let modified_str: String = row.get(1)?;
    let pinged_str: String = row.get(2)?;

    Ok(DeviceSummary {
        id: parse_device_id(0, &id_str)?,
        last_modified: parse_timestamp(1, &modified_str)?,
        last_pinged: parse_timestamp(2, &pinged_str)?,
    })
}
