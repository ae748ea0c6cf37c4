//! Append-only per-device error log.

use chrono::{DateTime, Utc};
use fleetcam_shared::DeviceId;
use rusqlite::params;

use crate::database::{parse_device_id, parse_timestamp, Database};
use crate::error::Result;
use crate::models::ErrorLogEntry;

impl Database {
    /// Append an error reported by `id` at `now` and return the stored entry.
    pub fn append_error(&self, id: &DeviceId, error: i64, now: DateTime<Utc>) -> Result<ErrorLogEntry> {
        let entry = self.conn().query_row(
            "INSERT INTO device_errors (device_id, error, timestamp)
             VALUES (?1, ?2, ?3)
             RETURNING seq, device_id, error, timestamp",
            params![id.as_str(), error, now.to_rfc3339()],
            row_to_entry,
        )?;
        Ok(entry)
    }

    /// All errors reported by `id`, oldest first.
    pub fn list_errors(&self, id: &DeviceId) -> Result<Vec<ErrorLogEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT seq, device_id, error, timestamp
             FROM device_errors
             WHERE device_id = ?1
             ORDER BY seq ASC",
        )?;

        let rows = stmt.query_map(params![id.as_str()], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ErrorLogEntry> {
    let seq: i64 = row.get(0)?;
    let id_str: String = row.get(1)?;
    let error: i64 = row.get(2)?;
    let ts_str: String = row.get(3)?;

    Ok(ErrorLogEntry {
        seq,
        id: parse_device_id(1, &id_str)?,
        error,
        timestamp: parse_timestamp(3, &ts_str)?,
    })
}
