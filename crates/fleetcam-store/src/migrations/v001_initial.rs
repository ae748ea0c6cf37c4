//! v001 -- Initial schema creation.
//!
//! Creates the three tables: `devices`, `device_errors` and `device_images`.

use fleetcam_shared::constants::{MAX_RESOLUTION, MIN_RESOLUTION};
use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
fn up_sql() -> String {
    format!(
        r#"
-- ----------------------------------------------------------------
-- Devices (one configuration record per device identity)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS devices (
    record_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id     TEXT NOT NULL UNIQUE,          -- self-assigned identity
    paused        INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    backup        INTEGER NOT NULL DEFAULT 0,    -- boolean 0/1
    resolution    INTEGER NOT NULL CHECK (resolution BETWEEN {min} AND {max}),
    hours         TEXT NOT NULL,                 -- JSON array of "HH:MM"
    px_format     TEXT NOT NULL,
    last_modified TEXT NOT NULL,                 -- RFC-3339
    last_pinged   TEXT NOT NULL                  -- RFC-3339
);

-- ----------------------------------------------------------------
-- Device errors (append-only; seq gives insertion order)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS device_errors (
    seq       INTEGER PRIMARY KEY AUTOINCREMENT,
    device_id TEXT NOT NULL,
    error     INTEGER NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_device_errors_device_seq
    ON device_errors(device_id, seq);

-- ----------------------------------------------------------------
-- Device images (names only; bytes live in the byte store)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS device_images (
    device_id   TEXT NOT NULL,
    name        TEXT NOT NULL,
    recorded_at TEXT NOT NULL,

    PRIMARY KEY (device_id, name)
);
"#,
        min = MIN_RESOLUTION,
        max = MAX_RESOLUTION,
    )
}

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&up_sql())
}
