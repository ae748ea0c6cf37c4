//! Image registry: which blob names exist under each device's namespace.
//!
//! The bytes themselves are held by the server's byte store; this table only
//! records names so listings do not depend on scanning the filesystem.

use chrono::{DateTime, Utc};
use fleetcam_shared::DeviceId;
use rusqlite::params;

use crate::database::{parse_device_id, parse_timestamp, Database};
use crate::error::Result;
use crate::models::ImageRecord;

impl Database {
    /// Register `name` under `id`. Registering an existing name again only
    /// refreshes its `recorded_at`.
    pub fn record_image(&self, id: &DeviceId, name: &str, now: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "INSERT INTO device_images (device_id, name, recorded_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(device_id, name) DO UPDATE SET recorded_at = excluded.recorded_at",
            params![id.as_str(), name, now.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Images registered under `id`, ordered by name.
    pub fn list_images(&self, id: &DeviceId) -> Result<Vec<ImageRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT device_id, name, recorded_at
             FROM device_images
             WHERE device_id = ?1
             ORDER BY name ASC",
        )?;

        let rows = stmt.query_map(params![id.as_str()], row_to_image)?;

        let mut images = Vec::new();
        for row in rows {
            images.push(row?);
        }
        Ok(images)
    }
}

fn row_to_image(row: &rusqlite::Row<'_>) -> rusqlite::Result<ImageRecord> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let recorded_str: String = row.get(2)?;

    Ok(ImageRecord {
        id: parse_device_id(0, &id_str)?,
        name,
        recorded_at: parse_timestamp(2, &recorded_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn test_db() -> (Database, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open_at(&dir.path().join("fleet.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn test_record_and_list_sorted() {
        let (db, _dir) = test_db();
        let id = DeviceId::parse("dev-1").unwrap();
        let now = Utc::now();

        db.record_image(&id, "20240102T000000.000000Z.jpg", now).unwrap();
        db.record_image(&id, "20240101T000000.000000Z.jpg", now).unwrap();

        let names: Vec<String> = db.list_images(&id).unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(
            names,
            vec!["20240101T000000.000000Z.jpg", "20240102T000000.000000Z.jpg"]
        );
    }

    #[test]
    fn test_collision_overwrites() {
        let (db, _dir) = test_db();
        let id = DeviceId::parse("dev-1").unwrap();
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(10);

        db.record_image(&id, "same.jpg", t0).unwrap();
        db.record_image(&id, "same.jpg", t1).unwrap();

        let images = db.list_images(&id).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].recorded_at, t1);
    }

    #[test]
    fn test_namespaces_are_separate() {
        let (db, _dir) = test_db();
        let a = DeviceId::parse("cam-a").unwrap();
        let b = DeviceId::parse("cam-b").unwrap();

        db.record_image(&a, "x.jpg", Utc::now()).unwrap();

        assert_eq!(db.list_images(&a).unwrap().len(), 1);
        assert!(db.list_images(&b).unwrap().is_empty());
    }
}
