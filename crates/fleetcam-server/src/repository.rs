//! Async seams between the synchronization service and durable state.
//!
//! The service only sees these traits; [`SqliteRepository`] implements all
//! three on top of the synchronous [`Database`], running each call on the
//! blocking pool and holding the connection only for that one call.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use fleetcam_shared::DeviceId;
use fleetcam_store::{
    ConfigPatch, Database, DefaultConfig, DeviceConfig, DeviceSummary, ErrorLogEntry, ImageRecord,
    StoreError,
};

use crate::error::ServerError;

/// Device configuration records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Return the config of `id`, refreshing its ping time. Creates the
    /// default record first when absent and `register_if_absent` is set.
    async fn fetch_or_register(
        &self,
        id: &DeviceId,
        register_if_absent: bool,
    ) -> Result<Option<DeviceConfig>, ServerError>;

    /// Side-effect free read.
    async fn fetch_for_admin(&self, id: &DeviceId) -> Result<Option<DeviceConfig>, ServerError>;

    async fn list_summaries(&self) -> Result<Vec<DeviceSummary>, ServerError>;

    /// Apply an admin patch. Unknown devices are `ServerError::NotFound`.
    async fn apply_update(&self, id: &DeviceId, patch: ConfigPatch) -> Result<(), ServerError>;
}

/// Append-only device error log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ErrorLogRepository: Send + Sync {
    async fn append(&self, id: &DeviceId, error: i64) -> Result<ErrorLogEntry, ServerError>;

    async fn list_for(&self, id: &DeviceId) -> Result<Vec<ErrorLogEntry>, ServerError>;
}

/// Names of the images held for each device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn record_image(&self, id: &DeviceId, name: &str) -> Result<(), ServerError>;

    async fn list_images(&self, id: &DeviceId) -> Result<Vec<ImageRecord>, ServerError>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SqliteRepository {
    db: Arc<Mutex<Database>>,
    defaults: Arc<DefaultConfig>,
}

impl SqliteRepository {
    pub fn new(db: Database, defaults: DefaultConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            defaults: Arc::new(defaults),
        }
    }

    /// Run `f` against the database on the blocking pool.
    async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| ServerError::Internal(format!("Database lock poisoned: {e}")))?;
            f(&guard).map_err(ServerError::from)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("Database task failed: {e}")))?
    }
}

#[async_trait]
impl ConfigRepository for SqliteRepository {
    async fn fetch_or_register(
        &self,
        id: &DeviceId,
        register_if_absent: bool,
    ) -> Result<Option<DeviceConfig>, ServerError> {
        let id = id.clone();
        let defaults = self.defaults.clone();
        self.with_db(move |db| db.fetch_or_register(&id, register_if_absent, &defaults, Utc::now()))
            .await
    }

    async fn fetch_for_admin(&self, id: &DeviceId) -> Result<Option<DeviceConfig>, ServerError> {
        let id = id.clone();
        self.with_db(move |db| db.fetch_for_admin(&id)).await
    }

    async fn list_summaries(&self) -> Result<Vec<DeviceSummary>, ServerError> {
        self.with_db(|db| db.list_summaries()).await
    }

    async fn apply_update(&self, id: &DeviceId, patch: ConfigPatch) -> Result<(), ServerError> {
        let owned = id.clone();
        self.with_db(move |db| db.apply_update(&owned, &patch, Utc::now()))
            .await
            .map_err(|e| match e {
                ServerError::NotFound(_) => ServerError::NotFound(format!("Device {id}")),
                other => other,
            })
    }
}

#[async_trait]
impl ErrorLogRepository for SqliteRepository {
    async fn append(&self, id: &DeviceId, error: i64) -> Result<ErrorLogEntry, ServerError> {
        let id = id.clone();
        self.with_db(move |db| db.append_error(&id, error, Utc::now()))
            .await
    }

    async fn list_for(&self, id: &DeviceId) -> Result<Vec<ErrorLogEntry>, ServerError> {
        let id = id.clone();
        self.with_db(move |db| db.list_errors(&id)).await
    }
}

#[async_trait]
impl ImageRepository for SqliteRepository {
    async fn record_image(&self, id: &DeviceId, name: &str) -> Result<(), ServerError> {
        let id = id.clone();
        let name = name.to_string();
        self.with_db(move |db| db.record_image(&id, &name, Utc::now()))
            .await
    }

    async fn list_images(&self, id: &DeviceId) -> Result<Vec<ImageRecord>, ServerError> {
        let id = id.clone();
        self.with_db(move |db| db.list_images(&id)).await
    }
}
