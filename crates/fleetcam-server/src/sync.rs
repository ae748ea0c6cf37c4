//! Synchronization service: the operations the HTTP layer calls.
//!
//! A device that declares an initial connection is registered with the
//! default configuration on its first fetch; any other fetch of an unknown
//! device, and every admin update of one, is `NotFound`. Reads and writes are
//! not serialized per device, so a first registering fetch racing an update
//! may see the update fail as not found.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use fleetcam_shared::naming::{image_name, image_path};
use fleetcam_shared::DeviceId;
use fleetcam_store::ConfigPatch;
use tracing::{debug, info};

use crate::error::ServerError;
use crate::image_store::ImageStore;
use crate::repository::{ConfigRepository, ErrorLogRepository, ImageRepository};
use crate::views::{AdminView, DeviceSummaryView, DeviceView, ErrorView};

pub struct SyncService {
    configs: Arc<dyn ConfigRepository>,
    errors: Arc<dyn ErrorLogRepository>,
    images: Arc<dyn ImageRepository>,
    image_store: Arc<ImageStore>,
    image_prefix: String,
}

impl SyncService {
    pub fn new(
        configs: Arc<dyn ConfigRepository>,
        errors: Arc<dyn ErrorLogRepository>,
        images: Arc<dyn ImageRepository>,
        image_store: Arc<ImageStore>,
        image_prefix: impl Into<String>,
    ) -> Self {
        Self {
            configs,
            errors,
            images,
            image_store,
            image_prefix: image_prefix.into(),
        }
    }

    // ------------------------------------------------------------------
    // Configs
    // ------------------------------------------------------------------

    pub async fn get_fleet_summary(&self) -> Result<Vec<DeviceSummaryView>, ServerError> {
        let summaries = self.configs.list_summaries().await?;
        debug!(count = summaries.len(), "Listed fleet");
        Ok(summaries.into_iter().map(DeviceSummaryView::from).collect())
    }

    pub async fn get_device_config(
        &self,
        id: &DeviceId,
        initial_connection: bool,
    ) -> Result<DeviceView, ServerError> {
        let config = self
            .configs
            .fetch_or_register(id, initial_connection)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Device {id}")))?;

        debug!(device = %id, initial_connection, "Device fetched config");
        Ok(DeviceView::from_config(config, Utc::now()))
    }

    pub async fn get_device_config_for_admin(&self, id: &DeviceId) -> Result<AdminView, ServerError> {
        let config = self
            .configs
            .fetch_for_admin(id)
            .await?
            .ok_or_else(|| ServerError::NotFound(format!("Device {id}")))?;
        Ok(AdminView::from(config))
    }

    pub async fn update_device_config(
        &self,
        id: &DeviceId,
        patch: ConfigPatch,
    ) -> Result<(), ServerError> {
        let resolution = patch.resolution;
        self.configs.apply_update(id, patch).await?;
        info!(device = %id, resolution, "Device config updated");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    pub async fn get_device_errors(&self, id: &DeviceId) -> Result<Vec<ErrorView>, ServerError> {
        let entries = self.errors.list_for(id).await?;
        Ok(entries.into_iter().map(ErrorView::from).collect())
    }

    pub async fn report_device_error(&self, id: &DeviceId, code: i64) -> Result<(), ServerError> {
        let entry = self.errors.append(id, code).await?;
        info!(device = %id, error = entry.error, seq = entry.seq, "Device reported error");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub async fn list_device_images(&self, id: &DeviceId) -> Result<Vec<String>, ServerError> {
        let records = self.images.list_images(id).await?;
        Ok(records
            .iter()
            .map(|record| image_path(&self.image_prefix, id, &record.name))
            .collect())
    }

    /// Persist an uploaded image and register its name. The bytes are
    /// written first so a listed name always has bytes behind it.
    pub async fn record_device_image(&self, id: &DeviceId, data: Bytes) -> Result<String, ServerError> {
        let name = image_name(Utc::now());
        self.image_store.store_image(id, &name, &data).await?;
        self.images.record_image(id, &name).await?;

        info!(device = %id, name = %name, size = data.len(), "Device uploaded image");
        Ok(image_path(&self.image_prefix, id, &name))
    }

    pub async fn read_device_image(&self, id: &DeviceId, name: &str) -> Result<Vec<u8>, ServerError> {
        self.image_store.read_image(id, name).await
    }
}
