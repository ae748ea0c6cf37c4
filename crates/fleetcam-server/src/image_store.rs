use std::path::{Component, Path, PathBuf};

use fleetcam_shared::naming::is_valid_image_name;
use fleetcam_shared::DeviceId;
use tokio::fs;
use tracing::{debug, info};

use crate::error::ServerError;

/// Join `segment` onto `dir` as exactly one directory entry.
fn join_segment(dir: &Path, segment: &str) -> Result<PathBuf, ServerError> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(entry)), None) if entry == segment => Ok(dir.join(entry)),
        _ => Err(ServerError::InvalidPathParam(format!(
            "Invalid path segment: {segment:?}"
        ))),
    }
}

/// Filesystem byte store for device images, laid out as
/// `<base>/<device id>/<image name>`. The bytes are never inspected.
#[derive(Debug, Clone)]
pub struct ImageStore {
    base_path: PathBuf,
    max_size: usize,
}

impl ImageStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::Storage(format!(
                "Failed to create image directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Image store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Write `data` as image `name` of device `id`, replacing any image of
    /// the same name.
    pub async fn store_image(
        &self,
        id: &DeviceId,
        name: &str,
        data: &[u8],
    ) -> Result<(), ServerError> {
        if data.is_empty() {
            return Err(ServerError::InvalidInput("Empty image".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::PayloadTooLarge { max: self.max_size });
        }

        let path = self.safe_image_path(id, name)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| {
                ServerError::Storage(format!("Failed to create directory for {}: {}", id, e))
            })?;
        }

        fs::write(&path, data).await.map_err(|e| {
            ServerError::Storage(format!("Failed to write image {}/{}: {}", id, name, e))
        })?;

        debug!(device = %id, name, size = data.len(), "Stored image");
        Ok(())
    }

    pub async fn read_image(&self, id: &DeviceId, name: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.safe_image_path(id, name)?;

        if !path.exists() {
            return Err(ServerError::NotFound(format!("Image {}/{}", id, name)));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ServerError::Storage(format!("Failed to read image {}/{}: {}", id, name, e))
        })?;

        debug!(device = %id, name, size = data.len(), "Read image");
        Ok(data)
    }

    fn safe_image_path(&self, id: &DeviceId, name: &str) -> Result<PathBuf, ServerError> {
        if !is_valid_image_name(name) {
            return Err(ServerError::InvalidPathParam(format!(
                "Invalid image name: {name}"
            )));
        }
        let device_dir = join_segment(&self.base_path, id.as_str())?;
        join_segment(&device_dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (ImageStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().to_path_buf(), 1024)
            .await
            .unwrap();
        (store, dir)
    }

    fn dev(raw: &str) -> DeviceId {
        DeviceId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_store_and_read() {
        let (store, dir) = test_store().await;
        let id = dev("dev-1");

        store.store_image(&id, "a.jpg", b"\xff\xd8jpeg").await.unwrap();
        let data = store.read_image(&id, "a.jpg").await.unwrap();
        assert_eq!(data, b"\xff\xd8jpeg");
        assert!(dir.path().join("dev-1").join("a.jpg").exists());
    }

    #[tokio::test]
    async fn test_same_name_overwrites() {
        let (store, _dir) = test_store().await;
        let id = dev("dev-1");

        store.store_image(&id, "a.jpg", b"first").await.unwrap();
        store.store_image(&id, "a.jpg", b"second").await.unwrap();
        assert_eq!(store.read_image(&id, "a.jpg").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let (store, _dir) = test_store().await;
        let result = store.store_image(&dev("dev-1"), "a.jpg", b"").await;
        assert!(matches!(result, Err(ServerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_oversized_image_rejected() {
        let (store, _dir) = test_store().await;
        let data = vec![0u8; 1025];
        let result = store.store_image(&dev("dev-1"), "a.jpg", &data).await;
        assert!(matches!(
            result,
            Err(ServerError::PayloadTooLarge { max: 1024 })
        ));
    }

    #[tokio::test]
    async fn test_missing_image_not_found() {
        let (store, _dir) = test_store().await;
        let result = store.read_image(&dev("dev-1"), "nope.jpg").await;
        assert!(matches!(result, Err(ServerError::NotFound(_))));
    }

    #[test]
    fn test_join_segment_accepts_single_entries_only() {
        let base = Path::new("images");
        assert_eq!(join_segment(base, "cam ?1").unwrap(), base.join("cam ?1"));
        assert_eq!(join_segment(base, "v1..2").unwrap(), base.join("v1..2"));
        for bad in ["", ".", "..", "a/b", "/abs", "a/"] {
            assert!(
                matches!(join_segment(base, bad), Err(ServerError::InvalidPathParam(_))),
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_traversal_name_rejected() {
        let (store, _dir) = test_store().await;
        let result = store.read_image(&dev("dev-1"), "../../etc/passwd").await;
        assert!(matches!(result, Err(ServerError::InvalidPathParam(_))));
    }
}
