/// Application name
pub const APP_NAME: &str = "fleetcam";

/// Lowest accepted capture resolution code
pub const MIN_RESOLUTION: u8 = 0;

/// Highest accepted capture resolution code
pub const MAX_RESOLUTION: u8 = 63;

/// Resolution assigned to a device on first contact
pub const DEFAULT_RESOLUTION: u8 = 2;

/// Pixel format assigned to a device on first contact
pub const DEFAULT_PX_FORMAT: &str = "PXFORMAT_JPEG";

/// Operating window assigned to a device on first contact
pub const DEFAULT_HOURS: &[&str] = &["12:00"];

/// File extension of stored still images
pub const IMAGE_EXTENSION: &str = "jpg";

/// Default public prefix for synthesized image paths
pub const DEFAULT_IMAGE_PREFIX: &str = "/images";

/// Maximum accepted image upload in bytes (10 MiB)
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Default HTTP API port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Longest accepted device identity, in bytes
pub const MAX_DEVICE_ID_LEN: usize = 128;
