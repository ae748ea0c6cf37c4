//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use fleetcam_shared::constants::{
    APP_NAME, DEFAULT_HTTP_PORT, DEFAULT_IMAGE_PREFIX, MAX_IMAGE_SIZE,
};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file holding configs, error logs and image names.
    /// Env: `DATABASE_PATH`
    /// Default: `./fleetcam.db`
    pub database_path: PathBuf,

    /// Directory under which uploaded images are written, one
    /// sub-directory per device.
    /// Env: `IMAGE_STORAGE_PATH`
    /// Default: `./images`
    pub image_storage_path: PathBuf,

    /// Maximum image upload in bytes.
    /// Env: `MAX_IMAGE_SIZE`
    /// Default: 10 MiB
    pub max_image_size: usize,

    /// Prefix of the image paths handed out by image listings.
    /// Env: `IMAGE_PUBLIC_PREFIX`
    /// Default: `/images`
    pub image_public_prefix: String,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"fleetcam"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: PathBuf::from("./fleetcam.db"),
            image_storage_path: PathBuf::from("./images"),
            max_image_size: MAX_IMAGE_SIZE,
            image_public_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            instance_name: APP_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("IMAGE_STORAGE_PATH") {
            config.image_storage_path = PathBuf::from(path);
        }

        if let Some(val) = lookup("MAX_IMAGE_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_image_size = n,
                _ => {
                    tracing::warn!(value = %val, "Invalid MAX_IMAGE_SIZE, using default");
                }
            }
        }

        if let Some(prefix) = lookup("IMAGE_PUBLIC_PREFIX") {
            let prefix = prefix.trim_end_matches('/');
            if prefix.starts_with('/') {
                config.image_public_prefix = prefix.to_string();
            } else {
                tracing::warn!(
                    value = %prefix,
                    "IMAGE_PUBLIC_PREFIX must start with '/', using default"
                );
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_image_size, 10 * 1024 * 1024);
        assert_eq!(config.image_public_prefix, "/images");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/var/lib/fleetcam/db.sqlite"),
            ("MAX_IMAGE_SIZE", "2048"),
            ("IMAGE_PUBLIC_PREFIX", "/static/img/"),
            ("INSTANCE_NAME", "north-field"),
        ]));

        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/fleetcam/db.sqlite")
        );
        assert_eq!(config.max_image_size, 2048);
        assert_eq!(config.image_public_prefix, "/static/img");
        assert_eq!(config.instance_name, "north-field");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("MAX_IMAGE_SIZE", "0"),
            ("IMAGE_PUBLIC_PREFIX", "images"),
        ]));

        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.max_image_size, defaults.max_image_size);
        assert_eq!(config.image_public_prefix, defaults.image_public_prefix);
    }
}
