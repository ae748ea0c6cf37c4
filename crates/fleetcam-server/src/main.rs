//! # fleetcam-server
//!
//! Backend for remote camera devices.
//!
//! This binary provides:
//! - **Config sync**: devices fetch their configuration, registering
//!   themselves with defaults on first contact; administrators read and
//!   patch it without touching the device's ping time
//! - **Error log**: devices push integer error codes, kept in arrival order
//! - **Image uploads**: raw still images stored per device and served back
//!   under synthesized public paths
//! - **REST API** (axum) for all of the above plus health and info

mod api;
mod config;
mod error;
mod image_store;
mod repository;
mod sync;
mod validation;
mod views;

use std::sync::Arc;

use fleetcam_store::{Database, DefaultConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::image_store::ImageStore;
use crate::repository::SqliteRepository;
use crate::sync::SyncService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,fleetcam_server=debug")),
        )
        .init();

    info!("Starting fleetcam server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // SQLite store (runs migrations on open)
    let db_path = config.database_path.clone();
    let database = tokio::task::spawn_blocking(move || Database::open_at(&db_path)).await??;
    let repository = Arc::new(SqliteRepository::new(database, DefaultConfig::default()));

    // Image byte store (creates directory if missing)
    let image_store = Arc::new(
        ImageStore::new(config.image_storage_path.clone(), config.max_image_size).await?,
    );
    info!(max_size = image_store.max_size(), "Image uploads enabled");

    let service = Arc::new(SyncService::new(
        repository.clone(),
        repository.clone(),
        repository,
        image_store,
        config.image_public_prefix.clone(),
    ));

    let http_addr = config.http_addr;
    let app_state = AppState {
        service,
        config: Arc::new(config),
    };

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
