//! # fleetcam-store
//!
//! Durable device state for fleetcam, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides the typed operations of the three
//! stores the server is built on:
//! - the config store (implicit registration, ping and modify timestamps),
//! - the append-only error log,
//! - the image registry (names of blobs held by the byte store).
//!
//! Every operation is a single statement or a single short transaction, so a
//! handle can be shared between request handlers without holding it across
//! more than one call.

pub mod configs;
pub mod database;
pub mod error_log;
pub mod images;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
