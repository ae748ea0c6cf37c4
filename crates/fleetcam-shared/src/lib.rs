//! # fleetcam-shared
//!
//! Types and constants shared by the fleetcam store and server: the device
//! identity newtype, the default configuration every device starts with, and
//! the naming scheme for uploaded images.

pub mod constants;
pub mod error;
pub mod naming;
pub mod types;

pub use error::IdError;
pub use types::DeviceId;
