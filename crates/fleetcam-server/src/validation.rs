//! Request bodies and their validation rules.
//!
//! Bodies derive [`garde::Validate`]; a failed check becomes a single
//! [`ServerError::InvalidInput`] listing every offending field.

use axum::extract::rejection::JsonRejection;
use fleetcam_shared::constants::{MAX_RESOLUTION, MIN_RESOLUTION};
use fleetcam_store::ConfigPatch;
use garde::{Report, Validate};
use serde::Deserialize;

use crate::error::ServerError;

const RESOLUTION_MIN: i64 = MIN_RESOLUTION as i64;
const RESOLUTION_MAX: i64 = MAX_RESOLUTION as i64;

/// Admin patch of a device configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigUpdateRequest {
    #[garde(skip)]
    pub paused: bool,

    #[garde(length(min = 1, max = 64))]
    pub px_format: String,

    #[garde(range(min = RESOLUTION_MIN, max = RESOLUTION_MAX))]
    pub resolution: i64,

    #[garde(length(max = 48), inner(length(min = 1, max = 16)))]
    pub hours: Vec<String>,
}

impl ConfigUpdateRequest {
    /// Validate the request and turn it into a store patch.
    pub fn into_patch(self) -> Result<ConfigPatch, ServerError> {
        validate_struct(&self)?;
        let resolution = u8::try_from(self.resolution).map_err(|_| {
            ServerError::InvalidInput(format!("resolution: {} out of range", self.resolution))
        })?;

        Ok(ConfigPatch {
            paused: self.paused,
            px_format: self.px_format,
            resolution,
            hours: self.hours,
        })
    }
}

/// Error report pushed by a device.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReportRequest {
    /// Any JSON integer; non-integers are rejected while decoding.
    #[garde(skip)]
    pub error_code: i64,
}

/// Convert a garde report into an `InvalidInput` error.
pub fn validate_struct<T>(value: &T) -> Result<(), ServerError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| ServerError::InvalidInput(format_validation_errors(&report)))
}

/// Format validation errors from a garde report into one human-readable line.
fn format_validation_errors(report: &Report) -> String {
    report
        .iter()
        .map(|(path, error)| {
            if path.to_string().is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::InvalidInput(rejection.body_text())
    }
}
