//! Naming convention for per-device image blobs.
//!
//! Blob names are derived from the upload time, so two uploads from the same
//! device only collide when they land in the same microsecond; a collision
//! overwrites the earlier image. Names sort chronologically as plain strings.

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::constants::IMAGE_EXTENSION;
use crate::types::DeviceId;

/// Blob name for an image received at `at`.
pub fn image_name(at: DateTime<Utc>) -> String {
    format!("{}.{}", at.format("%Y%m%dT%H%M%S%.6fZ"), IMAGE_EXTENSION)
}

/// Bytes escaped in the device id segment of a public path: everything a
/// URL path segment cannot carry literally, plus `%` itself.
const ID_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Public path under which a device image is served. The id segment is
/// percent-encoded so the path can be requested as-is.
pub fn image_path(prefix: &str, id: &DeviceId, name: &str) -> String {
    format!(
        "{}/{}/{}",
        prefix.trim_end_matches('/'),
        utf8_percent_encode(id.as_str(), ID_SEGMENT),
        name
    )
}

/// Whether `name` could have been produced by [`image_name`]. Used to keep
/// caller-supplied names from escaping the device's directory.
pub fn is_valid_image_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}
