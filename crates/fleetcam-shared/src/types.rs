use serde::{Deserialize, Serialize};

use crate::constants::MAX_DEVICE_ID_LEN;
use crate::error::IdError;

/// Identity a device assigns to itself. It is the primary key of every
/// per-device record and also names the device's image directory, so it is
/// checked once on the way in and trusted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Accept `raw` exactly as the device sent it. Only values that cannot
    /// name a single directory entry are refused.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        if raw.is_empty() {
            return Err(IdError::Empty);
        }
        if raw.len() > MAX_DEVICE_ID_LEN {
            return Err(IdError::TooLong {
                max: MAX_DEVICE_ID_LEN,
            });
        }
        if let Some(c) = raw
            .chars()
            .find(|c| *c == '/' || *c == '\\' || c.is_control())
        {
            return Err(IdError::ForbiddenChar(c));
        }
        if raw == "." || raw == ".." {
            return Err(IdError::Traversal);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl std::str::FromStr for DeviceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
