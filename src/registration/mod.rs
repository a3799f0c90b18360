//! Device registrations.
//!
//! A registration binds a stable external `device_id` to a secret webhook
//! handle. The [`RegistrationDirectory`] owns every registration plus the
//! tombstones of removed devices.

pub mod directory;
pub mod secret;

pub use directory::{RegisterOutcome, RegistrationDirectory};
pub use secret::SecretHandle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback device name when a registration carries none.
pub const DEFAULT_DEVICE_NAME: &str = "Desktop App";
const DEFAULT_MANUFACTURER: &str = "Unknown";
const DEFAULT_MODEL: &str = "Desktop";

/// A registered device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// Snapshot key for this registration (UUIDv4).
    pub entry_id: String,
    pub device_id: String,
    pub device_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Serialized as `webhook_id`, the name clients know it by.
    #[serde(rename = "webhook_id")]
    pub secret_handle: SecretHandle,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    /// Device info used to link entities to this registration's device.
    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifier: self.device_id.clone(),
            name: if self.device_name.is_empty() {
                DEFAULT_DEVICE_NAME.to_string()
            } else {
                self.device_name.clone()
            },
            manufacturer: self
                .manufacturer
                .clone()
                .unwrap_or_else(|| DEFAULT_MANUFACTURER.to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            sw_version: self.app_version.clone(),
        }
    }
}

/// Body of a registration request. Required fields are optional here so a
/// missing field becomes a validation error instead of a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
}

impl RegistrationRequest {
    pub fn new(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            device_name: Some(device_name.into()),
            ..Self::default()
        }
    }
}

/// Allow-listed fields a device may change after registering.
///
/// Anything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RegistrationUpdate {
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
}

/// Device details shown next to the device's entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: Option<String>,
}
