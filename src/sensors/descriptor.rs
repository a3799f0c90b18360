//! Sensor descriptors and their store keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// The two sensor kinds a device may register.
///
/// The wire tags (`sensor`, `binary_sensor`) are what clients send in
/// `sensor_type`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
pub enum SensorKind {
    /// Free-form value (numbers, strings, ...).
    #[serde(rename = "sensor")]
    #[strum(serialize = "sensor")]
    Numeric,
    /// On/off value.
    #[serde(rename = "binary_sensor")]
    #[strum(serialize = "binary_sensor")]
    Binary,
}

/// Join key for a sensor across registry, pending buffer, and bus:
/// `<device_id>_<sensor_unique_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreKey(String);

impl StoreKey {
    pub fn new(device_id: &str, sensor_unique_id: &str) -> Self {
        Self(format!("{}_{}", device_id, sensor_unique_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable description of a registered sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    pub store_key: StoreKey,
    pub device_id: String,
    pub sensor_unique_id: String,
    pub display_name: String,
    pub kind: SensorKind,
    /// State sent along with the registration, if any.
    #[serde(default)]
    pub last_state: Option<Value>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub device_class: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub state_class: Option<String>,
    #[serde(default)]
    pub entity_category: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl SensorDescriptor {
    /// Minimal descriptor with no rendering hints.
    pub fn new(
        device_id: &str,
        sensor_unique_id: &str,
        display_name: impl Into<String>,
        kind: SensorKind,
    ) -> Self {
        Self {
            store_key: StoreKey::new(device_id, sensor_unique_id),
            device_id: device_id.to_string(),
            sensor_unique_id: sensor_unique_id.to_string(),
            display_name: display_name.into(),
            kind,
            last_state: None,
            icon: None,
            device_class: None,
            unit: None,
            state_class: None,
            entity_category: None,
            attributes: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_wire_tags() {
        assert_eq!(SensorKind::from_str("sensor").unwrap(), SensorKind::Numeric);
        assert_eq!(
            SensorKind::from_str("binary_sensor").unwrap(),
            SensorKind::Binary
        );
        assert!(SensorKind::from_str("switch").is_err());
        assert_eq!(SensorKind::Binary.as_ref(), "binary_sensor");
        assert_eq!(
            serde_json::to_value(SensorKind::Numeric).unwrap(),
            serde_json::json!("sensor")
        );
    }

    #[test]
    fn test_store_key_format() {
        let key = StoreKey::new("dev1", "cpu_load");
        assert_eq!(key.as_str(), "dev1_cpu_load");
        assert_eq!(
            SensorDescriptor::new("dev1", "cpu_load", "CPU", SensorKind::Numeric).store_key,
            key
        );
    }
}
