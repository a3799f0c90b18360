//! Handlers for the webhook commands.
//!
//! Each handler receives the resolved registration and the command's `data`
//! object, mutates the hub and returns the JSON body of a successful response.

use crate::error::{BridgeError, Result};
use crate::hub::Hub;
use crate::registration::{Registration, RegistrationUpdate};
use crate::sensors::{SensorDescriptor, SensorKind, SensorUpdate, StoreKey};
use log::debug;
use serde_json::{Map, Value, json};
use std::str::FromStr;

const SENSOR_UNIQUE_ID: &str = "sensor_unique_id";
const SENSOR_NAME: &str = "sensor_name";
const SENSOR_TYPE: &str = "sensor_type";
const SENSOR_STATE: &str = "sensor_state";
const SENSOR_ICON: &str = "sensor_icon";
const SENSOR_ATTRIBUTES: &str = "sensor_attributes";
const SENSOR_DEVICE_CLASS: &str = "sensor_device_class";
const SENSOR_UNIT: &str = "sensor_unit_of_measurement";
const SENSOR_STATE_CLASS: &str = "sensor_state_class";
const SENSOR_ENTITY_CATEGORY: &str = "sensor_entity_category";

fn success() -> Value {
    json!({"success": true})
}

/// Command `data` as an object. A missing `data` counts as empty.
fn data_object(payload: Value) -> Result<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(BridgeError::validation("'data' must be an object")),
    }
}

fn required_str<'a>(data: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match data.get(field) {
        None | Some(Value::Null) => Err(BridgeError::missing_field(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(BridgeError::validation(format!(
            "Field '{}' must be a string",
            field
        ))),
    }
}

fn optional_str(data: &Map<String, Value>, field: &str) -> Option<String> {
    data.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn attributes(data: &Map<String, Value>) -> Option<Map<String, Value>> {
    data.get(SENSOR_ATTRIBUTES)
        .and_then(Value::as_object)
        .cloned()
}

/// `register_sensor`: upsert a sensor descriptor and announce it.
pub fn register_sensor(hub: &Hub, registration: &Registration, payload: Value) -> Result<Value> {
    let data = data_object(payload)?;

    // Presence of every required field is checked before any value
    for field in [SENSOR_UNIQUE_ID, SENSOR_NAME, SENSOR_TYPE] {
        if data.get(field).is_none_or(Value::is_null) {
            return Err(BridgeError::missing_field(field));
        }
    }
    let sensor_unique_id = required_str(&data, SENSOR_UNIQUE_ID)?;
    let sensor_name = required_str(&data, SENSOR_NAME)?;
    let sensor_type = required_str(&data, SENSOR_TYPE)?;

    let kind = SensorKind::from_str(sensor_type).map_err(|_| {
        BridgeError::validation(format!(
            "Invalid sensor type: {}. Must be 'sensor' or 'binary_sensor'.",
            sensor_type
        ))
    })?;

    let mut descriptor =
        SensorDescriptor::new(&registration.device_id, sensor_unique_id, sensor_name, kind);
    descriptor.last_state = data.get(SENSOR_STATE).filter(|v| !v.is_null()).cloned();
    descriptor.icon = optional_str(&data, SENSOR_ICON);
    descriptor.device_class = optional_str(&data, SENSOR_DEVICE_CLASS);
    descriptor.unit = optional_str(&data, SENSOR_UNIT);
    descriptor.state_class = optional_str(&data, SENSOR_STATE_CLASS);
    descriptor.entity_category = optional_str(&data, SENSOR_ENTITY_CATEGORY);
    descriptor.attributes = attributes(&data).unwrap_or_default();

    hub.register_sensor(descriptor)?;
    Ok(success())
}

/// `update_sensor_states`: buffer and publish a batch of state pushes.
pub fn update_sensor_states(hub: &Hub, registration: &Registration, payload: Value) -> Result<Value> {
    let data = data_object(payload)?;
    let items = match data.get("sensors") {
        None | Some(Value::Null) => return Ok(success()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(BridgeError::validation("'sensors' must be a list")),
    };

    let mut applied = 0;
    for item in items {
        let Some(item) = item.as_object() else {
            continue;
        };
        let Some(sensor_unique_id) = item
            .get(SENSOR_UNIQUE_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        else {
            continue;
        };

        let update = SensorUpdate {
            state: item.get(SENSOR_STATE).cloned(),
            icon: optional_str(item, SENSOR_ICON),
            attributes: attributes(item),
        };
        hub.push_update(
            &registration.secret_handle,
            StoreKey::new(&registration.device_id, sensor_unique_id),
            update,
        )?;
        applied += 1;
    }

    debug!(
        "[Webhook] Updated {} of {} sensor state(s) for device {}",
        applied,
        items.len(),
        registration.device_id
    );
    Ok(success())
}

/// `update_registration`: change the allow-listed registration fields.
pub fn update_registration(hub: &Hub, registration: &Registration, payload: Value) -> Result<Value> {
    let data = data_object(payload)?;
    let update: RegistrationUpdate = serde_json::from_value(Value::Object(data))
        .map_err(|e| BridgeError::validation(format!("Invalid registration update: {}", e)))?;

    hub.update_registration(&registration.device_id, &update)?;
    Ok(success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::RegistrationRequest;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    fn setup() -> (Hub, Registration) {
        let hub = Hub::in_memory();
        let outcome = hub
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();
        let registration = hub.resolve(outcome.secret_handle.as_str()).unwrap();
        (hub, registration)
    }

    #[test]
    fn test_register_sensor_missing_fields() {
        let (hub, registration) = setup();
        let err = register_sensor(
            &hub,
            &registration,
            json!({"sensor_unique_id": "cpu", "sensor_type": "sensor"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: sensor_name");

        let err = register_sensor(&hub, &registration, Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: sensor_unique_id");
    }

    #[test]
    fn test_register_sensor_invalid_type() {
        let (hub, registration) = setup();
        let err = register_sensor(
            &hub,
            &registration,
            json!({"sensor_unique_id": "cpu", "sensor_name": "CPU", "sensor_type": "switch"}),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid sensor type: switch. Must be 'sensor' or 'binary_sensor'."
        );
        assert!(hub.sensors_for("dev1", SensorKind::Numeric).is_empty());
    }

    #[test]
    fn test_register_sensor_keeps_rendering_hints() {
        let (hub, registration) = setup();
        register_sensor(
            &hub,
            &registration,
            json!({
                "sensor_unique_id": "battery",
                "sensor_name": "Battery",
                "sensor_type": "sensor",
                "sensor_state": 81,
                "sensor_icon": "mdi:battery",
                "sensor_device_class": "battery",
                "sensor_unit_of_measurement": "%",
                "sensor_state_class": "measurement",
                "sensor_attributes": {"charging": true},
            }),
        )
        .unwrap();

        let descriptor = hub.sensor(&StoreKey::new("dev1", "battery")).unwrap();
        assert_eq!(descriptor.last_state, Some(json!(81)));
        assert_eq!(descriptor.icon.as_deref(), Some("mdi:battery"));
        assert_eq!(descriptor.unit.as_deref(), Some("%"));
        assert_eq!(descriptor.entity_category, None);
        assert_eq!(descriptor.attributes.get("charging"), Some(&json!(true)));
    }

    #[test]
    fn test_update_sensor_states_buffers_and_skips() {
        let (hub, registration) = setup();
        update_sensor_states(
            &hub,
            &registration,
            json!({"sensors": [
                {"sensor_unique_id": "door", "sensor_state": true},
                {"sensor_state": 5},
                {"sensor_unique_id": "", "sensor_state": 6},
                "garbage",
            ]}),
        )
        .unwrap();

        assert_eq!(hub.pending_count(&registration.secret_handle), 1);
        let update = hub
            .take_pending(&registration.secret_handle, &StoreKey::new("dev1", "door"))
            .unwrap();
        assert_eq!(update.state, Some(json!(true)));
    }

    #[test]
    fn test_update_sensor_states_empty_and_invalid() {
        let (hub, registration) = setup();
        assert_eq!(
            update_sensor_states(&hub, &registration, json!({"sensors": []})).unwrap(),
            json!({"success": true})
        );
        update_sensor_states(&hub, &registration, json!({})).unwrap();
        assert_eq!(hub.pending_count(&registration.secret_handle), 0);

        let err = update_sensor_states(&hub, &registration, json!({"sensors": {"a": 1}}))
            .unwrap_err();
        assert_eq!(err.to_string(), "'sensors' must be a list");
    }

    #[test]
    fn test_update_registration_allow_list() {
        let store = Arc::new(MemoryStore::new());
        let hub = Hub::load(Arc::clone(&store)).unwrap();
        let outcome = hub
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();
        let registration = hub.resolve(outcome.secret_handle.as_str()).unwrap();

        update_registration(
            &hub,
            &registration,
            json!({"app_version": "2.0.1", "device_id": "hijack", "webhook_id": "x"}),
        )
        .unwrap();

        let updated = hub.registration("dev1").unwrap();
        assert_eq!(updated.app_version.as_deref(), Some("2.0.1"));
        assert_eq!(updated.secret_handle, registration.secret_handle);
        assert!(hub.registration("hijack").is_none());
        assert_eq!(store.save_count(), 2);

        let err = update_registration(&hub, &registration, json!({"os_version": 11}));
        assert!(matches!(err, Err(BridgeError::Validation(_))));
    }
}
