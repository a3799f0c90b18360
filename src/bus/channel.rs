//! Bus channels and the events carried on them.

use crate::registration::Registration;
use crate::sensors::{SensorDescriptor, SensorKind, SensorUpdate, StoreKey};

/// Where an event is published.
///
/// Consumers subscribe narrowly: a platform only hears about sensors of its own
/// device and kind, an entity only about its own store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Registrations being created or removed.
    DeviceLifecycle,
    /// A sensor of `kind` was registered for `device_id`, or left that kind.
    SensorCreated { device_id: String, kind: SensorKind },
    /// A state push for one sensor.
    SensorUpdated(StoreKey),
}

impl Channel {
    pub fn sensor_created(device_id: &str, kind: SensorKind) -> Self {
        Channel::SensorCreated {
            device_id: device_id.to_string(),
            kind,
        }
    }

    pub fn sensor_updated(store_key: &StoreKey) -> Self {
        Channel::SensorUpdated(store_key.clone())
    }
}

#[derive(Debug, Clone)]
pub enum BusEvent {
    DeviceRegistered(Registration),
    DeviceRemoved { device_id: String },
    SensorCreated(SensorDescriptor),
    /// The sensor was re-registered under another kind. Sent on the old kind's
    /// creation channel.
    SensorRetired(StoreKey),
    SensorUpdated {
        store_key: StoreKey,
        update: SensorUpdate,
    },
}
