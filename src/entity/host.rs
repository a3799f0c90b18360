//! Entity host: keeps one pair of platforms per registered device.

use super::{EntityPlatform, EntitySink, PriorEntity, SensorEntity};
use crate::bus::{BusEvent, Channel, SubscriptionId};
use crate::hub::Hub;
use crate::registration::Registration;
use crate::sensors::SensorKind;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use strum::IntoEnumIterator;

/// Sink that only logs what it receives.
pub struct LoggingSink;

impl EntitySink for LoggingSink {
    fn add_entities(&self, entities: Vec<Arc<SensorEntity>>) {
        for entity in entities {
            info!(
                "[Entity] Added {} '{}' ({}) on {} [state: {}]",
                entity.kind(),
                entity.name(),
                entity.store_key(),
                entity.device().name,
                entity.state().render().as_deref().unwrap_or("unknown")
            );
        }
    }
}

pub struct EntityHost {
    hub: Arc<Hub>,
    sink: Arc<dyn EntitySink>,
    prior: Vec<PriorEntity>,
    platforms: Mutex<HashMap<String, Vec<Arc<EntityPlatform>>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl EntityHost {
    /// Attach platforms for every current registration and follow device lifecycle events.
    pub fn start(hub: Arc<Hub>, sink: Arc<dyn EntitySink>, prior: Vec<PriorEntity>) -> Arc<Self> {
        let host = Arc::new(Self {
            hub,
            sink,
            prior,
            platforms: Mutex::new(HashMap::new()),
            subscription: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&host);
        let id = host.hub.bus().subscribe(
            Channel::DeviceLifecycle,
            Arc::new(move |event: &BusEvent| {
                let Some(host) = weak.upgrade() else {
                    return;
                };
                match event {
                    BusEvent::DeviceRegistered(registration) => host.attach_device(registration),
                    BusEvent::DeviceRemoved { device_id } => host.detach_device(device_id),
                    _ => {}
                }
            }),
        );
        *host.subscription.lock() = Some(id);

        for registration in host.hub.registrations() {
            host.attach_device(&registration);
        }
        host
    }

    fn attach_device(&self, registration: &Registration) {
        let mut platforms = self.platforms.lock();
        if platforms.contains_key(&registration.device_id) {
            return;
        }

        let attached = SensorKind::iter()
            .map(|kind| {
                EntityPlatform::attach(
                    Arc::clone(&self.hub),
                    registration.clone(),
                    kind,
                    &self.prior,
                    Arc::clone(&self.sink),
                )
            })
            .collect();
        platforms.insert(registration.device_id.clone(), attached);
        info!("[Entity] Device {} set up", registration.device_id);
    }

    fn detach_device(&self, device_id: &str) {
        let removed = self.platforms.lock().remove(device_id);
        if let Some(platforms) = removed {
            for platform in platforms {
                platform.detach();
            }
            info!("[Entity] Device {} unloaded", device_id);
        }
    }

    /// Platforms of one device, numeric first.
    pub fn platforms_for(&self, device_id: &str) -> Vec<Arc<EntityPlatform>> {
        self.platforms
            .lock()
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current state of every live entity, for restoring on the next start.
    pub fn remembered(&self) -> Vec<PriorEntity> {
        let platforms: Vec<_> = self.platforms.lock().values().flatten().cloned().collect();
        platforms
            .iter()
            .flat_map(|platform| platform.entities())
            .map(|entity| PriorEntity {
                store_key: entity.store_key().clone(),
                kind: entity.kind(),
                last_state: entity.state().render(),
            })
            .collect()
    }

    pub fn device_count(&self) -> usize {
        self.platforms.lock().len()
    }

    /// Detach everything and stop following lifecycle events.
    pub fn shutdown(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.hub.bus().unsubscribe(id);
        }
        let all: Vec<_> = self.platforms.lock().drain().collect();
        for (_, platforms) in all {
            for platform in platforms {
                platform.detach();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::RegistrationRequest;
    use crate::sensors::{SensorDescriptor, SensorUpdate, StoreKey};
    use serde_json::json;

    #[test]
    fn test_host_follows_device_lifecycle() {
        let hub = Arc::new(Hub::in_memory());
        hub.register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();

        let host = EntityHost::start(Arc::clone(&hub), Arc::new(LoggingSink), Vec::new());
        assert_eq!(host.device_count(), 1);
        assert_eq!(host.platforms_for("dev1").len(), 2);

        let outcome = hub
            .register(RegistrationRequest::new("dev2", "Laptop"))
            .unwrap();
        assert_eq!(host.device_count(), 2);

        hub.register_sensor(SensorDescriptor::new(
            "dev2",
            "cpu",
            "CPU",
            SensorKind::Numeric,
        ))
        .unwrap();
        let key = StoreKey::new("dev2", "cpu");
        hub.push_update(
            &outcome.secret_handle,
            key.clone(),
            SensorUpdate {
                state: Some(json!(12)),
                ..SensorUpdate::default()
            },
        )
        .unwrap();
        let numeric = host
            .platforms_for("dev2")
            .into_iter()
            .find(|p| p.kind() == SensorKind::Numeric)
            .unwrap();
        assert_eq!(numeric.entity(&key).unwrap().value(), Some(json!(12)));

        let remembered = host.remembered();
        assert!(
            remembered
                .iter()
                .any(|p| p.store_key == key && p.last_state.as_deref() == Some("12"))
        );

        hub.remove_device("dev2").unwrap();
        assert_eq!(host.device_count(), 1);
        assert_eq!(hub.bus().listener_count(&Channel::sensor_updated(&key)), 0);

        host.shutdown();
        assert_eq!(hub.bus().listener_count(&Channel::DeviceLifecycle), 0);
    }

    #[test]
    fn test_kind_change_leaves_one_live_entity() {
        let hub = Arc::new(Hub::in_memory());
        let outcome = hub
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();
        let host = EntityHost::start(Arc::clone(&hub), Arc::new(LoggingSink), Vec::new());
        let key = StoreKey::new("dev1", "x");

        hub.register_sensor(SensorDescriptor::new("dev1", "x", "X", SensorKind::Numeric))
            .unwrap();
        hub.register_sensor(SensorDescriptor::new("dev1", "x", "X", SensorKind::Binary))
            .unwrap();

        let live: Vec<_> = host
            .platforms_for("dev1")
            .iter()
            .filter_map(|platform| platform.entity(&key))
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind(), SensorKind::Binary);
        assert_eq!(hub.bus().listener_count(&Channel::sensor_updated(&key)), 1);

        hub.push_update(
            &outcome.secret_handle,
            key.clone(),
            SensorUpdate {
                state: Some(json!("on")),
                ..SensorUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(live[0].is_on(), Some(true));
        assert_eq!(live[0].revision(), 1);
        assert!(
            host.remembered()
                .iter()
                .all(|p| p.store_key != key || p.kind == SensorKind::Binary)
        );

        // Switching back re-creates it on the numeric side
        hub.register_sensor(SensorDescriptor::new("dev1", "x", "X", SensorKind::Numeric))
            .unwrap();
        let kinds: Vec<_> = host
            .platforms_for("dev1")
            .iter()
            .filter_map(|platform| platform.entity(&key))
            .map(|entity| entity.kind())
            .collect();
        assert_eq!(kinds, vec![SensorKind::Numeric]);
        assert_eq!(hub.bus().listener_count(&Channel::sensor_updated(&key)), 1);
    }
}
