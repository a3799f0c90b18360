use crate::bus::{BusEvent, Channel, SubscriptionId};
use crate::hub::Hub;
use crate::registration::{DeviceInfo, Registration, SecretHandle};
use crate::sensors::{SensorDescriptor, SensorKind, SensorState, SensorUpdate, StoreKey};
use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug)]
struct EntityState {
    state: SensorState,
    icon: Option<String>,
    attributes: Map<String, Value>,
}

/// One live sensor, bound to a single store key.
pub struct SensorEntity {
    descriptor: SensorDescriptor,
    device: DeviceInfo,
    secret_handle: SecretHandle,
    inner: RwLock<EntityState>,
    /// Bumped on every state write.
    revision: AtomicU32,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl SensorEntity {
    pub fn new(descriptor: SensorDescriptor, registration: &Registration) -> Self {
        let mut state = SensorState::for_kind(descriptor.kind);
        if let Some(initial) = &descriptor.last_state {
            state.apply(initial);
        }

        Self {
            inner: RwLock::new(EntityState {
                state,
                icon: descriptor.icon.clone(),
                attributes: descriptor.attributes.clone(),
            }),
            device: registration.device_info(),
            secret_handle: registration.secret_handle.clone(),
            descriptor,
            revision: AtomicU32::new(0),
            subscription: Mutex::new(None),
        }
    }

    pub fn store_key(&self) -> &StoreKey {
        &self.descriptor.store_key
    }

    pub fn kind(&self) -> SensorKind {
        self.descriptor.kind
    }

    pub fn name(&self) -> &str {
        &self.descriptor.display_name
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn state(&self) -> SensorState {
        self.inner.read().state.clone()
    }

    /// Binary sensors only.
    pub fn is_on(&self) -> Option<bool> {
        self.inner.read().state.is_on()
    }

    pub fn value(&self) -> Option<Value> {
        self.inner.read().state.value().cloned()
    }

    pub fn icon(&self) -> Option<String> {
        self.inner.read().icon.clone()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        self.inner.read().attributes.clone()
    }

    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Apply a state push.
    ///
    /// The icon only changes for a non-empty value; attributes are replaced
    /// wholesale when present.
    pub fn apply_update(&self, update: &SensorUpdate) {
        {
            let mut inner = self.inner.write();
            if let Some(state) = &update.state {
                inner.state.apply(state);
            }
            if let Some(icon) = update.icon.as_ref().filter(|i| !i.is_empty()) {
                inner.icon = Some(icon.clone());
            }
            if let Some(attributes) = &update.attributes {
                inner.attributes = attributes.clone();
            }
        }
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("[Entity] {} -> revision {}", self.store_key(), revision);
    }

    /// Restore a state the host remembered from an earlier run.
    pub fn restore(&self, prior: &str) {
        self.inner.write().state.restore(prior);
    }

    /// Start receiving live updates, then apply whatever was buffered before.
    ///
    /// Subscribing first means a push racing with the drain is seen at least
    /// once. Applying the same push twice is harmless.
    pub fn attach(self: &Arc<Self>, hub: &Hub) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let key = self.store_key().clone();
        let id = hub.bus().subscribe(
            Channel::sensor_updated(&key),
            Arc::new(move |event: &BusEvent| {
                if let BusEvent::SensorUpdated { update, .. } = event
                    && let Some(entity) = weak.upgrade()
                {
                    entity.apply_update(update);
                }
            }),
        );
        if let Some(previous) = self.subscription.lock().replace(id) {
            hub.bus().unsubscribe(previous);
        }

        if let Some(pending) = hub.take_pending(&self.secret_handle, &key) {
            debug!("[Entity] Applying buffered update for {}", key);
            self.apply_update(&pending);
        }
    }

    /// Stop receiving live updates.
    pub fn detach(&self, hub: &Hub) {
        if let Some(id) = self.subscription.lock().take() {
            hub.bus().unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for SensorEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorEntity")
            .field("store_key", self.store_key())
            .field("kind", &self.kind())
            .field("state", &self.inner.read().state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::RegistrationRequest;
    use serde_json::json;

    fn setup(kind: SensorKind) -> (Hub, Registration, SensorDescriptor) {
        let hub = Hub::in_memory();
        let outcome = hub
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();
        let registration = hub.resolve(outcome.secret_handle.as_str()).unwrap();
        let descriptor = SensorDescriptor::new("dev1", "door", "Door", kind);
        (hub, registration, descriptor)
    }

    #[test]
    fn test_apply_update_rules() {
        let (_, registration, mut descriptor) = setup(SensorKind::Numeric);
        descriptor.icon = Some("mdi:cpu".to_string());
        let entity = SensorEntity::new(descriptor, &registration);

        let mut attributes = Map::new();
        attributes.insert("cores".to_string(), json!(8));
        entity.apply_update(&SensorUpdate {
            state: Some(json!(42.5)),
            icon: Some(String::new()),
            attributes: Some(attributes.clone()),
        });

        assert_eq!(entity.value(), Some(json!(42.5)));
        assert_eq!(entity.icon().as_deref(), Some("mdi:cpu"));
        assert_eq!(entity.attributes(), attributes);
        assert_eq!(entity.revision(), 1);

        // No attributes: the map is kept
        entity.apply_update(&SensorUpdate {
            state: Some(Value::Null),
            icon: Some("mdi:chip".to_string()),
            attributes: None,
        });
        assert_eq!(entity.value(), None);
        assert_eq!(entity.icon().as_deref(), Some("mdi:chip"));
        assert_eq!(entity.attributes(), attributes);
    }

    #[test]
    fn test_initial_state_from_descriptor() {
        let (_, registration, mut descriptor) = setup(SensorKind::Binary);
        descriptor.last_state = Some(json!("on"));
        let entity = SensorEntity::new(descriptor, &registration);
        assert_eq!(entity.is_on(), Some(true));
        assert_eq!(entity.device().name, "Office PC");
    }

    #[test]
    fn test_attach_drains_pending_then_follows_live_updates() {
        let (hub, registration, descriptor) = setup(SensorKind::Binary);
        let key = descriptor.store_key.clone();
        hub.push_update(
            &registration.secret_handle,
            key.clone(),
            SensorUpdate {
                state: Some(json!(true)),
                ..SensorUpdate::default()
            },
        )
        .unwrap();

        let entity = Arc::new(SensorEntity::new(descriptor, &registration));
        entity.attach(&hub);
        assert_eq!(entity.is_on(), Some(true));
        assert_eq!(hub.pending_count(&registration.secret_handle), 0);

        hub.push_update(
            &registration.secret_handle,
            key.clone(),
            SensorUpdate {
                state: Some(json!("off")),
                ..SensorUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(entity.is_on(), Some(false));

        entity.detach(&hub);
        assert_eq!(hub.bus().listener_count(&Channel::sensor_updated(&key)), 0);
    }
}
