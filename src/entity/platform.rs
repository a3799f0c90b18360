//! Per device and kind entity platform.

use super::SensorEntity;
use crate::bus::{BusEvent, Channel, SubscriptionId};
use crate::hub::Hub;
use crate::registration::Registration;
use crate::sensors::{SensorDescriptor, SensorKind, StoreKey};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};

/// Receives newly created entities. Stands in for the host's entity registry.
pub trait EntitySink: Send + Sync {
    fn add_entities(&self, entities: Vec<Arc<SensorEntity>>);
}

/// An entity the host remembers from a previous run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorEntity {
    pub store_key: StoreKey,
    pub kind: SensorKind,
    pub last_state: Option<String>,
}

pub struct EntityPlatform {
    hub: Arc<Hub>,
    registration: Registration,
    kind: SensorKind,
    sink: Arc<dyn EntitySink>,
    /// Store keys that already have an entity. Check-and-insert is one locked step.
    known: Mutex<HashSet<StoreKey>>,
    entities: Mutex<BTreeMap<StoreKey, Arc<SensorEntity>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl EntityPlatform {
    /// Bring up the platform for `(registration.device_id, kind)`.
    ///
    /// 1. Restore entities the host remembers and the registry still knows.
    /// 2. Subscribe to creation events for this device and kind.
    /// 3. Reconcile against the registry for sensors created before step 2.
    pub fn attach(
        hub: Arc<Hub>,
        registration: Registration,
        kind: SensorKind,
        prior: &[PriorEntity],
        sink: Arc<dyn EntitySink>,
    ) -> Arc<Self> {
        let platform = Arc::new(Self {
            hub,
            registration,
            kind,
            sink,
            known: Mutex::new(HashSet::new()),
            entities: Mutex::new(BTreeMap::new()),
            subscription: Mutex::new(None),
        });

        platform.restore(prior);
        platform.subscribe();
        platform.reconcile();

        info!(
            "[Entity] {} platform ready for device {} with {} entit(ies)",
            kind,
            platform.registration.device_id,
            platform.len()
        );
        platform
    }

    fn restore(&self, prior: &[PriorEntity]) {
        let restored: Vec<_> = prior
            .iter()
            .filter(|p| p.kind == self.kind)
            .filter_map(|p| {
                let descriptor = self.hub.sensor(&p.store_key)?;
                if descriptor.device_id != self.registration.device_id
                    || descriptor.kind != self.kind
                {
                    return None;
                }
                debug!("[Entity] Restoring {} entity {}", self.kind, p.store_key);
                self.ensure_entity(descriptor, p.last_state.as_deref())
            })
            .collect();
        self.publish(restored);
    }

    fn subscribe(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let kind = self.kind;
        let id = self.hub.bus().subscribe(
            Channel::sensor_created(&self.registration.device_id, kind),
            Arc::new(move |event: &BusEvent| {
                let Some(platform) = weak.upgrade() else {
                    return;
                };
                match event {
                    BusEvent::SensorCreated(descriptor) if descriptor.kind == kind => {
                        if let Some(entity) = platform.ensure_entity(descriptor.clone(), None) {
                            info!("[Entity] Adding new {}: {}", kind, entity.store_key());
                            platform.publish(vec![entity]);
                        }
                    }
                    BusEvent::SensorRetired(store_key) => platform.retire(store_key),
                    _ => {}
                }
            }),
        );
        *self.subscription.lock() = Some(id);
    }

    fn reconcile(&self) {
        let missed: Vec<_> = self
            .hub
            .sensors_for(&self.registration.device_id, self.kind)
            .into_iter()
            .filter_map(|descriptor| self.ensure_entity(descriptor, None))
            .collect();
        if !missed.is_empty() {
            debug!(
                "[Entity] Reconciled {} {} entit(ies) for {}",
                missed.len(),
                self.kind,
                self.registration.device_id
            );
        }
        self.publish(missed);
    }

    /// Create the entity for `descriptor` unless its store key is already known.
    fn ensure_entity(
        &self,
        descriptor: SensorDescriptor,
        prior_state: Option<&str>,
    ) -> Option<Arc<SensorEntity>> {
        if !self.known.lock().insert(descriptor.store_key.clone()) {
            return None;
        }

        let entity = Arc::new(SensorEntity::new(descriptor, &self.registration));
        if let Some(prior_state) = prior_state {
            entity.restore(prior_state);
        }
        entity.attach(&self.hub);
        self.entities
            .lock()
            .insert(entity.store_key().clone(), Arc::clone(&entity));
        Some(entity)
    }

    /// Drop and detach the entity for `store_key`. Its key may be created again later.
    fn retire(&self, store_key: &StoreKey) {
        let retired = {
            let mut known = self.known.lock();
            known.remove(store_key);
            self.entities.lock().remove(store_key)
        };
        if let Some(entity) = retired {
            entity.detach(&self.hub);
            info!("[Entity] Retired {} entity {}", self.kind, store_key);
        }
    }

    fn publish(&self, entities: Vec<Arc<SensorEntity>>) {
        if !entities.is_empty() {
            self.sink.add_entities(entities);
        }
    }

    pub fn device_id(&self) -> &str {
        &self.registration.device_id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn entity(&self, store_key: &StoreKey) -> Option<Arc<SensorEntity>> {
        self.entities.lock().get(store_key).cloned()
    }

    /// Live entities ordered by store key.
    pub fn entities(&self) -> Vec<Arc<SensorEntity>> {
        self.entities.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop listening and detach every entity.
    pub fn detach(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.hub.bus().unsubscribe(id);
        }
        for entity in self.entities() {
            entity.detach(&self.hub);
        }
        debug!(
            "[Entity] {} platform detached for device {}",
            self.kind, self.registration.device_id
        );
    }
}
