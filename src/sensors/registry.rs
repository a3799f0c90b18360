//! Durable catalogue of registered sensors, keyed by store key.

use super::{SensorDescriptor, SensorKind, StoreKey};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: HashMap<StoreKey, SensorDescriptor>,
}

impl SensorRegistry {
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SensorDescriptor>) -> Self {
        Self {
            sensors: descriptors
                .into_iter()
                .map(|d| (d.store_key.clone(), d))
                .collect(),
        }
    }

    /// Insert or replace a descriptor. Returns the descriptor it replaced.
    pub fn upsert(&mut self, descriptor: SensorDescriptor) -> Option<SensorDescriptor> {
        self.sensors.insert(descriptor.store_key.clone(), descriptor)
    }

    pub fn get(&self, store_key: &StoreKey) -> Option<&SensorDescriptor> {
        self.sensors.get(store_key)
    }

    /// Every descriptor of `kind` belonging to `device_id`, ordered by key.
    pub fn for_device(&self, device_id: &str, kind: SensorKind) -> Vec<SensorDescriptor> {
        let mut matching: Vec<_> = self
            .sensors
            .values()
            .filter(|d| d.device_id == device_id && d.kind == kind)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.store_key.cmp(&b.store_key));
        matching
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &SensorDescriptor> {
        self.sensors.values()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut registry = SensorRegistry::default();
        assert!(
            registry
                .upsert(SensorDescriptor::new("dev1", "door", "Door", SensorKind::Binary))
                .is_none()
        );
        let replaced = registry
            .upsert(SensorDescriptor::new("dev1", "door", "Front Door", SensorKind::Numeric))
            .unwrap();
        assert_eq!(replaced.display_name, "Door");
        assert_eq!(replaced.kind, SensorKind::Binary);

        assert_eq!(registry.len(), 1);
        let key = StoreKey::new("dev1", "door");
        assert_eq!(registry.get(&key).unwrap().display_name, "Front Door");
        assert!(registry.for_device("dev1", SensorKind::Binary).is_empty());
    }

    #[test]
    fn test_for_device_filters_by_device_and_kind() {
        let registry = SensorRegistry::from_descriptors([
            SensorDescriptor::new("dev1", "door", "Door", SensorKind::Binary),
            SensorDescriptor::new("dev1", "cpu", "CPU", SensorKind::Numeric),
            SensorDescriptor::new("dev1", "lid", "Lid", SensorKind::Binary),
            SensorDescriptor::new("dev2", "door", "Door", SensorKind::Binary),
        ]);

        let binary: Vec<_> = registry
            .for_device("dev1", SensorKind::Binary)
            .into_iter()
            .map(|d| d.sensor_unique_id)
            .collect();
        assert_eq!(binary, vec!["door", "lid"]);
        assert_eq!(registry.for_device("dev2", SensorKind::Numeric).len(), 0);
    }
}
