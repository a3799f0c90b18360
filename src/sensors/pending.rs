//! Pending update buffer.
//!
//! Holds the latest state push per sensor until an entity attaches and drains
//! it. Nothing here is persisted. One entry per store key, last write wins.

use super::StoreKey;
use crate::registration::SecretHandle;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One state push for one sensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorUpdate {
    pub state: Option<Value>,
    pub icon: Option<String>,
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Default)]
pub struct PendingUpdateBuffer {
    updates: HashMap<SecretHandle, HashMap<StoreKey, SensorUpdate>>,
}

impl PendingUpdateBuffer {
    /// Store an update, replacing any earlier one for the same key.
    pub fn put(&mut self, secret_handle: &SecretHandle, store_key: StoreKey, update: SensorUpdate) {
        self.updates
            .entry(secret_handle.clone())
            .or_default()
            .insert(store_key, update);
    }

    /// Remove and return the pending update for a key.
    pub fn take(&mut self, secret_handle: &SecretHandle, store_key: &StoreKey) -> Option<SensorUpdate> {
        let per_handle = self.updates.get_mut(secret_handle)?;
        let update = per_handle.remove(store_key);
        if per_handle.is_empty() {
            self.updates.remove(secret_handle);
        }
        update
    }

    /// Drop everything buffered for a handle. Returns how many entries were dropped.
    pub fn discard(&mut self, secret_handle: &SecretHandle) -> usize {
        self.updates
            .remove(secret_handle)
            .map(|per_handle| per_handle.len())
            .unwrap_or(0)
    }

    /// Number of buffered entries for a handle.
    pub fn len_for(&self, secret_handle: &SecretHandle) -> usize {
        self.updates.get(secret_handle).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(state: Value) -> SensorUpdate {
        SensorUpdate {
            state: Some(state),
            ..SensorUpdate::default()
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut buffer = PendingUpdateBuffer::default();
        let handle = SecretHandle::from("h1");
        let key = StoreKey::new("dev1", "cpu");

        buffer.put(&handle, key.clone(), update(json!(10)));
        buffer.put(&handle, key.clone(), update(json!(20)));

        assert_eq!(buffer.len_for(&handle), 1);
        assert_eq!(buffer.take(&handle, &key), Some(update(json!(20))));
    }

    #[test]
    fn test_take_consumes_exactly_once() {
        let mut buffer = PendingUpdateBuffer::default();
        let handle = SecretHandle::from("h1");
        let key = StoreKey::new("dev1", "door");

        buffer.put(&handle, key.clone(), update(json!(true)));
        assert!(buffer.take(&handle, &key).is_some());
        assert!(buffer.take(&handle, &key).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_discard_drops_only_that_handle() {
        let mut buffer = PendingUpdateBuffer::default();
        let h1 = SecretHandle::from("h1");
        let h2 = SecretHandle::from("h2");

        buffer.put(&h1, StoreKey::new("dev1", "a"), update(json!(1)));
        buffer.put(&h1, StoreKey::new("dev1", "b"), update(json!(2)));
        buffer.put(&h2, StoreKey::new("dev2", "a"), update(json!(3)));

        assert_eq!(buffer.discard(&h1), 2);
        assert_eq!(buffer.discard(&h1), 0);
        assert_eq!(buffer.len_for(&h2), 1);
    }
}
