//! Registration directory: device identity to secret handle mapping.
//!
//! The directory is plain in-memory state. The [`Hub`](crate::hub::Hub) wraps
//! it in a lock and writes a snapshot after every mutating call.

use super::{Registration, RegistrationRequest, RegistrationUpdate, SecretHandle};
use crate::error::{BridgeError, Result};
use chrono::Utc;
use log::warn;
use std::collections::HashMap;

/// Result of [`RegistrationDirectory::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOutcome {
    pub secret_handle: SecretHandle,
    /// `false` when the device was already registered and its handle reused.
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct RegistrationDirectory {
    /// entry_id -> registration
    entries: HashMap<String, Registration>,
    /// device_id -> entry_id
    by_device: HashMap<String, String>,
    /// secret handle -> entry_id
    by_handle: HashMap<SecretHandle, String>,
    /// Removed device ids, in removal order, without duplicates.
    deleted_ids: Vec<String>,
}

impl RegistrationDirectory {
    /// Rebuild a directory from persisted entries and tombstones.
    ///
    /// If two persisted entries share a `device_id`, the first one by entry id
    /// wins and the other is dropped with a warning.
    pub fn from_parts(
        entries: impl IntoIterator<Item = (String, Registration)>,
        deleted_ids: Vec<String>,
    ) -> Self {
        let mut directory = Self::default();
        let mut sorted: Vec<_> = entries.into_iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        for (entry_id, mut registration) in sorted {
            if directory.by_device.contains_key(&registration.device_id) {
                warn!(
                    "[Registration] Dropping duplicate entry {} for device {}",
                    entry_id, registration.device_id
                );
                continue;
            }
            registration.entry_id = entry_id;
            directory.insert(registration);
        }

        for device_id in deleted_ids {
            if !directory.deleted_ids.contains(&device_id) {
                directory.deleted_ids.push(device_id);
            }
        }

        directory
    }

    /// Register a device, or return the existing handle if it is known.
    pub fn register(&mut self, request: RegistrationRequest) -> Result<RegisterOutcome> {
        let device_id = required(request.device_id, "device_id")?;
        let device_name = required(request.device_name, "device_name")?;

        if let Some(existing) = self.get_by_device(&device_id) {
            return Ok(RegisterOutcome {
                secret_handle: existing.secret_handle.clone(),
                created: false,
            });
        }

        let mut secret_handle = SecretHandle::generate();
        while self.by_handle.contains_key(&secret_handle) {
            secret_handle = SecretHandle::generate();
        }

        self.insert(Registration {
            entry_id: uuid::Uuid::new_v4().to_string(),
            device_id,
            device_name,
            manufacturer: request.manufacturer,
            model: request.model,
            os_name: request.os_name,
            os_version: request.os_version,
            app_version: request.app_version,
            secret_handle: secret_handle.clone(),
            registered_at: Utc::now(),
        });

        Ok(RegisterOutcome {
            secret_handle,
            created: true,
        })
    }

    /// Apply the allow-listed fields of `update` to a registration.
    pub fn update(&mut self, device_id: &str, update: &RegistrationUpdate) -> Result<()> {
        let entry_id = self.by_device.get(device_id).ok_or(BridgeError::NotFound)?;
        let registration = self
            .entries
            .get_mut(entry_id)
            .ok_or(BridgeError::NotFound)?;

        if let Some(os_version) = &update.os_version {
            registration.os_version = Some(os_version.clone());
        }
        if let Some(app_version) = &update.app_version {
            registration.app_version = Some(app_version.clone());
        }
        if let Some(device_name) = &update.device_name {
            registration.device_name = device_name.clone();
        }
        Ok(())
    }

    /// Remove a device and tombstone its id.
    ///
    /// Returns the removed registration, if there was one. Removing an unknown
    /// or already removed device only records the tombstone (once).
    pub fn remove(&mut self, device_id: &str) -> Option<Registration> {
        let removed = self
            .by_device
            .remove(device_id)
            .and_then(|entry_id| self.entries.remove(&entry_id));
        if let Some(registration) = &removed {
            self.by_handle.remove(&registration.secret_handle);
        }

        if !self.deleted_ids.iter().any(|id| id == device_id) {
            self.deleted_ids.push(device_id.to_string());
        }
        removed
    }

    pub fn get_by_handle(&self, secret_handle: &str) -> Option<&Registration> {
        self.by_handle
            .get(secret_handle)
            .and_then(|entry_id| self.entries.get(entry_id))
    }

    pub fn get_by_device(&self, device_id: &str) -> Option<&Registration> {
        self.by_device
            .get(device_id)
            .and_then(|entry_id| self.entries.get(entry_id))
    }

    pub fn is_tombstoned(&self, device_id: &str) -> bool {
        self.deleted_ids.iter().any(|id| id == device_id)
    }

    pub fn deleted_ids(&self) -> &[String] {
        &self.deleted_ids
    }

    /// All registrations keyed by entry id.
    pub fn entries(&self) -> &HashMap<String, Registration> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, registration: Registration) {
        self.by_device
            .insert(registration.device_id.clone(), registration.entry_id.clone());
        self.by_handle
            .insert(registration.secret_handle.clone(), registration.entry_id.clone());
        self.entries
            .insert(registration.entry_id.clone(), registration);
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BridgeError::missing_field(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_same_device_twice_reuses_handle() {
        let mut directory = RegistrationDirectory::default();

        let first = directory
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();
        let second = directory
            .register(RegistrationRequest::new("dev1", "Renamed PC"))
            .unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.secret_handle, second.secret_handle);
        assert_eq!(directory.len(), 1);
        // Repeat registration does not touch the stored name
        assert_eq!(directory.get_by_device("dev1").unwrap().device_name, "Office PC");
    }

    #[test]
    fn test_register_without_device_name_fails() {
        let mut directory = RegistrationDirectory::default();
        let request = RegistrationRequest {
            device_id: Some("dev1".to_string()),
            ..RegistrationRequest::default()
        };

        let err = directory.register(request).unwrap_err();
        assert!(
            matches!(err, BridgeError::Validation(ref msg) if msg == "Missing required field: device_name")
        );
        assert!(directory.is_empty());
    }

    #[test]
    fn test_register_without_device_id_fails() {
        let mut directory = RegistrationDirectory::default();
        let request = RegistrationRequest {
            device_name: Some("Office PC".to_string()),
            ..RegistrationRequest::default()
        };

        assert!(matches!(
            directory.register(request),
            Err(BridgeError::Validation(_))
        ));
        assert!(directory.is_empty());
    }

    #[test]
    fn test_distinct_devices_get_distinct_handles() {
        let mut directory = RegistrationDirectory::default();
        let a = directory
            .register(RegistrationRequest::new("dev1", "A"))
            .unwrap();
        let b = directory
            .register(RegistrationRequest::new("dev2", "B"))
            .unwrap();
        assert_ne!(a.secret_handle, b.secret_handle);
        assert_eq!(
            directory
                .get_by_handle(b.secret_handle.as_str())
                .unwrap()
                .device_id,
            "dev2"
        );
    }

    #[test]
    fn test_update_only_touches_allow_listed_fields() {
        let mut directory = RegistrationDirectory::default();
        let mut request = RegistrationRequest::new("dev1", "Office PC");
        request.manufacturer = Some("Framework".to_string());
        directory.register(request).unwrap();

        let update = RegistrationUpdate {
            os_version: Some("14.1".to_string()),
            app_version: None,
            device_name: Some("Desk".to_string()),
        };
        directory.update("dev1", &update).unwrap();

        let registration = directory.get_by_device("dev1").unwrap();
        assert_eq!(registration.os_version.as_deref(), Some("14.1"));
        assert_eq!(registration.device_name, "Desk");
        assert_eq!(registration.manufacturer.as_deref(), Some("Framework"));
        assert_eq!(registration.app_version, None);
    }

    #[test]
    fn test_update_unknown_device_is_not_found() {
        let mut directory = RegistrationDirectory::default();
        assert!(matches!(
            directory.update("ghost", &RegistrationUpdate::default()),
            Err(BridgeError::NotFound)
        ));
    }

    #[test]
    fn test_remove_twice_leaves_one_tombstone() {
        let mut directory = RegistrationDirectory::default();
        let outcome = directory
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();

        assert!(directory.remove("dev1").is_some());
        assert!(directory.remove("dev1").is_none());

        assert_eq!(directory.deleted_ids(), ["dev1".to_string()]);
        assert!(directory.is_tombstoned("dev1"));
        assert!(directory.get_by_handle(outcome.secret_handle.as_str()).is_none());
        assert!(directory.is_empty());
    }

    #[test]
    fn test_from_parts_rebuilds_indexes_and_dedups() {
        let mut source = RegistrationDirectory::default();
        let outcome = source
            .register(RegistrationRequest::new("dev1", "Office PC"))
            .unwrap();

        let mut duplicate = source.get_by_device("dev1").unwrap().clone();
        duplicate.secret_handle = SecretHandle::generate();
        let mut entries: Vec<_> = source
            .entries()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.push(("zzzz".to_string(), duplicate));

        let rebuilt = RegistrationDirectory::from_parts(
            entries,
            vec!["old".to_string(), "old".to_string()],
        );

        assert_eq!(rebuilt.len(), 1);
        assert_eq!(
            rebuilt
                .get_by_handle(outcome.secret_handle.as_str())
                .unwrap()
                .device_id,
            "dev1"
        );
        assert_eq!(rebuilt.deleted_ids(), ["old".to_string()]);
    }
}
