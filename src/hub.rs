//! The hub: one service object owning all bridge state.
//!
//! Each top-level store sits behind its own lock. Every handler holds a store's
//! lock for its whole read-modify-write, and no lock is held while bus
//! listeners run. Durable mutations are written through to the snapshot store
//! immediately; a failed write is reported but the in-memory change stays.

use crate::bus::{BusEvent, Channel, DispatchBus};
use crate::error::{BridgeError, Result};
use crate::registration::{
    RegisterOutcome, Registration, RegistrationDirectory, RegistrationRequest, RegistrationUpdate,
    SecretHandle,
};
use crate::sensors::{
    PendingUpdateBuffer, SensorDescriptor, SensorKind, SensorRegistry, SensorUpdate, StoreKey,
};
use crate::storage::{MemoryStore, SNAPSHOT_VERSION, Snapshot, SnapshotStore};
use log::{debug, error, info};
use parking_lot::Mutex;

pub struct Hub {
    store: Box<dyn SnapshotStore>,
    directory: Mutex<RegistrationDirectory>,
    sensors: Mutex<SensorRegistry>,
    pending: Mutex<PendingUpdateBuffer>,
    bus: DispatchBus,
    /// Serializes snapshot writes so the newest state is always written last.
    save_lock: Mutex<()>,
}

impl Hub {
    /// Load state from `store` and build the hub around it.
    pub fn load(store: impl SnapshotStore + 'static) -> Result<Self> {
        let snapshot = store.load()?;
        let directory =
            RegistrationDirectory::from_parts(snapshot.registrations, snapshot.deleted_ids);
        let sensors = SensorRegistry::from_descriptors(snapshot.sensors.into_values());

        info!(
            "[Hub] Ready with {} registration(s) and {} sensor(s)",
            directory.len(),
            sensors.len()
        );

        Ok(Self {
            store: Box::new(store),
            directory: Mutex::new(directory),
            sensors: Mutex::new(sensors),
            pending: Mutex::new(PendingUpdateBuffer::default()),
            bus: DispatchBus::new(),
            save_lock: Mutex::new(()),
        })
    }

    /// Empty hub backed by a [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
            directory: Mutex::new(RegistrationDirectory::default()),
            sensors: Mutex::new(SensorRegistry::default()),
            pending: Mutex::new(PendingUpdateBuffer::default()),
            bus: DispatchBus::new(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn bus(&self) -> &DispatchBus {
        &self.bus
    }

    // --- Registrations ---

    /// Register a device. Idempotent per `device_id`.
    pub fn register(&self, request: RegistrationRequest) -> Result<RegisterOutcome> {
        let (outcome, registration) = {
            let mut directory = self.directory.lock();
            let outcome = directory.register(request)?;
            let registration = directory
                .get_by_handle(outcome.secret_handle.as_str())
                .cloned();
            (outcome, registration)
        };

        let Some(registration) = registration.filter(|_| outcome.created) else {
            info!("[Registration] Device already registered, returning existing webhook_id");
            return Ok(outcome);
        };

        info!(
            "[Registration] Registered new device {} ({})",
            registration.device_id, registration.device_name
        );
        let saved = self.persist();
        self.bus.publish(
            &Channel::DeviceLifecycle,
            BusEvent::DeviceRegistered(registration),
        );
        saved.map(|_| outcome)
    }

    /// Registration owning `secret_handle`.
    pub fn resolve(&self, secret_handle: &str) -> Option<Registration> {
        self.directory.lock().get_by_handle(secret_handle).cloned()
    }

    pub fn registration(&self, device_id: &str) -> Option<Registration> {
        self.directory.lock().get_by_device(device_id).cloned()
    }

    /// All registrations, ordered by device id.
    pub fn registrations(&self) -> Vec<Registration> {
        let mut all: Vec<_> = self.directory.lock().entries().values().cloned().collect();
        all.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        all
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.directory.lock().deleted_ids().to_vec()
    }

    /// Change the allow-listed fields of a registration.
    pub fn update_registration(&self, device_id: &str, update: &RegistrationUpdate) -> Result<()> {
        self.directory.lock().update(device_id, update)?;
        info!("[Registration] Updated registration for device {}", device_id);
        self.persist()
    }

    /// Remove a device: revoke its handle, tombstone its id, drop its pending updates.
    ///
    /// Returns `true` if a registration was removed. Repeat calls are no-ops.
    pub fn remove_device(&self, device_id: &str) -> Result<bool> {
        let removed = {
            // Discarded under the directory lock, so no later push can refill it
            let mut directory = self.directory.lock();
            directory.remove(device_id).map(|registration| {
                let dropped = self.pending.lock().discard(&registration.secret_handle);
                (registration, dropped)
            })
        };

        if let Some((_, dropped)) = &removed {
            info!(
                "[Registration] Removed device {} ({} pending update(s) dropped)",
                device_id, dropped
            );
        } else {
            debug!("[Registration] Device {} was not registered", device_id);
        }

        let saved = self.persist();
        if removed.is_some() {
            self.bus.publish(
                &Channel::DeviceLifecycle,
                BusEvent::DeviceRemoved {
                    device_id: device_id.to_string(),
                },
            );
        }
        saved.map(|_| removed.is_some())
    }

    // --- Sensors ---

    /// Insert or replace a sensor descriptor and announce it on its creation channel.
    ///
    /// Re-registering a key under another kind first retires it on the old
    /// kind's channel, so only one platform ever holds an entity for it.
    pub fn register_sensor(&self, descriptor: SensorDescriptor) -> Result<()> {
        let previous = {
            let directory = self.directory.lock();
            if directory.get_by_device(&descriptor.device_id).is_none() {
                return Err(BridgeError::NotFound);
            }
            self.sensors.lock().upsert(descriptor.clone())
        };

        info!(
            "[Sensor] {} sensor '{}' ({}) for device {}",
            if previous.is_none() { "Registered" } else { "Re-registered" },
            descriptor.display_name,
            descriptor.kind,
            descriptor.device_id
        );

        let saved = self.persist();
        if let Some(previous) = previous.filter(|p| p.kind != descriptor.kind) {
            info!(
                "[Sensor] {} changed kind from {} to {}",
                descriptor.store_key, previous.kind, descriptor.kind
            );
            self.bus.publish(
                &Channel::sensor_created(&previous.device_id, previous.kind),
                BusEvent::SensorRetired(previous.store_key),
            );
        }
        self.bus.publish(
            &Channel::sensor_created(&descriptor.device_id, descriptor.kind),
            BusEvent::SensorCreated(descriptor),
        );
        saved
    }

    pub fn sensor(&self, store_key: &StoreKey) -> Option<SensorDescriptor> {
        self.sensors.lock().get(store_key).cloned()
    }

    /// Live registry view for one device and kind.
    pub fn sensors_for(&self, device_id: &str, kind: SensorKind) -> Vec<SensorDescriptor> {
        self.sensors.lock().for_device(device_id, kind)
    }

    /// Buffer a state push and publish it to the sensor's update channel.
    ///
    /// Fails with [`BridgeError::NotFound`] once the handle has been revoked.
    pub fn push_update(
        &self,
        secret_handle: &SecretHandle,
        store_key: StoreKey,
        update: SensorUpdate,
    ) -> Result<()> {
        {
            // Lock order: directory before pending
            let directory = self.directory.lock();
            if directory.get_by_handle(secret_handle.as_str()).is_none() {
                return Err(BridgeError::NotFound);
            }
            self.pending
                .lock()
                .put(secret_handle, store_key.clone(), update.clone());
        }
        self.bus.publish(
            &Channel::sensor_updated(&store_key),
            BusEvent::SensorUpdated { store_key, update },
        );
        Ok(())
    }

    /// Atomically remove and return the buffered update for a sensor.
    pub fn take_pending(&self, secret_handle: &SecretHandle, store_key: &StoreKey) -> Option<SensorUpdate> {
        self.pending.lock().take(secret_handle, store_key)
    }

    pub fn pending_count(&self, secret_handle: &SecretHandle) -> usize {
        self.pending.lock().len_for(secret_handle)
    }

    // --- Persistence ---

    /// Current durable state.
    pub fn snapshot(&self) -> Snapshot {
        // Lock order: directory before sensors
        let directory = self.directory.lock();
        let sensors = self.sensors.lock();
        Snapshot {
            version: SNAPSHOT_VERSION,
            registrations: directory
                .entries()
                .iter()
                .map(|(id, r)| (id.clone(), r.clone()))
                .collect(),
            sensors: sensors
                .descriptors()
                .map(|d| (d.store_key.clone(), d.clone()))
                .collect(),
            deleted_ids: directory.deleted_ids().to_vec(),
        }
    }

    fn persist(&self) -> Result<()> {
        let _guard = self.save_lock.lock();
        let snapshot = self.snapshot();
        self.store.save(&snapshot).inspect_err(|e| {
            error!("[Storage] Failed to save snapshot: {}", e);
        })
    }
}
