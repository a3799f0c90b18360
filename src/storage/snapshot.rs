//! Versioned snapshot of everything that survives a restart.

use crate::registration::Registration;
use crate::sensors::{SensorDescriptor, StoreKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot format version written by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// entry_id -> registration
    #[serde(default)]
    pub registrations: BTreeMap<String, Registration>,
    #[serde(default)]
    pub sensors: BTreeMap<StoreKey, SensorDescriptor>,
    /// Tombstoned device ids
    #[serde(default)]
    pub deleted_ids: Vec<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            registrations: BTreeMap::new(),
            sensors: BTreeMap::new(),
            deleted_ids: Vec::new(),
        }
    }
}
