//! JSON file snapshot store.
//!
//! Writes go to a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use super::{SNAPSHOT_VERSION, Snapshot, SnapshotStore};
use crate::error::{BridgeError, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persistence_error(&self, action: &str, err: impl std::fmt::Display) -> BridgeError {
        BridgeError::Persistence(format!("{} {:?}: {}", action, self.path, err))
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Snapshot> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[Storage] No snapshot at {:?} (first run)", self.path);
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(self.persistence_error("failed to read", e)),
        };

        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| self.persistence_error("failed to parse", e))?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(self.persistence_error(
                "unsupported snapshot version in",
                format!("{} > {}", snapshot.version, SNAPSHOT_VERSION),
            ));
        }

        info!(
            "[Storage] Loaded {} registrations, {} sensors, {} tombstones from {:?}",
            snapshot.registrations.len(),
            snapshot.sensors.len(),
            snapshot.deleted_ids.len(),
            self.path
        );
        Ok(snapshot)
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error("failed to create", e))?;
        }

        let data = serde_json::to_vec_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, data).map_err(|e| self.persistence_error("failed to write", e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.persistence_error("failed to replace", e))?;

        debug!(
            "[Storage] Saved {} registrations, {} sensors to {:?}",
            snapshot.registrations.len(),
            snapshot.sensors.len(),
            self.path
        );
        Ok(())
    }
}
