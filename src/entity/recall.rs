//! Entity states remembered across restarts.
//!
//! Stands in for the host's restore-state store: the binary writes the live
//! entity states on shutdown and feeds them to the restore phase on start.

use super::PriorEntity;
use crate::error::{BridgeError, Result};
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// Read remembered states. A missing or unreadable file yields nothing.
pub fn load_prior(path: &Path) -> Vec<PriorEntity> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("[Entity] Failed to read {:?}: {}", path, e);
            }
            return Vec::new();
        }
    };

    match serde_json::from_slice::<Vec<PriorEntity>>(&bytes) {
        Ok(prior) => {
            debug!("[Entity] Loaded {} remembered state(s)", prior.len());
            prior
        }
        Err(e) => {
            warn!("[Entity] Ignoring unreadable {:?}: {}", path, e);
            Vec::new()
        }
    }
}

pub fn save_prior(path: &Path, prior: &[PriorEntity]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(prior)?;
    fs::write(path, data)
        .map_err(|e| BridgeError::Persistence(format!("failed to write {:?}: {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{SensorKind, StoreKey};

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entity_states.json");
        let prior = vec![PriorEntity {
            store_key: StoreKey::new("dev1", "door"),
            kind: SensorKind::Binary,
            last_state: Some("on".to_string()),
        }];

        save_prior(&path, &prior).unwrap();
        assert_eq!(load_prior(&path), prior);
    }

    #[test]
    fn test_missing_or_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entity_states.json");
        assert!(load_prior(&path).is_empty());

        fs::write(&path, "not json").unwrap();
        assert!(load_prior(&path).is_empty());
    }
}
