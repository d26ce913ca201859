// src/registry.rs
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::RegistryError;
use crate::types::DeviceRecord;

/// The set of devices under control, persisted as a JSON array of records.
///
/// Every mutation saves immediately by writing a temp file and renaming it
/// over the target, so a crash mid-write never loses the previous file.
/// Ids are unique; adding an existing id overwrites its record.
pub struct DeviceRegistry {
    devices: BTreeMap<String, DeviceRecord>,
    path: PathBuf,
}

impl DeviceRegistry {
    /// Load the registry from disk. A missing file is a fresh install and
    /// yields an empty registry, not an error.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self {
            devices: BTreeMap::new(),
            path: path.to_path_buf(),
        };
        if !path.exists() {
            debug!("[REGISTRY] No device file at {:?}, starting empty", path);
            return Ok(registry);
        }

        let body = fs::read_to_string(path)?;
        let records: Vec<DeviceRecord> = serde_json::from_str(&body)?;
        for record in records {
            info!("[REGISTRY] Loading saved device: {} - {}", record.id, record.name);
            registry.devices.insert(record.id.clone(), record);
        }
        Ok(registry)
    }

    pub fn add(&mut self, id: &str, name: &str) -> Result<(), RegistryError> {
        info!("[REGISTRY] {} added", id);
        self.devices.insert(
            id.to_string(),
            DeviceRecord {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self.save()
    }

    /// Removing an id that is not registered is a no-op.
    pub fn remove(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.devices.remove(id).is_some() {
            info!("[REGISTRY] {} removed", id);
        } else {
            debug!("[REGISTRY] {} not registered, nothing to remove", id);
        }
        self.save()
    }

    /// Registered devices, ordered by id.
    pub fn list(&self) -> Vec<DeviceRecord> {
        self.devices.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    fn save(&self) -> Result<(), RegistryError> {
        let records = self.list();
        let body = serde_json::to_string_pretty(&records)?;

        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;
        debug!("[REGISTRY] Saved {} device(s) to {:?}", records.len(), self.path);
        Ok(())
    }
}
