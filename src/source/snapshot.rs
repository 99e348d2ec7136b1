//! # Device Snapshot
//!
//! Device list loaded from a TOML file instead of the live system. Useful for
//! generating calibration files for another machine from a support report, and
//! for exercising the whole pipeline off Windows.
//!
//! ```toml
//! [[device]]
//! path = '\\?\HID#VID_1430&PID_1715&IG_00#7&1a2b3c4d&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}'
//! instance_id = 'HID\VID_1430&PID_1715&IG_00\7&1A2B3C4D&0&0000'
//! hardware_ids = ['HID\VID_1430&PID_1715&REV_0100&IG_00', 'HID\VID_1430&PID_1715&IG_00']
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use super::{DeviceEnumerator, DeviceInterface, PropertySource};
use crate::error::{CalibratorError, Result};

/// A device as recorded in a snapshot file
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SnapshotDevice {
    pub path: String,
    pub instance_id: String,
    #[serde(default)]
    pub hardware_ids: Vec<String>,
}

/// Devices loaded from a snapshot file, in file order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSnapshot {
    #[serde(default, rename = "device")]
    devices: Vec<SnapshotDevice>,
}

impl DeviceSnapshot {
    /// Loads a snapshot from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Enumeration` if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            CalibratorError::Enumeration(format!("failed to read snapshot {}: {}", path.display(), e))
        })?;
        let snapshot = Self::from_toml(&contents)?;
        debug!("Loaded {} devices from snapshot {}", snapshot.devices.len(), path.display());
        Ok(snapshot)
    }

    /// Parses a snapshot from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| CalibratorError::Enumeration(format!("invalid snapshot: {}", e)))
    }

    /// Builds a snapshot from already known devices.
    #[must_use]
    pub fn from_devices(devices: Vec<SnapshotDevice>) -> Self {
        Self { devices }
    }

    #[must_use]
    pub fn devices(&self) -> &[SnapshotDevice] {
        &self.devices
    }
}

impl DeviceEnumerator for DeviceSnapshot {
    fn device_at(&self, index: u32) -> Result<Option<DeviceInterface>> {
        Ok(self.devices.get(index as usize).map(|device| DeviceInterface {
            path: device.path.clone(),
            instance_id: device.instance_id.clone(),
        }))
    }
}

impl PropertySource for DeviceSnapshot {
    fn hardware_ids(&self, instance_id: &str) -> Result<Vec<String>> {
        self.devices
            .iter()
            .find(|device| device.instance_id == instance_id)
            .map(|device| device.hardware_ids.clone())
            .ok_or_else(|| CalibratorError::PropertyLookup {
                instance_id: instance_id.to_string(),
                reason: "instance not present in snapshot".to_string(),
            })
    }
}
