//! # Calibrator
//!
//! One pass over the attached devices: enumerate, classify, count recognized
//! turntables, then write the calibration files once enumeration is complete.
//!
//! Errors are not isolated per device. A malformed hardware ID or a failed
//! property lookup aborts the whole run, as does a failed file write.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::Config;
use crate::device::{Classification, Classifier, DeviceRegistry};
use crate::error::Result;
use crate::regfile::{plan_artifacts, write_artifacts, Profile};
use crate::source::{DeviceEnumerator, PropertySource, HID_INTERFACE_CLASS};

/// Result of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of device interfaces enumerated
    pub devices_seen: u32,
    /// Recognized turntables
    pub registry: DeviceRegistry,
    /// Files written, in write order
    pub written: Vec<PathBuf>,
}

/// Enumerates every device and counts the recognized turntables.
///
/// Hardware IDs are only fetched for devices whose path passes the family
/// filter.
///
/// # Errors
///
/// Propagates enumeration, property lookup and identifier parsing errors.
pub fn scan(
    enumerator: &dyn DeviceEnumerator,
    properties: &dyn PropertySource,
    classifier: &Classifier,
) -> Result<(DeviceRegistry, u32)> {
    debug!("Enumerating device interfaces of class {}", HID_INTERFACE_CLASS);

    let mut registry = DeviceRegistry::new();
    let mut index: u32 = 0;

    while let Some(device) = enumerator.device_at(index)? {
        index += 1;

        if !classifier.is_family_device(&device.path) {
            debug!("Skipping non-controller device: {}", device.path);
            continue;
        }

        let hardware_ids = properties.hardware_ids(&device.instance_id)?;
        if let Classification::RecognizedTurntable(key) = classifier.classify(&device.path, &hardware_ids)? {
            let instance = registry.record(key);
            debug!("Registered {} instance {}", key, instance);
        }
    }

    debug!("Enumerated {} device interfaces", index);
    Ok((registry, index))
}

/// Runs detection and writes the calibration files described by `config`.
///
/// When no turntable is found nothing is written.
///
/// # Errors
///
/// Returns the first fatal error: enumeration, property lookup, malformed
/// hardware ID, or artifact write failure.
pub fn run(
    config: &Config,
    enumerator: &dyn DeviceEnumerator,
    properties: &dyn PropertySource,
) -> Result<RunSummary> {
    let classifier = Classifier::new(config.detection.family_marker.clone());
    let (registry, devices_seen) = scan(enumerator, properties, &classifier)?;

    if registry.is_empty() {
        info!("No Xbox 360 turntables found!");
        return Ok(RunSummary {
            devices_seen,
            registry,
            written: Vec::new(),
        });
    }

    info!(
        "Found {} turntable(s) across {} vendor/product pair(s)",
        registry.total_instances(),
        registry.len()
    );
    info!("Writing calibration files...");

    let artifacts = plan_artifacts(&registry, config.output.mode, &config.output.file_prefix);
    let written = write_artifacts(&config.output.directory, &artifacts)?;

    info!("Wrote calibration files.");
    for (artifact, path) in artifacts.iter().zip(&written) {
        match artifact.profile {
            Profile::Apply => info!("Double-click {} to apply the custom calibration values.", path.display()),
            Profile::Reset => info!("Double-click {} to reset the calibration to defaults.", path.display()),
        }
    }

    Ok(RunSummary {
        devices_seen,
        registry,
        written,
    })
}
