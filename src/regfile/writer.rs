//! # Artifact Writer
//!
//! Names the calibration files and writes them to disk.
//!
//! Files are written strictly one after another: each is created, written,
//! flushed and closed before the next one is opened. The first failure aborts
//! the remaining writes.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::device::identity::ProductKey;
use crate::device::registry::DeviceRegistry;
use crate::error::{CalibratorError, Result};

use super::calibration::{render, Profile};

/// File extension recognized by regedit
pub const REG_EXTENSION: &str = "reg";

/// How recognized devices are spread over output files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One apply file and one reset file covering every device
    #[default]
    Aggregated,
    /// An apply/reset pair for each vendor/product pair
    PerDevice,
}

/// A rendered calibration file waiting to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub profile: Profile,
    pub file_name: String,
    pub contents: String,
}

/// File name of an aggregated artifact.
#[must_use]
pub fn aggregated_file_name(prefix: &str, profile: Profile) -> String {
    match profile {
        Profile::Apply => format!("{}_calibration_apply.{}", prefix, REG_EXTENSION),
        Profile::Reset => format!("{}_calibration_reset.{}", prefix, REG_EXTENSION),
    }
}

/// File name of a per-device artifact.
#[must_use]
pub fn per_device_file_name(prefix: &str, profile: Profile, key: &ProductKey) -> String {
    match profile {
        Profile::Apply => format!("{}_calibration_{}.{}", prefix, key, REG_EXTENSION),
        Profile::Reset => format!("{}_calibration_reset_{}.{}", prefix, key, REG_EXTENSION),
    }
}

/// Renders the artifacts for `registry` without touching the filesystem.
///
/// Apply files always precede their reset counterpart. An empty registry
/// yields no artifacts.
#[must_use]
pub fn plan_artifacts(registry: &DeviceRegistry, mode: OutputMode, prefix: &str) -> Vec<Artifact> {
    if registry.is_empty() {
        return Vec::new();
    }

    let profiles = [Profile::Apply, Profile::Reset];
    match mode {
        OutputMode::Aggregated => profiles
            .into_iter()
            .map(|profile| Artifact {
                profile,
                file_name: aggregated_file_name(prefix, profile),
                contents: render(profile, registry.iter()),
            })
            .collect(),
        OutputMode::PerDevice => registry
            .iter()
            .flat_map(move |(key, count)| {
                profiles.into_iter().map(move |profile| Artifact {
                    profile,
                    file_name: per_device_file_name(prefix, profile, &key),
                    contents: render(profile, [(key, count)]),
                })
            })
            .collect(),
    }
}

/// Writes `artifacts` into `directory` in order, returning the written paths.
///
/// # Errors
///
/// Returns `ArtifactWrite` on the first file that cannot be created, written
/// or flushed. Files after it are not attempted; earlier files stay on disk.
pub fn write_artifacts(directory: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    if !artifacts.is_empty() && !directory.as_os_str().is_empty() {
        fs::create_dir_all(directory).map_err(|source| CalibratorError::ArtifactWrite {
            path: directory.to_path_buf(),
            source,
        })?;
    }

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = directory.join(&artifact.file_name);
        write_file(&path, &artifact.contents)?;
        info!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    let to_error = |source: std::io::Error| CalibratorError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(to_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(contents.as_bytes()).map_err(to_error)?;
    writer.flush().map_err(to_error)?;

    debug!("Flushed {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regfile::format::parse_identities;
    use tempfile::TempDir;

    fn registry_with(keys: &[ProductKey]) -> DeviceRegistry {
        let mut registry = DeviceRegistry::new();
        for key in keys {
            registry.record(*key);
        }
        registry
    }

    #[test]
    fn test_aggregated_file_names() {
        assert_eq!(aggregated_file_name("360table", Profile::Apply), "360table_calibration_apply.reg");
        assert_eq!(aggregated_file_name("360table", Profile::Reset), "360table_calibration_reset.reg");
    }

    #[test]
    fn test_per_device_file_names() {
        let key = ProductKey::new(0x1430, 0x1715);
        assert_eq!(
            per_device_file_name("360table", Profile::Apply, &key),
            "360table_calibration_VID_1430&PID_1715.reg"
        );
        assert_eq!(
            per_device_file_name("360table", Profile::Reset, &key),
            "360table_calibration_reset_VID_1430&PID_1715.reg"
        );
    }

    #[test]
    fn test_empty_registry_plans_nothing() {
        let registry = DeviceRegistry::new();
        assert!(plan_artifacts(&registry, OutputMode::Aggregated, "x").is_empty());
        assert!(plan_artifacts(&registry, OutputMode::PerDevice, "x").is_empty());
    }

    #[test]
    fn test_aggregated_plan() {
        let a = ProductKey::new(0x1430, 0x1715);
        let b = ProductKey::new(0x1234, 0x5678);
        let registry = registry_with(&[a, b, a]);

        let artifacts = plan_artifacts(&registry, OutputMode::Aggregated, "360table");
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].profile, Profile::Apply);
        assert_eq!(artifacts[1].profile, Profile::Reset);

        for artifact in &artifacts {
            assert_eq!(parse_identities(&artifact.contents).unwrap(), vec![a, b]);
            assert_eq!(artifact.contents.matches("\\Type\\Axes]").count(), 3);
        }
    }

    #[test]
    fn test_per_device_plan() {
        let a = ProductKey::new(0x1430, 0x1715);
        let b = ProductKey::new(0x1234, 0x5678);
        let registry = registry_with(&[a, b, a]);

        let artifacts = plan_artifacts(&registry, OutputMode::PerDevice, "p");
        let names: Vec<_> = artifacts.iter().map(|a| a.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "p_calibration_VID_1430&PID_1715.reg",
                "p_calibration_reset_VID_1430&PID_1715.reg",
                "p_calibration_VID_1234&PID_5678.reg",
                "p_calibration_reset_VID_1234&PID_5678.reg",
            ]
        );

        assert_eq!(parse_identities(&artifacts[0].contents).unwrap(), vec![a]);
        assert_eq!(artifacts[0].contents.matches("\\Type\\Axes]").count(), 2);
        assert_eq!(parse_identities(&artifacts[2].contents).unwrap(), vec![b]);
        assert_eq!(artifacts[2].contents.matches("\\Type\\Axes]").count(), 1);
    }

    #[test]
    fn test_output_mode_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: OutputMode,
        }

        let w: Wrapper = toml::from_str("mode = \"per_device\"").unwrap();
        assert_eq!(w.mode, OutputMode::PerDevice);
        let w: Wrapper = toml::from_str("mode = \"aggregated\"").unwrap();
        assert_eq!(w.mode, OutputMode::Aggregated);
        assert!(toml::from_str::<Wrapper>("mode = \"both\"").is_err());
        assert_eq!(OutputMode::default(), OutputMode::Aggregated);
    }

    #[test]
    fn test_write_artifacts_to_disk() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(&[ProductKey::new(0x1430, 0x1715)]);
        let artifacts = plan_artifacts(&registry, OutputMode::Aggregated, "360table");

        let written = write_artifacts(dir.path(), &artifacts).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], dir.path().join("360table_calibration_apply.reg"));
        assert_eq!(written[1], dir.path().join("360table_calibration_reset.reg"));

        for (path, artifact) in written.iter().zip(&artifacts) {
            let on_disk = std::fs::read(path).unwrap();
            assert_eq!(on_disk, artifact.contents.as_bytes());
        }
    }

    #[test]
    fn test_write_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("out").join("reg");
        let registry = registry_with(&[ProductKey::new(1, 2)]);
        let artifacts = plan_artifacts(&registry, OutputMode::Aggregated, "t");

        let written = write_artifacts(&nested, &artifacts).unwrap();
        assert!(written.iter().all(|p| p.exists()));
    }

    #[test]
    fn test_write_nothing_leaves_directory_untouched() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("never");

        let written = write_artifacts(&nested, &[]).unwrap();
        assert!(written.is_empty());
        assert!(!nested.exists());
    }

    #[test]
    fn test_write_failure_stops_before_next_file() {
        let dir = TempDir::new().unwrap();
        let registry = registry_with(&[ProductKey::new(1, 2)]);
        let artifacts = plan_artifacts(&registry, OutputMode::Aggregated, "t");

        // A directory squatting on the apply file name makes File::create fail
        std::fs::create_dir(dir.path().join(&artifacts[0].file_name)).unwrap();

        let err = write_artifacts(dir.path(), &artifacts).unwrap_err();
        match err {
            CalibratorError::ArtifactWrite { path, .. } => {
                assert_eq!(path, dir.path().join(&artifacts[0].file_name));
            }
            other => panic!("Expected ArtifactWrite error, got: {:?}", other),
        }
        assert!(!dir.path().join(&artifacts[1].file_name).exists());
    }
}
