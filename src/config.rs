//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! The program takes no arguments. Configuration is optional and looked up as:
//! 1. the file named by `TURNTABLE_CALIBRATOR_CONFIG`
//! 2. `turntable-calibrator.toml` in the working directory
//! 3. built-in defaults

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::device::classifier::XBOX360_FAMILY_MARKER;
use crate::error::{CalibratorError, Result};
use crate::regfile::writer::OutputMode;

/// Environment variable naming an explicit configuration file
pub const CONFIG_ENV_VAR: &str = "TURNTABLE_CALIBRATOR_CONFIG";

/// Configuration file picked up from the working directory
pub const DEFAULT_CONFIG_FILE: &str = "turntable-calibrator.toml";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Output file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    #[serde(default)]
    pub mode: OutputMode,
}

/// Device detection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    #[serde(default = "default_family_marker")]
    pub family_marker: String,
}

/// Device source configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// Snapshot file replacing live enumeration
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

/// Console behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default = "default_wait_for_enter")]
    pub wait_for_enter: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write the log to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_output_directory() -> PathBuf { PathBuf::from(".") }
fn default_file_prefix() -> String { "360table".to_string() }

fn default_family_marker() -> String { XBOX360_FAMILY_MARKER.to_string() }

fn default_wait_for_enter() -> bool { true }

fn default_log_level() -> String { "info".to_string() }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            file_prefix: default_file_prefix(),
            mode: OutputMode::default(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            family_marker: default_family_marker(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            wait_for_enter: default_wait_for_enter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use turntable_calibrator::config::Config;
    ///
    /// let config = Config::load("turntable-calibrator.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Picks the configuration file to use, if any.
    ///
    /// An explicit path from the environment always wins, even if the file is
    /// missing, so a typo surfaces as an error instead of silently using defaults.
    #[must_use]
    pub fn locate(env_path: Option<PathBuf>, fallback: &Path) -> Option<PathBuf> {
        match env_path {
            Some(path) if !path.as_os_str().is_empty() => Some(path),
            _ if fallback.is_file() => Some(fallback.to_path_buf()),
            _ => None,
        }
    }

    /// Loads the configuration from the standard locations.
    ///
    /// Returns the configuration and the file it came from (`None` for defaults).
    pub fn discover() -> Result<(Self, Option<PathBuf>)> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match Self::locate(env_path, Path::new(DEFAULT_CONFIG_FILE)) {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate output configuration
        if self.output.file_prefix.is_empty() {
            return Err(CalibratorError::Config(
                toml::de::Error::custom("file_prefix cannot be empty")
            ));
        }

        if self.output.file_prefix.contains(['/', '\\', ':']) {
            return Err(CalibratorError::Config(
                toml::de::Error::custom("file_prefix cannot contain path separators")
            ));
        }

        if self.output.directory.as_os_str().is_empty() {
            return Err(CalibratorError::Config(
                toml::de::Error::custom("output directory cannot be empty")
            ));
        }

        // Validate detection configuration
        if self.detection.family_marker.is_empty() {
            return Err(CalibratorError::Config(
                toml::de::Error::custom("family_marker cannot be empty")
            ));
        }

        // Validate source configuration
        if let Some(snapshot) = &self.source.snapshot {
            if snapshot.as_os_str().is_empty() {
                return Err(CalibratorError::Config(
                    toml::de::Error::custom("snapshot path cannot be empty when given")
                ));
            }
        }

        // Validate logging configuration
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(CalibratorError::Config(
                toml::de::Error::custom("log level must be one of: trace, debug, info, warn, error")
            ));
        }

        if let Some(file) = &self.logging.file {
            if file.file_name().is_none() {
                return Err(CalibratorError::Config(
                    toml::de::Error::custom("log file must name a file")
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.output.directory, PathBuf::from("."));
        assert_eq!(config.output.file_prefix, "360table");
        assert_eq!(config.output.mode, OutputMode::Aggregated);
        assert_eq!(config.detection.family_marker, "IG_");
        assert!(config.source.snapshot.is_none());
        assert!(config.console.wait_for_enter);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.output.file_prefix, default_file_prefix());
        assert_eq!(config.detection.family_marker, default_family_marker());
    }

    #[test]
    fn test_full_toml() {
        let toml_content = r#"
[output]
directory = "out"
file_prefix = "djhero"
mode = "per_device"

[detection]
family_marker = "IG_"

[source]
snapshot = "devices.toml"

[console]
wait_for_enter = false

[logging]
level = "debug"
file = "calibrator.log"
"#;
        let config = Config::from_toml(toml_content).unwrap();
        assert_eq!(config.output.directory, PathBuf::from("out"));
        assert_eq!(config.output.file_prefix, "djhero");
        assert_eq!(config.output.mode, OutputMode::PerDevice);
        assert_eq!(config.source.snapshot, Some(PathBuf::from("devices.toml")));
        assert!(!config.console.wait_for_enter);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("calibrator.log")));
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config = Config::from_toml("[output]\nmode = \"per_device\"\n").unwrap();
        assert_eq!(config.output.file_prefix, "360table");
        assert_eq!(config.output.directory, PathBuf::from("."));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[output]\nfile_prefix = \"x\"\n").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.output.file_prefix, "x");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/turntable-calibrator.toml");
        assert!(matches!(result, Err(CalibratorError::Io(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[output\n");
        assert!(matches!(result, Err(CalibratorError::Config(_))));
    }

    #[test]
    fn test_invalid_mode() {
        assert!(Config::from_toml("[output]\nmode = \"split\"\n").is_err());
    }

    #[test]
    fn test_empty_file_prefix() {
        let mut config = Config::default();
        config.output.file_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_prefix_with_separator() {
        for prefix in ["a/b", "a\\b", "C:x"] {
            let mut config = Config::default();
            config.output.file_prefix = prefix.to_string();
            assert!(config.validate().is_err(), "prefix {:?} should be rejected", prefix);
        }
    }

    #[test]
    fn test_empty_output_directory() {
        let mut config = Config::default();
        config.output.directory = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_family_marker() {
        let mut config = Config::default();
        config.detection.family_marker = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_snapshot_path() {
        let mut config = Config::default();
        config.source.snapshot = Some(PathBuf::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = Config::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Log level {} should be valid", level);
        }
    }

    #[test]
    fn test_log_file_must_name_a_file() {
        let mut config = Config::default();
        config.logging.file = Some(PathBuf::from(".."));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_locate_prefers_env_path() {
        let fallback = NamedTempFile::new().unwrap();
        let located = Config::locate(Some(PathBuf::from("explicit.toml")), fallback.path());
        assert_eq!(located, Some(PathBuf::from("explicit.toml")));
    }

    #[test]
    fn test_locate_uses_existing_fallback() {
        let fallback = NamedTempFile::new().unwrap();
        assert_eq!(Config::locate(None, fallback.path()), Some(fallback.path().to_path_buf()));
        assert_eq!(
            Config::locate(Some(PathBuf::new()), fallback.path()),
            Some(fallback.path().to_path_buf())
        );
    }

    #[test]
    fn test_locate_without_any_file() {
        assert_eq!(Config::locate(None, Path::new("/nonexistent/turntable-calibrator.toml")), None);
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_output_directory(), PathBuf::from("."));
        assert_eq!(default_file_prefix(), "360table");
        assert_eq!(default_family_marker(), "IG_");
        assert_eq!(default_wait_for_enter(), true);
        assert_eq!(default_log_level(), "info");
    }
}
