//! # Error Types
//!
//! Custom error types for Turntable Calibrator using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Turntable Calibrator
#[derive(Debug, Error)]
pub enum CalibratorError {
    /// A `VID_`/`PID_`/`SUB_` marker was followed by something that is not fixed-width hex
    #[error("malformed {marker} token {token:?} in hardware ID {hardware_id:?}")]
    MalformedIdentifierToken {
        marker: &'static str,
        token: String,
        hardware_id: String,
    },

    /// Hardware IDs could not be resolved for a device instance
    #[error("failed to look up hardware IDs for {instance_id}: {reason}")]
    PropertyLookup { instance_id: String, reason: String },

    /// Device enumeration backend failed
    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    /// A calibration file could not be created, written or flushed
    #[error("failed to write {}: {source}", path.display())]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Turntable Calibrator
pub type Result<T> = std::result::Result<T, CalibratorError>;
