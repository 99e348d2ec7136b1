//! # Registry File Module
//!
//! Generation of importable `.reg` calibration files.
//!
//! This module handles:
//! - Writing the regedit 5.00 text format (CRLF, hex binary values, deletions)
//! - Rendering the apply and reset calibration profiles per device instance
//! - Naming artifacts and writing them to disk one at a time

pub mod calibration;
pub mod format;
pub mod writer;

pub use calibration::{emit, Profile};
pub use format::parse_identities;
pub use writer::{plan_artifacts, write_artifacts, Artifact, OutputMode};
