//! # Turntable Calibrator Library
//!
//! Finds Xbox 360 DJ Hero turntables and generates DirectInput calibration files.
//!
//! This library provides the core functionality for identifying turntables from
//! their hardware IDs and rendering `.reg` files that apply or reset a
//! calibration suited to the turntable's platter axes.

pub mod calibrator;
pub mod config;
pub mod device;
pub mod error;
pub mod regfile;
pub mod source;
