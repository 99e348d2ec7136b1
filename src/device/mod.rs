//! # Device Module
//!
//! Turntable identification.
//!
//! This module handles:
//! - Extracting vendor ID, product ID and subtype from hardware ID strings
//! - Deciding whether an Xbox 360 family device is a turntable
//! - Counting recognized turntables per vendor/product pair

pub mod classifier;
pub mod identity;
pub mod registry;

pub use classifier::{Classification, Classifier};
pub use identity::{DeviceIdentity, ProductKey};
pub use registry::DeviceRegistry;
