//! # Turntable Classifier
//!
//! Decides whether a HID device is a DJ Hero turntable that should be calibrated.
//!
//! ## Detection
//!
//! 1. The device path must contain the Xbox 360 controller marker (`IG_`).
//!    XInput-compatible HID collections are the only ones exposing it.
//! 2. If the hardware IDs carry a subtype (`SUB_xx`), the device is a turntable
//!    exactly when the subtype is `0x17`.
//! 3. Without a subtype, the wired turntable is recognized by its vendor and
//!    product IDs (`0x1430:0x1715`). Anything else is skipped.

use tracing::info;

use super::identity::{DeviceIdentity, ProductKey};
use crate::error::Result;

/// Marker present in the device path of Xbox 360 controller HID collections
pub const XBOX360_FAMILY_MARKER: &str = "IG_";

/// XInput subtype reported by turntables
pub const TURNTABLE_SUBTYPE: u8 = 0x17;

/// Wired turntable vendor ID (RedOctane)
pub const WIRED_TURNTABLE_VENDOR_ID: u16 = 0x1430;

/// Wired turntable product ID
pub const WIRED_TURNTABLE_PRODUCT_ID: u16 = 0x1715;

/// Outcome of classifying one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Device path lacks the controller family marker
    NotRelevant,
    /// A turntable that should receive calibration
    RecognizedTurntable(ProductKey),
    /// A controller of the right family that is not a turntable
    UnrecognizedSkip,
}

impl Classification {
    /// Returns the product key when the device was recognized.
    #[must_use]
    pub fn recognized(&self) -> Option<ProductKey> {
        match self {
            Classification::RecognizedTurntable(key) => Some(*key),
            _ => None,
        }
    }
}

/// Classifies devices by path and hardware IDs.
#[derive(Debug, Clone)]
pub struct Classifier {
    family_marker: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(XBOX360_FAMILY_MARKER)
    }
}

impl Classifier {
    /// Creates a classifier matching device paths against `family_marker`.
    #[must_use]
    pub fn new(family_marker: impl Into<String>) -> Self {
        Self {
            family_marker: family_marker.into(),
        }
    }

    /// Returns the configured family marker.
    #[must_use]
    pub fn family_marker(&self) -> &str {
        &self.family_marker
    }

    /// Cheap path pre-filter, checked before hardware IDs are even fetched.
    #[must_use]
    pub fn is_family_device(&self, device_path: &str) -> bool {
        device_path.contains(&self.family_marker)
    }

    /// Classifies a device from its path and hardware ID strings.
    ///
    /// Hardware IDs are only parsed for devices passing the path filter, so a
    /// malformed ID on an unrelated device never aborts the run.
    ///
    /// # Errors
    ///
    /// Returns `MalformedIdentifierToken` if a marker in the hardware IDs is
    /// followed by an invalid hex token.
    ///
    /// # Examples
    ///
    /// ```
    /// use turntable_calibrator::device::classifier::{Classification, Classifier};
    ///
    /// let classifier = Classifier::default();
    /// let outcome = classifier.classify(
    ///     r"\\?\HID#VID_1430&PID_1715&IG_00#7&1a2b3c4d&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}",
    ///     &["HID\\VID_1430&PID_1715&IG_00"],
    /// )?;
    /// assert!(matches!(outcome, Classification::RecognizedTurntable(_)));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn classify<S: AsRef<str>>(&self, device_path: &str, hardware_ids: &[S]) -> Result<Classification> {
        if !self.is_family_device(device_path) {
            return Ok(Classification::NotRelevant);
        }

        info!("Found Xbox 360 HID device: {}", device_path);

        let identity = DeviceIdentity::from_hardware_ids(hardware_ids)?;
        info!("Vendor ID: 0x{:04X}", identity.vendor_id);
        info!("Product ID: 0x{:04X}", identity.product_id);

        Ok(Self::decide(&identity))
    }

    /// Applies the subtype rule, or the vendor/product fallback when the subtype is unknown.
    fn decide(identity: &DeviceIdentity) -> Classification {
        match identity.subtype {
            Some(subtype) => {
                info!("Subtype: 0x{:02X}", subtype);
                if subtype == TURNTABLE_SUBTYPE {
                    info!("Device is a turntable.");
                    Classification::RecognizedTurntable(identity.product_key())
                } else {
                    info!("Device is not a turntable! Skipping.");
                    Classification::UnrecognizedSkip
                }
            }
            None => {
                info!("Couldn't determine subtype! Falling back to vendor/product IDs.");
                if identity.vendor_id == WIRED_TURNTABLE_VENDOR_ID
                    && identity.product_id == WIRED_TURNTABLE_PRODUCT_ID
                {
                    info!("Matched with wired turntable vendor/product IDs.");
                    info!("Device is a wired turntable.");
                    Classification::RecognizedTurntable(identity.product_key())
                } else {
                    info!("Vendor/product IDs are unrecognized! Skipping device.");
                    Classification::UnrecognizedSkip
                }
            }
        }
    }
}
