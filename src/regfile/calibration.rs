//! # Calibration Artifacts
//!
//! Renders the DirectInput calibration overrides for recognized turntables.
//!
//! DirectInput stores per-axis calibration under
//! `DirectInput\VID_xxxx&PID_xxxx\Calibration\{instance}\Type\Axes\{axis}` as a
//! 12-byte `Calibration` value (three little-endian `u32`s: minimum, center,
//! maximum). The turntable's platter and effects-dial axes only ever report a
//! handful of values near their endpoints, so Windows' default calibration
//! squashes them. The apply profile pins axes 0 and 1 to a narrow calibration
//! and clears the rest; the reset profile clears all five axes so Windows
//! falls back to its defaults.

use crate::device::identity::ProductKey;
use crate::device::registry::DeviceRegistry;

use super::format::{RegFileBuilder, RegValue, DIRECTINPUT_KEY};

/// Calibration data written to axes 0 and 1.
///
/// min = 0x7f80, center = 0x7fff, max = 0x807f (little-endian `u32` each)
pub const AXIS_CALIBRATION: [u8; 12] = [
    0x80, 0x7f, 0x00, 0x00, 0xff, 0x7f, 0x00, 0x00, 0x7f, 0x80, 0x00, 0x00,
];

/// Number of axis subkeys written per instance
pub const AXIS_COUNT: usize = 5;

/// Number of leading axes that receive [`AXIS_CALIBRATION`]
pub const CALIBRATED_AXES: usize = 2;

/// Registry value name holding axis calibration
pub const CALIBRATION_VALUE: &str = "Calibration";

/// Which of the two artifacts to render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Custom calibration on axes 0 and 1, other axes cleared
    Apply,
    /// All axes cleared
    Reset,
}

impl Profile {
    /// Value written to `axis` by this profile.
    #[must_use]
    pub fn axis_value(self, axis: usize) -> RegValue {
        match self {
            Profile::Apply if axis < CALIBRATED_AXES => RegValue::Binary(AXIS_CALIBRATION.to_vec()),
            _ => RegValue::Delete,
        }
    }
}

/// Path of the `Axes` key for one device instance.
#[must_use]
pub fn axes_key(key: &ProductKey, instance: u32) -> String {
    format!(r"{}\{}\Calibration\{}\Type\Axes", DIRECTINPUT_KEY, key, instance)
}

/// Renders one profile for the given `(identity, instance count)` pairs.
///
/// Identities are emitted in the order given, instances in ascending order.
pub fn render<I>(profile: Profile, devices: I) -> String
where
    I: IntoIterator<Item = (ProductKey, u32)>,
{
    let mut builder = RegFileBuilder::new();

    for (key, count) in devices {
        for instance in 0..count {
            let axes = axes_key(&key, instance);
            builder.key(&axes);

            for axis in 0..AXIS_COUNT {
                builder
                    .key(&format!(r"{}\{}", axes, axis))
                    .value(CALIBRATION_VALUE, &profile.axis_value(axis));
            }
        }
    }

    builder.finish()
}

/// Renders the apply and reset artifacts covering every device in `registry`.
///
/// # Examples
///
/// ```
/// use turntable_calibrator::device::{DeviceRegistry, ProductKey};
/// use turntable_calibrator::regfile::calibration::emit;
///
/// let mut registry = DeviceRegistry::new();
/// registry.record(ProductKey::new(0x1430, 0x1715));
///
/// let (apply, reset) = emit(&registry);
/// assert!(apply.contains(r"\VID_1430&PID_1715\Calibration\0\Type\Axes\0]"));
/// assert!(apply.contains(r#""Calibration"=hex:80,7f,00,00,ff,7f,00,00,7f,80,00,00"#));
/// assert!(!reset.contains("hex:"));
/// ```
#[must_use]
pub fn emit(registry: &DeviceRegistry) -> (String, String) {
    (
        render(Profile::Apply, registry.iter()),
        render(Profile::Reset, registry.iter()),
    )
}
