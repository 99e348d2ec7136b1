//! # Device Identity Extraction
//!
//! Pulls vendor ID, product ID and peripheral subtype out of the hardware ID
//! strings Windows reports for a HID device.
//!
//! Hardware IDs look like `HID\VID_1430&PID_1715&IG_00` or
//! `HID\VID_1430&PID_1715&SUB_17`. Every string in the set is scanned for the
//! `VID_`, `PID_` and `SUB_` markers; the fixed-width hex token following a
//! marker is parsed. When several strings carry the same marker, the last one
//! scanned wins.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::{CalibratorError, Result};

/// Vendor ID marker
pub const VID_MARKER: &str = "VID_";

/// Product ID marker
pub const PID_MARKER: &str = "PID_";

/// Subtype marker (XInput device subtype)
pub const SUB_MARKER: &str = "SUB_";

/// Subtype value Windows reports when the subtype is unknown
pub const UNKNOWN_SUBTYPE: u8 = 0x00;

/// Vendor/product pair identifying one kind of device.
///
/// Formats as the canonical identity string `VID_xxxx&PID_xxxx` (uppercase hex),
/// which is also the key DirectInput uses under `PrivateProperties\DirectInput`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductKey {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl ProductKey {
    #[must_use]
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VID_{:04X}&PID_{:04X}", self.vendor_id, self.product_id)
    }
}

/// Error returned when a string is not a canonical `VID_xxxx&PID_xxxx` identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProductKeyError(pub String);

impl fmt::Display for ParseProductKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a VID_xxxx&PID_xxxx identity: {:?}", self.0)
    }
}

impl std::error::Error for ParseProductKeyError {}

impl FromStr for ProductKey {
    type Err = ParseProductKeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let err = || ParseProductKeyError(s.to_string());

        let (vid, pid) = s.split_once('&').ok_or_else(err)?;
        let vid = vid.strip_prefix(VID_MARKER).ok_or_else(err)?;
        let pid = pid.strip_prefix(PID_MARKER).ok_or_else(err)?;

        Ok(Self {
            vendor_id: parse_hex_u16(vid).ok_or_else(err)?,
            product_id: parse_hex_u16(pid).ok_or_else(err)?,
        })
    }
}

/// Identity extracted from a device's hardware IDs.
///
/// Fields default to zero / unknown when no matching token was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    /// `None` when no `SUB_` token was found or it carried [`UNKNOWN_SUBTYPE`]
    pub subtype: Option<u8>,
}

impl DeviceIdentity {
    /// Returns `true` when a non-zero subtype was reported.
    #[must_use]
    pub fn subtype_known(&self) -> bool {
        self.subtype.is_some()
    }

    /// Vendor/product pair of this identity.
    #[must_use]
    pub fn product_key(&self) -> ProductKey {
        ProductKey::new(self.vendor_id, self.product_id)
    }

    /// Scans a set of hardware ID strings and extracts the identity.
    ///
    /// # Errors
    ///
    /// Returns `MalformedIdentifierToken` when a marker is present but the
    /// following characters are not a fixed-width hexadecimal number. This is
    /// not a skip: the caller is expected to abort.
    ///
    /// # Examples
    ///
    /// ```
    /// use turntable_calibrator::device::identity::DeviceIdentity;
    ///
    /// let ids = ["HID\\VID_1430&PID_1715&IG_00", "HID\\VID_1430&PID_1715&SUB_17"];
    /// let identity = DeviceIdentity::from_hardware_ids(&ids)?;
    /// assert_eq!(identity.vendor_id, 0x1430);
    /// assert_eq!(identity.product_id, 0x1715);
    /// assert_eq!(identity.subtype, Some(0x17));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_hardware_ids<S: AsRef<str>>(hardware_ids: &[S]) -> Result<Self> {
        let mut vendor_id: Option<u16> = None;
        let mut product_id: Option<u16> = None;
        let mut subtype: Option<u8> = None;

        for id in hardware_ids {
            let id = id.as_ref();
            debug!("Scanning hardware ID: {}", id);

            if let Some(token) = extract_token(id, VID_MARKER, 4)? {
                let value = parse_hex_u16(token).ok_or_else(|| malformed(VID_MARKER, token, id))?;
                note_override(VID_MARKER, vendor_id.map(u32::from), u32::from(value));
                vendor_id = Some(value);
            }

            if let Some(token) = extract_token(id, PID_MARKER, 4)? {
                let value = parse_hex_u16(token).ok_or_else(|| malformed(PID_MARKER, token, id))?;
                note_override(PID_MARKER, product_id.map(u32::from), u32::from(value));
                product_id = Some(value);
            }

            if let Some(token) = extract_token(id, SUB_MARKER, 2)? {
                let value = parse_hex_u8(token).ok_or_else(|| malformed(SUB_MARKER, token, id))?;
                note_override(SUB_MARKER, subtype.map(u32::from), u32::from(value));
                subtype = Some(value);
            }
        }

        Ok(Self {
            vendor_id: vendor_id.unwrap_or_default(),
            product_id: product_id.unwrap_or_default(),
            subtype: subtype.filter(|&s| s != UNKNOWN_SUBTYPE),
        })
    }
}

/// Locates `marker` in `id` and returns the `width` characters after it.
///
/// Returns `Ok(None)` when the marker is absent and an error when the string
/// ends before `width` characters follow it.
fn extract_token<'a>(id: &'a str, marker: &'static str, width: usize) -> Result<Option<&'a str>> {
    let Some(index) = id.find(marker) else {
        return Ok(None);
    };

    let start = index + marker.len();
    let rest = &id[start..];
    match rest.get(..width) {
        Some(token) if token.chars().count() == width => Ok(Some(token)),
        _ => Err(malformed(marker, rest, id)),
    }
}

fn malformed(marker: &'static str, token: &str, id: &str) -> CalibratorError {
    CalibratorError::MalformedIdentifierToken {
        marker,
        token: token.to_string(),
        hardware_id: id.to_string(),
    }
}

fn note_override(marker: &str, previous: Option<u32>, value: u32) {
    if let Some(previous) = previous {
        if previous != value {
            warn!(
                "Multiple {} tokens with different values (0x{:X} then 0x{:X}); using the last one",
                marker, previous, value
            );
        }
    }
}

/// `from_str_radix` accepts a leading `+`, so digits are checked first.
fn parse_hex_u16(s: &str) -> Option<u16> {
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        u16::from_str_radix(s, 16).ok()
    } else {
        None
    }
}

fn parse_hex_u8(s: &str) -> Option<u8> {
    if s.len() == 2 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        u8::from_str_radix(s, 16).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_all_tokens() {
        let ids = [
            "HID\\VID_1430&PID_1715&IG_00&SUB_17",
            "HID\\VID_1430&PID_1715&IG_00",
        ];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();

        assert_eq!(identity.vendor_id, 0x1430);
        assert_eq!(identity.product_id, 0x1715);
        assert_eq!(identity.subtype, Some(0x17));
        assert!(identity.subtype_known());
    }

    #[test]
    fn test_defaults_when_no_tokens() {
        let ids = ["HID_DEVICE_SYSTEM_GAME", "HID_DEVICE"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();

        assert_eq!(identity, DeviceIdentity::default());
        assert!(!identity.subtype_known());
    }

    #[test]
    fn test_empty_hardware_ids() {
        let ids: [&str; 0] = [];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();
        assert_eq!(identity, DeviceIdentity::default());
    }

    #[test]
    fn test_subtype_zero_is_unknown() {
        let ids = ["HID\\VID_045E&PID_028E&SUB_00"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();

        assert_eq!(identity.vendor_id, 0x045E);
        assert_eq!(identity.subtype, None);
    }

    #[test]
    fn test_lowercase_hex_digits_parse() {
        let ids = ["HID\\VID_abcd&PID_ef01&SUB_1a"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();

        assert_eq!(identity.vendor_id, 0xABCD);
        assert_eq!(identity.product_id, 0xEF01);
        assert_eq!(identity.subtype, Some(0x1A));
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let ids = ["HID\\vid_1430&pid_1715&sub_17"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();
        assert_eq!(identity, DeviceIdentity::default());
    }

    #[test]
    fn test_last_match_wins() {
        let ids = ["HID\\VID_1111&PID_2222&SUB_17", "HID\\VID_3333&PID_4444&SUB_05"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();

        assert_eq!(identity.vendor_id, 0x3333);
        assert_eq!(identity.product_id, 0x4444);
        assert_eq!(identity.subtype, Some(0x05));
    }

    #[test]
    fn test_later_zero_subtype_clears_earlier_one() {
        let ids = ["HID\\VID_1430&PID_1715&SUB_17", "HID\\VID_1430&PID_1715&SUB_00"];
        let identity = DeviceIdentity::from_hardware_ids(&ids).unwrap();
        assert_eq!(identity.subtype, None);
    }

    #[test]
    fn test_non_hex_token_is_error() {
        let ids = ["HID\\VID_14G0&PID_1715"];
        let err = DeviceIdentity::from_hardware_ids(&ids).unwrap_err();

        match err {
            CalibratorError::MalformedIdentifierToken { marker, token, .. } => {
                assert_eq!(marker, VID_MARKER);
                assert_eq!(token, "14G0");
            }
            other => panic!("Expected MalformedIdentifierToken, got: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_token_is_error() {
        let ids = ["HID\\VID_1430&PID_17"];
        let err = DeviceIdentity::from_hardware_ids(&ids).unwrap_err();

        match err {
            CalibratorError::MalformedIdentifierToken { marker, .. } => {
                assert_eq!(marker, PID_MARKER);
            }
            other => panic!("Expected MalformedIdentifierToken, got: {:?}", other),
        }
    }

    #[test]
    fn test_truncated_subtype_is_error() {
        let ids = ["HID\\VID_1430&PID_1715&SUB_1"];
        assert!(DeviceIdentity::from_hardware_ids(&ids).is_err());
    }

    #[test]
    fn test_sign_prefix_is_rejected() {
        let ids = ["HID\\VID_+143&PID_1715"];
        assert!(DeviceIdentity::from_hardware_ids(&ids).is_err());
    }

    #[test]
    fn test_non_ascii_after_marker_is_error() {
        let ids = ["HID\\VID_1é30"];
        assert!(DeviceIdentity::from_hardware_ids(&ids).is_err());
    }

    #[test]
    fn test_product_key_display() {
        assert_eq!(ProductKey::new(0x1430, 0x1715).to_string(), "VID_1430&PID_1715");
        assert_eq!(ProductKey::new(0x00ab, 0x0c).to_string(), "VID_00AB&PID_000C");
    }

    #[test]
    fn test_product_key_from_str() {
        let key: ProductKey = "VID_1234&PID_5678".parse().unwrap();
        assert_eq!(key, ProductKey::new(0x1234, 0x5678));

        let key: ProductKey = "VID_abcd&PID_00ef".parse().unwrap();
        assert_eq!(key, ProductKey::new(0xABCD, 0x00EF));
    }

    #[test]
    fn test_product_key_from_str_rejects_garbage() {
        assert!("VID_1234".parse::<ProductKey>().is_err());
        assert!("PID_5678&VID_1234".parse::<ProductKey>().is_err());
        assert!("VID_12345&PID_5678".parse::<ProductKey>().is_err());
        assert!("VID_12&PID_5678".parse::<ProductKey>().is_err());
        assert!("".parse::<ProductKey>().is_err());
    }

    #[test]
    fn test_identity_product_key() {
        let identity = DeviceIdentity {
            vendor_id: 0x1430,
            product_id: 0x1715,
            subtype: None,
        };
        assert_eq!(identity.product_key().to_string(), "VID_1430&PID_1715");
    }
}
