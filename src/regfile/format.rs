//! # Registry Editor File Format
//!
//! Minimal writer for `.reg` files as understood by `regedit.exe`, plus a
//! reader that recovers the DirectInput identities addressed by such a file.
//!
//! Layout produced:
//!
//! ```text
//! Windows Registry Editor Version 5.00
//!
//! [HKEY_CURRENT_USER\...\Axes]
//!
//! [HKEY_CURRENT_USER\...\Axes\0]
//! "Calibration"=hex:80,7f,00,00,ff,7f,00,00,7f,80,00,00
//! ```
//!
//! Lines end with CRLF.

use std::fmt::Write as _;

use crate::device::identity::{ParseProductKeyError, ProductKey};

/// First line of every registry file
pub const REGEDIT_HEADER: &str = "Windows Registry Editor Version 5.00";

/// Line terminator expected by regedit
pub const CRLF: &str = "\r\n";

/// Per-user DirectInput private properties, one subkey per `VID_xxxx&PID_xxxx`
pub const DIRECTINPUT_KEY: &str =
    r"HKEY_CURRENT_USER\System\CurrentControlSet\Control\MediaProperties\PrivateProperties\DirectInput";

/// Data of a single registry value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegValue {
    /// `REG_BINARY`, written as `hex:xx,xx,...`
    Binary(Vec<u8>),
    /// Deletes the value on import, written as `-`
    Delete,
}

impl RegValue {
    fn render(&self, out: &mut String) {
        match self {
            RegValue::Binary(bytes) => {
                out.push_str("hex:");
                for (i, byte) in bytes.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{:02x}", byte);
                }
            }
            RegValue::Delete => out.push('-'),
        }
    }
}

/// Builds the text of a `.reg` file.
#[derive(Debug, Clone)]
pub struct RegFileBuilder {
    text: String,
}

impl Default for RegFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegFileBuilder {
    /// Starts a file with the version header line.
    #[must_use]
    pub fn new() -> Self {
        let mut text = String::with_capacity(4096);
        text.push_str(REGEDIT_HEADER);
        text.push_str(CRLF);
        Self { text }
    }

    /// Opens a key section, preceded by a blank line.
    pub fn key(&mut self, path: &str) -> &mut Self {
        self.text.push_str(CRLF);
        self.text.push('[');
        self.text.push_str(path);
        self.text.push(']');
        self.text.push_str(CRLF);
        self
    }

    /// Adds a named value to the current key.
    pub fn value(&mut self, name: &str, value: &RegValue) -> &mut Self {
        self.text.push('"');
        self.text.push_str(name);
        self.text.push_str("\"=");
        value.render(&mut self.text);
        self.text.push_str(CRLF);
        self
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.text
    }
}

/// Returns the identities addressed under [`DIRECTINPUT_KEY`] in a registry
/// file, deduplicated, in order of first appearance.
///
/// Keys outside the DirectInput tree are ignored.
///
/// # Errors
///
/// Returns an error if a DirectInput subkey is not a `VID_xxxx&PID_xxxx` identity.
pub fn parse_identities(text: &str) -> std::result::Result<Vec<ProductKey>, ParseProductKeyError> {
    let mut identities = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some(path) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
            continue;
        };
        // Deletion keys are written as [-path]
        let path = path.strip_prefix('-').unwrap_or(path);

        let Some(rest) = path
            .strip_prefix(DIRECTINPUT_KEY)
            .and_then(|rest| rest.strip_prefix('\\'))
        else {
            continue;
        };

        let segment = rest.split('\\').next().unwrap_or(rest);
        let key: ProductKey = segment.parse()?;
        if !identities.contains(&key) {
            identities.push(key);
        }
    }

    Ok(identities)
}
