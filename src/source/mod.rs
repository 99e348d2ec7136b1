//! # Device Source Module
//!
//! Access to the devices attached to the host.
//!
//! Enumeration and property lookup are split in two traits, mirroring the
//! Windows APIs behind them: SetupAPI hands out interface paths and instance
//! IDs by index, CfgMgr32 resolves hardware IDs for an instance ID.
//!
//! Backends:
//! - [`windows`]: live devices through SetupAPI / CfgMgr32 (Windows only)
//! - [`snapshot`]: devices described in a TOML file (any platform)

pub mod snapshot;
#[cfg(windows)]
pub mod windows;

use crate::error::Result;

/// Interface class GUID for HID devices
pub const HID_INTERFACE_CLASS: &str = "{4d1e55b2-f16f-11cf-88cb-001111000030}";

/// One enumerated device interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInterface {
    /// Device interface path (e.g., `\\?\HID#VID_1430&PID_1715&IG_00#...`)
    pub path: String,
    /// PnP instance ID (e.g., `HID\VID_1430&PID_1715&IG_00\7&...`)
    pub instance_id: String,
}

/// Index-addressed enumeration of HID device interfaces.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceEnumerator {
    /// Returns the interface at `index`, or `None` past the last one.
    ///
    /// Calling it again with the same index yields the same device.
    fn device_at(&self, index: u32) -> Result<Option<DeviceInterface>>;
}

/// Hardware ID lookup by PnP instance ID.
#[cfg_attr(test, mockall::automock)]
pub trait PropertySource {
    /// Returns the hardware ID strings of an instance, in the order the system reports them.
    ///
    /// # Errors
    ///
    /// Returns `PropertyLookup` if the instance no longer exists or has no
    /// readable hardware IDs.
    fn hardware_ids(&self, instance_id: &str) -> Result<Vec<String>>;
}
