//! # Windows Device Source
//!
//! Live HID enumeration through SetupAPI and hardware ID lookup through
//! CfgMgr32.
//!
//! The interface list is captured once when [`SetupApiEnumerator`] is created;
//! indexes address that capture, so re-reading an index is stable for the
//! lifetime of the enumerator.

use std::iter;
use std::mem;

use tracing::debug;
use windows::core::PCWSTR;
use windows::Win32::Devices::DeviceAndDriverInstallation::{
    CM_Get_DevNode_PropertyW, CM_Get_Device_IDW, CM_Locate_DevNodeW, SetupDiDestroyDeviceInfoList,
    SetupDiEnumDeviceInterfaces, SetupDiGetClassDevsW, SetupDiGetDeviceInterfaceDetailW,
    CM_LOCATE_DEVNODE_NORMAL, CR_BUFFER_SMALL, CR_SUCCESS, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT,
    HDEVINFO, MAX_DEVICE_ID_LEN, SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W,
    SP_DEVINFO_DATA,
};
use windows::Win32::Devices::HumanInterfaceDevice::GUID_DEVINTERFACE_HID;
use windows::Win32::Devices::Properties::{DEVPKEY_Device_HardwareIds, DEVPROPTYPE};
use windows::Win32::Foundation::ERROR_NO_MORE_ITEMS;

use super::{DeviceEnumerator, DeviceInterface, PropertySource};
use crate::error::{CalibratorError, Result};

/// Present HID device interfaces, addressed by index
pub struct SetupApiEnumerator {
    info_set: HDEVINFO,
}

impl std::fmt::Debug for SetupApiEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupApiEnumerator").finish_non_exhaustive()
    }
}

impl SetupApiEnumerator {
    /// Captures the present HID device interfaces.
    ///
    /// # Errors
    ///
    /// Returns `Enumeration` if SetupAPI cannot build the device info set.
    pub fn open() -> Result<Self> {
        // SAFETY: all pointer arguments are either null or point to live statics.
        let info_set = unsafe {
            SetupDiGetClassDevsW(
                Some(&GUID_DEVINTERFACE_HID as *const _),
                PCWSTR::null(),
                None,
                DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
            )
        }
        .map_err(|e| CalibratorError::Enumeration(format!("SetupDiGetClassDevsW failed: {}", e)))?;

        Ok(Self { info_set })
    }

    fn interface_path(&self, interface: &SP_DEVICE_INTERFACE_DATA, info: &mut SP_DEVINFO_DATA) -> Result<String> {
        let mut required: u32 = 0;

        // First call only reports the required size and is expected to fail.
        // SAFETY: `interface` was filled in by SetupDiEnumDeviceInterfaces on this set.
        let _ = unsafe {
            SetupDiGetDeviceInterfaceDetailW(self.info_set, interface, None, 0, Some(&mut required as *mut u32), None)
        };
        if required == 0 {
            return Err(CalibratorError::Enumeration(
                "SetupDiGetDeviceInterfaceDetailW reported an empty interface detail".to_string(),
            ));
        }

        // u32 storage keeps the buffer aligned for the detail struct
        let mut buffer = vec![0u32; (required as usize).div_ceil(mem::size_of::<u32>())];
        let detail = buffer.as_mut_ptr().cast::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>();

        // SAFETY: `buffer` holds at least `required` bytes and is suitably aligned;
        // cbSize must be the size of the fixed part of the struct.
        unsafe {
            (*detail).cbSize = mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32;
            SetupDiGetDeviceInterfaceDetailW(
                self.info_set,
                interface,
                Some(detail),
                required,
                None,
                Some(info as *mut SP_DEVINFO_DATA),
            )
        }
        .map_err(|e| CalibratorError::Enumeration(format!("SetupDiGetDeviceInterfaceDetailW failed: {}", e)))?;

        // SAFETY: DevicePath is a NUL-terminated UTF-16 string inside `buffer`.
        unsafe { PCWSTR((*detail).DevicePath.as_ptr()).to_string() }
            .map_err(|e| CalibratorError::Enumeration(format!("device path is not valid UTF-16: {}", e)))
    }

    fn instance_id(info: &SP_DEVINFO_DATA) -> Result<String> {
        let mut buffer = [0u16; MAX_DEVICE_ID_LEN as usize + 1];

        // SAFETY: `buffer` is a valid, writable slice.
        let ret = unsafe { CM_Get_Device_IDW(info.DevInst, &mut buffer, 0) };
        if ret != CR_SUCCESS {
            return Err(CalibratorError::Enumeration(format!(
                "CM_Get_Device_IDW failed: CONFIGRET {}",
                ret.0
            )));
        }

        let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
        Ok(String::from_utf16_lossy(&buffer[..len]))
    }
}

impl DeviceEnumerator for SetupApiEnumerator {
    fn device_at(&self, index: u32) -> Result<Option<DeviceInterface>> {
        let mut interface = SP_DEVICE_INTERFACE_DATA {
            cbSize: mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32,
            ..Default::default()
        };

        // SAFETY: `interface` is a properly sized, writable struct.
        let found = unsafe {
            SetupDiEnumDeviceInterfaces(self.info_set, None, &GUID_DEVINTERFACE_HID, index, &mut interface)
        };
        if let Err(e) = found {
            if e.code() == ERROR_NO_MORE_ITEMS.to_hresult() {
                debug!("No HID interface at index {}", index);
                return Ok(None);
            }
            return Err(CalibratorError::Enumeration(format!(
                "SetupDiEnumDeviceInterfaces({}) failed: {}",
                index, e
            )));
        }

        let mut info = SP_DEVINFO_DATA {
            cbSize: mem::size_of::<SP_DEVINFO_DATA>() as u32,
            ..Default::default()
        };
        let path = self.interface_path(&interface, &mut info)?;
        let instance_id = Self::instance_id(&info)?;

        Ok(Some(DeviceInterface { path, instance_id }))
    }
}

impl Drop for SetupApiEnumerator {
    fn drop(&mut self) {
        // SAFETY: the set was created by SetupDiGetClassDevsW and is destroyed once.
        if let Err(e) = unsafe { SetupDiDestroyDeviceInfoList(self.info_set) } {
            debug!("SetupDiDestroyDeviceInfoList failed: {}", e);
        }
    }
}

/// Hardware ID lookup through the configuration manager
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigManagerProperties;

impl ConfigManagerProperties {
    fn lookup_error(instance_id: &str, reason: impl Into<String>) -> CalibratorError {
        CalibratorError::PropertyLookup {
            instance_id: instance_id.to_string(),
            reason: reason.into(),
        }
    }
}

impl PropertySource for ConfigManagerProperties {
    fn hardware_ids(&self, instance_id: &str) -> Result<Vec<String>> {
        let wide: Vec<u16> = instance_id.encode_utf16().chain(iter::once(0)).collect();
        let mut dev_inst: u32 = 0;

        // SAFETY: `wide` is NUL-terminated and outlives the call.
        let ret = unsafe { CM_Locate_DevNodeW(&mut dev_inst, PCWSTR(wide.as_ptr()), CM_LOCATE_DEVNODE_NORMAL) };
        if ret != CR_SUCCESS {
            return Err(Self::lookup_error(
                instance_id,
                format!("CM_Locate_DevNodeW failed: CONFIGRET {}", ret.0),
            ));
        }

        let mut prop_type = DEVPROPTYPE::default();
        let mut size: u32 = 0;

        // SAFETY: size query with no buffer.
        let ret = unsafe {
            CM_Get_DevNode_PropertyW(dev_inst, &DEVPKEY_Device_HardwareIds, &mut prop_type, None, &mut size, 0)
        };
        if ret != CR_BUFFER_SMALL || size == 0 {
            return Err(Self::lookup_error(
                instance_id,
                format!("hardware ID property unavailable: CONFIGRET {}", ret.0),
            ));
        }

        // REG_MULTI_SZ: UTF-16 strings separated and terminated by NUL
        let mut buffer = vec![0u16; (size as usize).div_ceil(mem::size_of::<u16>())];

        // SAFETY: `buffer` holds at least `size` bytes.
        let ret = unsafe {
            CM_Get_DevNode_PropertyW(
                dev_inst,
                &DEVPKEY_Device_HardwareIds,
                &mut prop_type,
                Some(buffer.as_mut_ptr().cast::<u8>()),
                &mut size,
                0,
            )
        };
        if ret != CR_SUCCESS {
            return Err(Self::lookup_error(
                instance_id,
                format!("CM_Get_DevNode_PropertyW failed: CONFIGRET {}", ret.0),
            ));
        }

        Ok(split_multi_sz(&buffer))
    }
}

/// Splits a UTF-16 multi-string into its non-empty parts.
fn split_multi_sz(buffer: &[u16]) -> Vec<String> {
    buffer
        .split(|&c| c == 0)
        .filter(|part| !part.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}
