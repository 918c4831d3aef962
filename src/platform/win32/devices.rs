//! Device access through the Raw Input API and the configuration tree.

use super::window::Win32Window;
use crate::{
    devices::DeviceInstanceId,
    errors::{Context, Result},
    input::keyboard::VirtualKeyMapper,
    platform::{
        DeviceConfiguration, DeviceSource, Platform, RawDeviceInfo, WindowOptions,
    },
    types::{DeviceHandle, DeviceType, HidUsage, Point, WindowHandle},
};

use ::std::{ffi::c_void, mem::size_of};
use ::tracing::{debug, trace};
use ::widestring::{U16CStr, U16CString};
use ::windows::{
    core::{GUID, PCWSTR},
    Win32::{
        Foundation::{ERROR_SUCCESS, HANDLE, HWND, POINT},
        System::{
            Power::DEVICE_NOTIFY_WINDOW_HANDLE,
            Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ},
            SystemServices::{DBT_DEVTYP_DEVICEINTERFACE, DEV_BROADCAST_DEVICEINTERFACE_W},
        },
        UI::{
            Input::{
                GetRawInputDeviceInfoW, GetRawInputDeviceList, KeyboardAndMouse::MapVirtualKeyW,
                RegisterRawInputDevices, RAWINPUTDEVICE, RAWINPUTDEVICELIST, RIDEV_INPUTSINK,
                RIDI_DEVICENAME, RIM_TYPEKEYBOARD, RIM_TYPEMOUSE,
            },
            WindowsAndMessaging::{GetCursorPos, RegisterDeviceNotificationW, MAPVK_VK_TO_VSC_EX},
        },
    },
};

/// Device instances, keyed by `enumerator\device\instance`.
const ENUM_KEY: &str = r"SYSTEM\CurrentControlSet\Enum";
/// Setup classes, keyed by class GUID.
const CLASS_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Class";

/// `GUID_DEVINTERFACE_HID`
const GUID_DEVINTERFACE_HID: GUID = GUID::from_u128(0x4d1e55b2_f16f_11cf_88cb_001111000030);

/// The Win32 backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceSource for Win32Platform {
    fn enumerate_devices(&self) -> Result<Vec<RawDeviceInfo>> {
        let entry_size = size_of::<RAWINPUTDEVICELIST>() as u32;

        let mut count = 0_u32;
        let ret = unsafe { GetRawInputDeviceList(None, &mut count, entry_size) };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to count raw input devices")
            .function("GetRawInputDeviceList")?;

        let mut list = vec![RAWINPUTDEVICELIST::default(); count as usize];
        let ret = unsafe { GetRawInputDeviceList(Some(list.as_mut_ptr()), &mut count, entry_size) };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to list raw input devices")
            .function("GetRawInputDeviceList")?;
        list.truncate(ret as usize);

        let devices = list
            .iter()
            .map(|entry| RawDeviceInfo {
                handle: DeviceHandle(entry.hDevice.0),
                device_type: match entry.dwType {
                    RIM_TYPEKEYBOARD => DeviceType::Keyboard,
                    RIM_TYPEMOUSE => DeviceType::Mouse,
                    _ => DeviceType::Hid,
                },
            })
            .collect::<Vec<_>>();
        trace!(count = devices.len(), "Enumerated raw input devices");
        Ok(devices)
    }

    fn device_name(&self, device: DeviceHandle) -> Result<String> {
        let handle = HANDLE(device.0);

        // Sizes are in characters for RIDI_DEVICENAME.
        let mut len = 0_u32;
        let ret = unsafe { GetRawInputDeviceInfoW(handle, RIDI_DEVICENAME, None, &mut len) };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to query device name length")
            .function("GetRawInputDeviceInfoW")?;

        let mut buf = vec![0_u16; len as usize + 1];
        let ret = unsafe {
            GetRawInputDeviceInfoW(
                handle,
                RIDI_DEVICENAME,
                Some(buf.as_mut_ptr() as *mut c_void),
                &mut len,
            )
        };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to query device name")
            .function("GetRawInputDeviceInfoW")?;

        Ok(U16CStr::from_slice_truncate(&buf)
            .map(U16CStr::to_string_lossy)
            .unwrap_or_default())
    }

    fn device_configuration(&self, instance: &DeviceInstanceId) -> Option<DeviceConfiguration> {
        let key = format!(
            r"{ENUM_KEY}\{}\{}\{}",
            instance.enumerator, instance.device, instance.instance
        );
        let config = DeviceConfiguration {
            description: read_string(&key, "DeviceDesc"),
            class: read_string(&key, "Class"),
            class_guid: read_string(&key, "ClassGUID"),
        };

        if config == DeviceConfiguration::default() {
            None
        } else {
            Some(config)
        }
    }

    fn class_for_guid(&self, class_guid: &str) -> Option<String> {
        read_string(&format!(r"{CLASS_KEY}\{class_guid}"), "Class")
    }

    fn register_for_input(
        &self,
        window: WindowHandle,
        usage: HidUsage,
        input_sink: bool,
    ) -> Result<()> {
        debug!(
            usage_page = usage.page,
            usage = usage.id,
            input_sink,
            "Register for raw input"
        );
        let device = RAWINPUTDEVICE {
            usUsagePage: usage.page,
            usUsage: usage.id,
            dwFlags: if input_sink {
                RIDEV_INPUTSINK
            } else {
                Default::default()
            },
            hwndTarget: HWND(window.0),
        };

        unsafe { RegisterRawInputDevices(&[device], size_of::<RAWINPUTDEVICE>() as u32) }
            .ok()
            .context("Failed to register for raw input")
            .function("RegisterRawInputDevices")
    }

    fn register_device_notifications(&self, window: WindowHandle) -> Result<()> {
        debug!(hwnd = window.0, "Register for device notifications");
        let filter = DEV_BROADCAST_DEVICEINTERFACE_W {
            dbcc_size: size_of::<DEV_BROADCAST_DEVICEINTERFACE_W>() as u32,
            dbcc_devicetype: DBT_DEVTYP_DEVICEINTERFACE.0,
            dbcc_classguid: GUID_DEVINTERFACE_HID,
            ..Default::default()
        };

        // The registration lives as long as the window does.
        let notify = unsafe {
            RegisterDeviceNotificationW(
                HANDLE(window.0),
                &filter as *const _ as *const c_void,
                DEVICE_NOTIFY_WINDOW_HANDLE,
            )
        };
        (!notify.is_null())
            .then_some(())
            .context("Failed to register for device notifications")
            .function("RegisterDeviceNotificationW")
    }

    fn cursor_position(&self) -> Option<Point> {
        let mut point = POINT::default();
        unsafe { GetCursorPos(&mut point) }
            .as_bool()
            .then(|| Point::new(point.x, point.y))
    }
}

impl VirtualKeyMapper for Win32Platform {
    fn scan_code(&self, virtual_key: u16) -> u16 {
        unsafe { MapVirtualKeyW(u32::from(virtual_key), MAPVK_VK_TO_VSC_EX) as u16 }
    }
}

impl Platform for Win32Platform {
    type Window = Win32Window;

    fn create_window(&self, options: &WindowOptions) -> Result<Win32Window> {
        Win32Window::new(options)
    }
}

/// Reads a `REG_SZ` value below `HKEY_LOCAL_MACHINE`. Missing keys and
/// values read as `None`.
fn read_string(subkey: &str, value: &str) -> Option<String> {
    let subkey = U16CString::from_str(subkey).ok()?;
    let value = U16CString::from_str(value).ok()?;

    let mut size = 0_u32;
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(subkey.as_ptr()),
            PCWSTR::from_raw(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            None,
            Some(&mut size),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }

    let mut buf = vec![0_u16; (size as usize + 1) / 2];
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR::from_raw(subkey.as_ptr()),
            PCWSTR::from_raw(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            Some(buf.as_mut_ptr() as *mut c_void),
            Some(&mut size),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }

    U16CStr::from_slice_truncate(&buf)
        .ok()
        .map(U16CStr::to_string_lossy)
}
