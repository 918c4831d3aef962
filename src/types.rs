//! Small value types shared between the platform layer and the device
//! registries.

use ::std::fmt;

/// Opaque OS handle of a raw input device (`RAWINPUTHEADER::hDevice`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceHandle(pub isize);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Handle of the message window which receives raw input. It is plain data so
/// it may cross threads, but it must only be used for calls which Win32
/// permits from any thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// Coarse device type as reported by device enumeration
/// (`RAWINPUTDEVICELIST::dwType`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ::strum::Display)]
pub enum DeviceType {
    Mouse,
    Keyboard,
    Hid,
}

/// A HID usage page / usage pair identifying a top-level collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HidUsage {
    pub page: u16,
    pub id: u16,
}

impl HidUsage {
    /// Generic desktop / mouse.
    pub const MOUSE: Self = Self { page: 0x01, id: 0x02 };
    /// Generic desktop / keyboard.
    pub const KEYBOARD: Self = Self { page: 0x01, id: 0x06 };
}

/// An absolute position in screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
