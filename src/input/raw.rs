//! Decoding of `GetRawInputData(RID_INPUT)` buffers.
//!
//! The buffer holds a `RAWINPUT` structure: a `RAWINPUTHEADER` followed by a
//! payload whose shape depends on the header's type. The header contains two
//! pointer-sized fields, so offsets follow the native pointer width.

use ::std::mem::size_of;

use crate::{
    input::{
        keyboard::{RawKeyFlags, RawKeyboard},
        mouse::RawMouse,
    },
    types::{DeviceHandle, DeviceType},
};

const RIM_TYPEMOUSE: u32 = 0;
const RIM_TYPEKEYBOARD: u32 = 1;
const RIM_TYPEHID: u32 = 2;

/// Size of `RAWINPUTHEADER`: type, size, device handle and wparam.
pub const HEADER_SIZE: usize = 8 + 2 * size_of::<usize>();
const KEYBOARD_SIZE: usize = 16;
const MOUSE_SIZE: usize = 24;

/// One decoded raw input report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawInput {
    /// The device which produced the report.
    pub device: DeviceHandle,
    pub data: RawInputData,
}

/// The kind-tagged payload of a [`RawInput`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawInputData {
    Keyboard(RawKeyboard),
    Mouse(RawMouse),
    /// A report from some other HID device. Its contents are not decoded.
    Hid,
}

impl RawInputData {
    pub fn device_type(&self) -> DeviceType {
        match self {
            Self::Keyboard(_) => DeviceType::Keyboard,
            Self::Mouse(_) => DeviceType::Mouse,
            Self::Hid => DeviceType::Hid,
        }
    }
}

impl RawInput {
    /// Decodes a `RAWINPUT` buffer. Returns `None` if the buffer is too short
    /// for its declared type, or the type is unrecognised.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        let reader = Reader::new(buf);
        let kind = reader.u32(0)?;
        let device = DeviceHandle(reader.isize(8)?);
        let payload = Reader::new(buf.get(HEADER_SIZE..)?);

        let data = match kind {
            RIM_TYPEKEYBOARD => {
                payload.require(KEYBOARD_SIZE)?;
                RawInputData::Keyboard(RawKeyboard {
                    make_code: payload.u16(0)?,
                    flags: RawKeyFlags::from(payload.u16(2)?),
                    virtual_key: payload.u16(6)?,
                    message: payload.u32(8)?,
                    extra_information: payload.u32(12)?,
                })
            }
            RIM_TYPEMOUSE => {
                payload.require(MOUSE_SIZE)?;
                RawInputData::Mouse(RawMouse {
                    flags: payload.u16(0)?,
                    button_flags: payload.u16(4)?,
                    button_data: payload.u16(6)?,
                    raw_buttons: payload.u32(8)?,
                    last_x: payload.u32(12)? as i32,
                    last_y: payload.u32(16)? as i32,
                    extra_information: payload.u32(20)?,
                })
            }
            RIM_TYPEHID => RawInputData::Hid,
            _ => return None,
        };

        Some(Self { device, data })
    }
}

/// Bounds-checked native-endian field reads.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn require(&self, len: usize) -> Option<()> {
        (self.buf.len() >= len).then_some(())
    }

    fn bytes<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        self.buf.get(offset..offset + N)?.try_into().ok()
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        self.bytes(offset).map(u16::from_ne_bytes)
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        self.bytes(offset).map(u32::from_ne_bytes)
    }

    fn isize(&self, offset: usize) -> Option<isize> {
        self.bytes(offset).map(isize::from_ne_bytes)
    }
}
