//! Raw mouse payloads as delivered with `WM_INPUT`.

/// `RI_MOUSE_*` button transition flags.
pub mod button_flags {
    pub const LEFT_BUTTON_DOWN: u16 = 0x0001;
    pub const LEFT_BUTTON_UP: u16 = 0x0002;
    pub const RIGHT_BUTTON_DOWN: u16 = 0x0004;
    pub const RIGHT_BUTTON_UP: u16 = 0x0008;
    pub const MIDDLE_BUTTON_DOWN: u16 = 0x0010;
    pub const MIDDLE_BUTTON_UP: u16 = 0x0020;
    pub const BUTTON_4_DOWN: u16 = 0x0040;
    pub const BUTTON_4_UP: u16 = 0x0080;
    pub const BUTTON_5_DOWN: u16 = 0x0100;
    pub const BUTTON_5_UP: u16 = 0x0200;
    pub const WHEEL: u16 = 0x0400;
    pub const HWHEEL: u16 = 0x0800;
}

/// `MOUSE_MOVE_ABSOLUTE`: motion values are absolute rather than deltas.
pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;

/// One wheel notch, in raw wheel units.
pub const WHEEL_DELTA: f32 = 120.0;

/// The mouse part of a raw input report (`RAWMOUSE`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawMouse {
    /// `MOUSE_MOVE_*` state flags.
    pub flags: u16,
    /// Button transitions, a combination of [`button_flags`].
    pub button_flags: u16,
    /// Wheel delta when [`button_flags::WHEEL`] or [`button_flags::HWHEEL`]
    /// is set.
    pub button_data: u16,
    /// Raw button state bitmask.
    pub raw_buttons: u32,
    pub last_x: i32,
    pub last_y: i32,
    pub extra_information: u32,
}

impl RawMouse {
    /// Signed wheel delta, if this payload carries vertical wheel motion.
    pub const fn wheel_delta(&self) -> Option<i16> {
        if self.button_flags & button_flags::WHEEL != 0 {
            Some(self.button_data as i16)
        } else {
            None
        }
    }

    /// Signed wheel delta, if this payload carries horizontal wheel motion.
    pub const fn horizontal_wheel_delta(&self) -> Option<i16> {
        if self.button_flags & button_flags::HWHEEL != 0 {
            Some(self.button_data as i16)
        } else {
            None
        }
    }

    /// Whether `last_x`/`last_y` are relative motion deltas.
    pub const fn is_relative(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE == 0
    }
}
