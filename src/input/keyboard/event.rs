//! Raw keyboard payloads as delivered with `WM_INPUT`.

use ::deku::prelude::*;

/// `WM_KEYDOWN`
pub const WM_KEYDOWN: u32 = 0x0100;
/// `WM_KEYUP`
pub const WM_KEYUP: u32 = 0x0101;
/// `WM_SYSKEYDOWN`
pub const WM_SYSKEYDOWN: u32 = 0x0104;
/// `WM_SYSKEYUP`
pub const WM_SYSKEYUP: u32 = 0x0105;

/// The keyboard part of a raw input report (`RAWKEYBOARD`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawKeyboard {
    /// The scan code from the key depression. `0xFF` signals a keyboard
    /// overrun.
    pub make_code: u16,
    pub flags: RawKeyFlags,
    /// The corresponding legacy virtual-key code.
    pub virtual_key: u16,
    /// The corresponding legacy keyboard window message, e.g. `WM_KEYDOWN`.
    pub message: u32,
    pub extra_information: u32,
}

/// Transition reported by a [`RawKeyboard`] payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyTransition {
    Pressed,
    Released,
}

impl RawKeyboard {
    /// Whether the payload presses or releases its key, based on the legacy
    /// window message. `None` for anything other than key up/down messages.
    pub const fn transition(&self) -> Option<KeyTransition> {
        match self.message {
            WM_KEYDOWN | WM_SYSKEYDOWN => Some(KeyTransition::Pressed),
            WM_KEYUP | WM_SYSKEYUP => Some(KeyTransition::Released),
            _ => None,
        }
    }
}

/// Struct representation of the raw keyboard `Flags` field.
///
/// Flag definitions:
/// <https://learn.microsoft.com/en-us/windows/win32/api/winuser/ns-winuser-rawkeyboard>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, DekuRead, DekuWrite)]
#[deku(endian = "big")]
pub struct RawKeyFlags {
    /// Bit 4. `RI_KEY_TERMSRV_SHADOW`.
    #[deku(pad_bits_before = "11", bits = "1")]
    pub terminal_server_shadow: bool,

    /// Bit 3. `RI_KEY_TERMSRV_SET_LED`.
    #[deku(bits = "1")]
    pub terminal_server_set_led: bool,

    /// Bit 2. `RI_KEY_E1`: the scan code has the `E1` prefix.
    #[deku(bits = "1")]
    pub extended1: bool,

    /// Bit 1. `RI_KEY_E0`: the scan code has the `E0` prefix.
    #[deku(bits = "1")]
    pub extended0: bool,

    /// Bit 0. `RI_KEY_BREAK`: the key is up.
    #[deku(bits = "1")]
    pub is_break: bool,
}

impl From<u16> for RawKeyFlags {
    fn from(flags: u16) -> Self {
        Self::from_bytes((&flags.to_be_bytes(), 0))
            .map(|(_, flags)| flags)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_flags_make() {
        assert_eq!(RawKeyFlags::from(0x0000), RawKeyFlags::default());
    }

    /// Releasing right control: `RI_KEY_BREAK | RI_KEY_E0`.
    #[test]
    fn test_flags_extended_break() {
        assert_eq!(
            RawKeyFlags::from(0x0003),
            RawKeyFlags {
                is_break: true,
                extended0: true,
                extended1: false,
                terminal_server_set_led: false,
                terminal_server_shadow: false,
            }
        );
    }

    /// Pressing pause: `RI_KEY_E1`.
    #[test]
    fn test_flags_e1() {
        let flags = RawKeyFlags::from(0x0004);
        assert!(flags.extended1);
        assert!(!flags.extended0);
        assert!(!flags.is_break);
    }

    #[test]
    fn test_flags_terminal_server() {
        let flags = RawKeyFlags::from(0x0018);
        assert!(flags.terminal_server_shadow);
        assert!(flags.terminal_server_set_led);
        assert!(!flags.is_break);
    }

    #[test]
    fn test_transition() {
        let mut kbd = RawKeyboard {
            make_code: 30,
            virtual_key: 0x41,
            message: WM_KEYDOWN,
            ..Default::default()
        };
        assert_eq!(kbd.transition(), Some(KeyTransition::Pressed));
        kbd.message = WM_SYSKEYUP;
        assert_eq!(kbd.transition(), Some(KeyTransition::Released));
        kbd.message = 0x0102;
        assert_eq!(kbd.transition(), None);
    }
}
