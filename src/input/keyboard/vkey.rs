//! Virtual-key to scan code mapping.

/// A handful of Win32 virtual-key codes referenced by the crate.
///
/// Raw input reports the generic, side-less codes ([`SHIFT`], [`CONTROL`],
/// [`MENU`]) for modifier keys. The side is recovered from the scan code and
/// the extended flag.
pub mod vk {
    pub const RETURN: u16 = 0x0D;
    pub const SHIFT: u16 = 0x10;
    pub const CONTROL: u16 = 0x11;
    pub const MENU: u16 = 0x12;
    pub const PAUSE: u16 = 0x13;
    pub const LEFT: u16 = 0x25;
    pub const SNAPSHOT: u16 = 0x2C;
    pub const DIVIDE: u16 = 0x6F;
    pub const NUMLOCK: u16 = 0x90;
    /// Sent for the escaped half of multi-byte sequences; never a real key.
    pub const FAKE: u16 = 0xFF;
}

/// Maps a virtual-key code to its scan code the way
/// `MapVirtualKeyW(_, MAPVK_VK_TO_VSC_EX)` does: extended keys carry a
/// `0xE0` (or `0xE1`) prefix in the high byte, and `0` means "no mapping".
pub trait VirtualKeyMapper {
    fn scan_code(&self, virtual_key: u16) -> u16;
}

impl<F> VirtualKeyMapper for F
where
    F: Fn(u16) -> u16,
{
    fn scan_code(&self, virtual_key: u16) -> u16 {
        self(virtual_key)
    }
}

/// A fixed mapping for the US (00000409) keyboard layout, used where no OS
/// mapping function is available.
#[derive(Clone, Copy, Debug, Default)]
pub struct UsLayout;

impl VirtualKeyMapper for UsLayout {
    fn scan_code(&self, virtual_key: u16) -> u16 {
        us_scan_code(virtual_key)
    }
}

const fn us_scan_code(virtual_key: u16) -> u16 {
    match virtual_key {
        0x08 => 0x0E,
        0x09 => 0x0F,
        0x0D => 0x1C,
        0x10 | 0xA0 => 0x2A,
        0x11 | 0xA2 => 0x1D,
        0x12 | 0xA4 => 0x38,
        0x13 => 0xE11D,
        0x14 => 0x3A,
        0x15 => 0x70,
        0x1B => 0x01,
        0x1C => 0x79,
        0x1D => 0x7B,
        0x20 => 0x39,
        0x21 => 0xE049,
        0x22 => 0xE051,
        0x23 => 0xE04F,
        0x24 => 0xE047,
        0x25 => 0xE04B,
        0x26 => 0xE048,
        0x27 => 0xE04D,
        0x28 => 0xE050,
        0x2C => 0x54,
        0x2D => 0xE052,
        0x2E => 0xE053,
        0x30 => 0x0B,
        0x31..=0x39 => virtual_key - 0x31 + 0x02,
        0x41 => 0x1E,
        0x42 => 0x30,
        0x43 => 0x2E,
        0x44 => 0x20,
        0x45 => 0x12,
        0x46 => 0x21,
        0x47 => 0x22,
        0x48 => 0x23,
        0x49 => 0x17,
        0x4A => 0x24,
        0x4B => 0x25,
        0x4C => 0x26,
        0x4D => 0x32,
        0x4E => 0x31,
        0x4F => 0x18,
        0x50 => 0x19,
        0x51 => 0x10,
        0x52 => 0x13,
        0x53 => 0x1F,
        0x54 => 0x14,
        0x55 => 0x16,
        0x56 => 0x2F,
        0x57 => 0x11,
        0x58 => 0x2D,
        0x59 => 0x15,
        0x5A => 0x2C,
        0x5B => 0xE05B,
        0x5C => 0xE05C,
        0x5D => 0xE05D,
        0x5F => 0xE05F,
        0x60 => 0x52,
        0x61 => 0x4F,
        0x62 => 0x50,
        0x63 => 0x51,
        0x64 => 0x4B,
        0x65 => 0x4C,
        0x66 => 0x4D,
        0x67 => 0x47,
        0x68 => 0x48,
        0x69 => 0x49,
        0x6A => 0x37,
        0x6B => 0x4E,
        0x6D => 0x4A,
        0x6E => 0x53,
        0x6F => 0xE035,
        0x70..=0x79 => virtual_key - 0x70 + 0x3B,
        0x7A => 0x57,
        0x7B => 0x58,
        0x7C..=0x86 => virtual_key - 0x7C + 0x64,
        0x87 => 0x76,
        0x90 => 0xE045,
        0x91 => 0x46,
        0xA1 => 0x36,
        0xA3 => 0xE01D,
        0xA5 => 0xE038,
        0xA6 => 0xE06A,
        0xA7 => 0xE069,
        0xA8 => 0xE067,
        0xA9 => 0xE068,
        0xAA => 0xE065,
        0xAB => 0xE066,
        0xAC => 0xE032,
        0xAD => 0xE020,
        0xAE => 0xE02E,
        0xAF => 0xE030,
        0xB0 => 0xE019,
        0xB1 => 0xE010,
        0xB2 => 0xE024,
        0xB3 => 0xE022,
        0xB4 => 0xE06C,
        0xB5 => 0xE06D,
        0xB6 => 0xE06B,
        0xB7 => 0xE021,
        0xBA => 0x27,
        0xBB => 0x0D,
        0xBC => 0x33,
        0xBD => 0x0C,
        0xBE => 0x34,
        0xBF => 0x35,
        0xC0 => 0x29,
        0xC1 => 0x73,
        0xC2 => 0x7E,
        0xDB => 0x1A,
        0xDC => 0x2B,
        0xDD => 0x1B,
        0xDE => 0x28,
        0xE2 => 0x56,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_layout_digits_and_function_keys() {
        assert_eq!(UsLayout.scan_code(0x30), 0x0B);
        assert_eq!(UsLayout.scan_code(0x31), 0x02);
        assert_eq!(UsLayout.scan_code(0x39), 0x0A);
        assert_eq!(UsLayout.scan_code(0x70), 0x3B);
        assert_eq!(UsLayout.scan_code(0x79), 0x44);
        assert_eq!(UsLayout.scan_code(0x7C), 0x64);
        assert_eq!(UsLayout.scan_code(0x86), 0x6E);
    }

    #[test]
    fn test_us_layout_generic_modifiers_are_left_side() {
        assert_eq!(UsLayout.scan_code(vk::SHIFT), 0x2A);
        assert_eq!(UsLayout.scan_code(vk::CONTROL), 0x1D);
        assert_eq!(UsLayout.scan_code(vk::MENU), 0x38);
    }

    #[test]
    fn test_unmapped_is_zero() {
        assert_eq!(UsLayout.scan_code(0x0A), 0);
        assert_eq!(UsLayout.scan_code(vk::FAKE), 0);
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |vk: u16| vk + 1;
        assert_eq!(mapper.scan_code(1), 2);
    }
}
