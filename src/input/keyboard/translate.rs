//! Translation of raw keyboard scan codes into layout-independent [`Key`]s.
//!
//! Raw input reports a hardware make code, an `E0` "extended" flag and a
//! virtual-key code. The virtual key is the most reliable of the three, so the
//! scan code is re-derived from it through the active [`VirtualKeyMapper`],
//! combined with the extended flag and looked up in a fixed table. Two
//! hardware quirks are corrected after the lookup:
//!
//! 1. The table has a single entry for each of the `Alt` and `Control`
//!    families. An extended event for either is the right-hand key.
//! 2. The OS never sets the extended flag for the right `Shift` key, and
//!    reports it with the generic shift virtual key. The raw make code `54`
//!    (`0x36`) is the only thing distinguishing it.

use ::lazy_static::lazy_static;
use ::std::collections::HashMap;
use ::tracing::warn;

use super::{Key, VirtualKeyMapper};

/// Extended-key prefix combined into the high byte of a scan code.
pub const EXTENDED_PREFIX: u16 = 0xE000;

/// Raw make code of the right shift key.
pub const RIGHT_SHIFT_MAKE_CODE: u16 = 54;

/// Value returned by [`extended_scan_code`] for [`Key::RightShift`]. This is
/// not a hardware scan code: the right shift key only exists as a software
/// distinction, so callers which need to synthesize it must special-case this
/// value.
pub const RIGHT_SHIFT_SENTINEL: u16 = 0xFFFF;

/// Extended scan code → key. Order matters for the reverse lookup: the first
/// code listed for a key is the one [`extended_scan_code`] returns.
const SCAN_CODES: &[(u16, Key)] = &[
    (0x0001, Key::Escape),
    (0x0002, Key::D1),
    (0x0003, Key::D2),
    (0x0004, Key::D3),
    (0x0005, Key::D4),
    (0x0006, Key::D5),
    (0x0007, Key::D6),
    (0x0008, Key::D7),
    (0x0009, Key::D8),
    (0x000A, Key::D9),
    (0x000B, Key::D0),
    (0x000C, Key::Minus),
    (0x000D, Key::Equals),
    (0x000E, Key::Backspace),
    (0x000F, Key::Tab),
    (0x0010, Key::Q),
    (0x0011, Key::W),
    (0x0012, Key::E),
    (0x0013, Key::R),
    (0x0014, Key::T),
    (0x0015, Key::Y),
    (0x0016, Key::U),
    (0x0017, Key::I),
    (0x0018, Key::O),
    (0x0019, Key::P),
    (0x001A, Key::LeftBracket),
    (0x001B, Key::RightBracket),
    (0x001C, Key::Enter),
    (0x001D, Key::LeftControl),
    (0x001E, Key::A),
    (0x001F, Key::S),
    (0x0020, Key::D),
    (0x0021, Key::F),
    (0x0022, Key::G),
    (0x0023, Key::H),
    (0x0024, Key::J),
    (0x0025, Key::K),
    (0x0026, Key::L),
    (0x0027, Key::Semicolon),
    (0x0028, Key::Apostrophe),
    (0x0029, Key::Grave),
    (0x002A, Key::LeftShift),
    (0x002B, Key::Backslash),
    (0x002C, Key::Z),
    (0x002D, Key::X),
    (0x002E, Key::C),
    (0x002F, Key::V),
    (0x0030, Key::B),
    (0x0031, Key::N),
    (0x0032, Key::M),
    (0x0033, Key::Comma),
    (0x0034, Key::Period),
    (0x0035, Key::Slash),
    (0x0037, Key::NumpadMultiply),
    (0x0038, Key::LeftAlt),
    (0x0039, Key::Space),
    (0x003A, Key::CapsLock),
    (0x003B, Key::F1),
    (0x003C, Key::F2),
    (0x003D, Key::F3),
    (0x003E, Key::F4),
    (0x003F, Key::F5),
    (0x0040, Key::F6),
    (0x0041, Key::F7),
    (0x0042, Key::F8),
    (0x0043, Key::F9),
    (0x0044, Key::F10),
    (0x0045, Key::NumLock),
    (0x0046, Key::ScrollLock),
    (0x0047, Key::Numpad7),
    (0x0048, Key::Numpad8),
    (0x0049, Key::Numpad9),
    (0x004A, Key::NumpadSubtract),
    (0x004B, Key::Numpad4),
    (0x004C, Key::Numpad5),
    (0x004D, Key::Numpad6),
    (0x004E, Key::NumpadAdd),
    (0x004F, Key::Numpad1),
    (0x0050, Key::Numpad2),
    (0x0051, Key::Numpad3),
    (0x0052, Key::Numpad0),
    (0x0053, Key::NumpadDecimal),
    (0x0056, Key::Oem102),
    (0x0057, Key::F11),
    (0x0058, Key::F12),
    (0x0059, Key::NumpadEquals),
    (0x0064, Key::F13),
    (0x0065, Key::F14),
    (0x0066, Key::F15),
    (0x0067, Key::F16),
    (0x0068, Key::F17),
    (0x0069, Key::F18),
    (0x006A, Key::F19),
    (0x006B, Key::F20),
    (0x006C, Key::F21),
    (0x006D, Key::F22),
    (0x006E, Key::F23),
    (0x0070, Key::Kana),
    (0x0073, Key::AbntC1),
    (0x0076, Key::F24),
    (0x0079, Key::Convert),
    (0x007B, Key::NoConvert),
    (0x007D, Key::Yen),
    (0x007E, Key::AbntC2),
    (0xE010, Key::MediaPrevious),
    (0xE019, Key::MediaNext),
    (0xE01C, Key::NumpadEnter),
    // Control and Alt families; sides are resolved after lookup.
    (0xE01D, Key::LeftControl),
    (0xE020, Key::VolumeMute),
    (0xE021, Key::LaunchApp2),
    (0xE022, Key::MediaPlayPause),
    (0xE024, Key::MediaStop),
    (0xE02E, Key::VolumeDown),
    (0xE030, Key::VolumeUp),
    (0xE032, Key::BrowserHome),
    (0xE035, Key::NumpadDivide),
    // PrintScreen is reported differently depending on the keyboard: E0 37 on
    // most, 54 (the Alt+SysRq code) on layouts which map VK_SNAPSHOT there,
    // and E0 54 when that code arrives with the extended flag.
    (0xE037, Key::PrintScreen),
    (0x0054, Key::PrintScreen),
    (0xE054, Key::PrintScreen),
    (0xE038, Key::LeftAlt),
    (0xE045, Key::NumLock),
    // Ctrl+Break
    (0xE046, Key::Pause),
    (0xE047, Key::Home),
    (0xE048, Key::Up),
    (0xE049, Key::PageUp),
    (0xE04B, Key::Left),
    (0xE04D, Key::Right),
    (0xE04F, Key::End),
    (0xE050, Key::Down),
    (0xE051, Key::PageDown),
    (0xE052, Key::Insert),
    (0xE053, Key::Delete),
    (0xE05B, Key::LeftWindows),
    (0xE05C, Key::RightWindows),
    (0xE05D, Key::Applications),
    (0xE05E, Key::Power),
    (0xE05F, Key::Sleep),
    (0xE063, Key::Wake),
    (0xE065, Key::BrowserSearch),
    (0xE066, Key::BrowserFavorites),
    (0xE067, Key::BrowserRefresh),
    (0xE068, Key::BrowserStop),
    (0xE069, Key::BrowserForward),
    (0xE06A, Key::BrowserBack),
    (0xE06B, Key::LaunchApp1),
    (0xE06C, Key::LaunchMail),
    (0xE06D, Key::LaunchMediaSelect),
    (0xE11D, Key::Pause),
];

lazy_static! {
    static ref KEYS_BY_SCAN_CODE: HashMap<u16, Key> = SCAN_CODES.iter().copied().collect();
    static ref SCAN_CODES_BY_KEY: HashMap<Key, u16> = {
        let mut map = HashMap::with_capacity(SCAN_CODES.len());
        for &(code, key) in SCAN_CODES {
            map.entry(key).or_insert(code);
        }
        map.insert(Key::RightShift, RIGHT_SHIFT_SENTINEL);
        map.insert(Key::RightControl, EXTENDED_PREFIX | 0x1D);
        map.insert(Key::RightAlt, EXTENDED_PREFIX | 0x38);
        map
    };
}

/// Translates a raw keyboard event into a [`Key`].
///
/// `scancode` is the raw make code from the event, `virtual_key` the reported
/// virtual key and `extended0` whether the `E0` flag was set. The result
/// depends only on these inputs and the mapper, never on prior events.
///
/// Codes missing from the table are logged and returned as [`Key::Unknown`].
pub fn translate_key<M>(mapper: &M, scancode: u16, virtual_key: u16, extended0: bool) -> Key
where
    M: VirtualKeyMapper + ?Sized,
{
    let mut code = mapper.scan_code(virtual_key);
    if extended0 {
        code |= EXTENDED_PREFIX;
    }

    let Some(&key) = KEYS_BY_SCAN_CODE.get(&code) else {
        warn!(
            scancode,
            virtual_key,
            extended0,
            extended_scan_code = format_args!("{code:#06x}"),
            "Unknown scan code"
        );
        return Key::Unknown;
    };

    match key {
        Key::LeftAlt if extended0 => Key::RightAlt,
        Key::LeftControl if extended0 => Key::RightControl,
        Key::LeftShift if scancode == RIGHT_SHIFT_MAKE_CODE => Key::RightShift,
        _ => key,
    }
}

/// Returns the extended scan code of `key`, the inverse of [`translate_key`].
///
/// Keys with several codes return the first one listed (`0xE037` for
/// [`Key::PrintScreen`]). [`Key::RightShift`] returns
/// [`RIGHT_SHIFT_SENTINEL`]. [`Key::Unknown`] has no code.
pub fn extended_scan_code(key: Key) -> Option<u16> {
    SCAN_CODES_BY_KEY.get(&key).copied()
}
