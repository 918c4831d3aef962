//! Layout-independent key identifiers.

/// An abstract, layout-independent keyboard key. Each variant names a
/// physical key position rather than the character it produces.
///
/// Keys which exist in left/right pairs are distinguished ([`LeftShift`] vs
/// [`RightShift`], etc). Numeric keypad keys are distinct from their
/// navigation-cluster counterparts.
///
/// [`LeftShift`]: Key::LeftShift
/// [`RightShift`]: Key::RightShift
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    ::strum::Display,
    ::strum::EnumIter,
    ::strum::EnumCount,
    ::strum::IntoStaticStr,
)]
#[repr(u8)]
pub enum Key {
    /// A key for which no mapping exists.
    Unknown = 0,

    Escape,
    Tab,
    CapsLock,
    Space,
    Enter,
    Backspace,
    PrintScreen,
    ScrollLock,
    Pause,
    NumLock,

    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
    LeftWindows,
    RightWindows,
    Applications,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,

    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    D8,
    D9,

    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    /// The `` ` `` / `~` key left of `1` on US layouts.
    Grave,
    Minus,
    Equals,
    LeftBracket,
    RightBracket,
    Backslash,
    Semicolon,
    Apostrophe,
    Comma,
    Period,
    Slash,
    /// The additional key between left shift and `Z` on ISO keyboards.
    Oem102,

    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,

    Numpad0,
    Numpad1,
    Numpad2,
    Numpad3,
    Numpad4,
    Numpad5,
    Numpad6,
    Numpad7,
    Numpad8,
    Numpad9,
    NumpadAdd,
    NumpadSubtract,
    NumpadMultiply,
    NumpadDivide,
    NumpadDecimal,
    NumpadEnter,
    NumpadEquals,

    VolumeMute,
    VolumeDown,
    VolumeUp,
    MediaNext,
    MediaPrevious,
    MediaStop,
    MediaPlayPause,
    LaunchMail,
    LaunchMediaSelect,
    LaunchApp1,
    LaunchApp2,
    BrowserBack,
    BrowserForward,
    BrowserRefresh,
    BrowserStop,
    BrowserSearch,
    BrowserFavorites,
    BrowserHome,

    Power,
    Sleep,
    Wake,

    Kana,
    Convert,
    NoConvert,
    Yen,
    AbntC1,
    AbntC2,
}

impl Key {
    /// The numeric slot of the key, suitable for indexing dense key-state
    /// storage.
    pub const fn value(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn test_values_are_dense_and_unique() {
        for (expected, key) in Key::iter().enumerate() {
            assert_eq!(key.value() as usize, expected, "{key:?} out of place");
        }
        assert!(Key::COUNT <= u8::MAX as usize);
    }

    #[test]
    fn test_display_uses_variant_name() {
        assert_eq!(Key::NumpadEnter.to_string(), "NumpadEnter");
        let name: &'static str = Key::RightShift.into();
        assert_eq!(name, "RightShift");
    }
}
