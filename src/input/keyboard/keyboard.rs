//! Per-device and aggregate keyboard state.

use ::bitvec::prelude::*;
use ::tracing::trace;

use super::{translate_key, vk, Key, KeyTransition, RawKeyboard, VirtualKeyMapper};

/// The pressed state of every [`Key`] on one keyboard, or the merged state of
/// several keyboards.
///
/// # Key Pressed Tracking
///
/// Raw input reports individual key transitions as they happen on the input
/// thread. Most applications aren't prepared to handle the key events
/// immediately as they come in. A typical game loop has a well-defined
/// location in an update loop where key state is looked at and appropriate
/// actions are taken for the next render loop. [`KeyboardState`] keeps a
/// persistent view of which keys are down so it can be polled at any time.
///
/// # Example
///
/// ```
/// use ::rawpoll::input::keyboard::{Key, KeyboardState};
///
/// let state = KeyboardState::new();
/// assert!(!state.is_key_pressed(Key::Left));
/// assert!(!state.is_connected());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct KeyboardState {
    /// Bitfield which tracks the press state for the keyboard keys.
    pressed: BitArr!(for 256, in usize, Lsb0),
    connected: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl ::std::fmt::Debug for KeyboardState {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.debug_struct("KeyboardState")
            .field("pressed", &self.pressed_keys().collect::<Vec<_>>())
            .field("connected", &self.connected)
            .finish()
    }
}

impl KeyboardState {
    /// Constructs a disconnected keyboard with no keys pressed.
    pub fn new() -> Self {
        Self {
            pressed: BitArray::ZERO,
            connected: false,
        }
    }

    /// Applies a raw keyboard payload to the state.
    ///
    /// Returns `true` if the payload was a key press or release and the state
    /// was updated, `false` if the payload was ignored (fake keys, messages
    /// other than key up/down).
    pub fn process_input_data<M>(&mut self, data: &RawKeyboard, mapper: &M) -> bool
    where
        M: VirtualKeyMapper + ?Sized,
    {
        if data.virtual_key == vk::FAKE {
            return false;
        }
        let Some(transition) = data.transition() else {
            return false;
        };

        let key = translate_key(
            mapper,
            data.make_code,
            data.virtual_key,
            data.flags.extended0,
        );
        trace!(?key, ?transition, "Keyboard input");
        self.set_key_pressed(key, transition == KeyTransition::Pressed);
        true
    }

    /// Returns `true` if the given key is currently pressed, otherwise `false`.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed[key.value() as usize]
    }

    /// Sets the pressed state of a single key.
    pub fn set_key_pressed(&mut self, key: Key, pressed: bool) {
        self.pressed.set(key.value() as usize, pressed);
    }

    /// Iterates all keys currently pressed.
    pub fn pressed_keys(&self) -> impl Iterator<Item = Key> + '_ {
        use ::strum::IntoEnumIterator;
        Key::iter().filter(|key| self.is_key_pressed(*key))
    }

    /// Whether the keyboard is currently attached. For a merged state, whether
    /// any tracked keyboard is attached.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Merges another keyboard into this one: a key is pressed if it is
    /// pressed on either, and the result is connected if either is.
    pub fn merge(&mut self, other: &Self) {
        for idx in other.pressed.iter_ones() {
            self.pressed.set(idx, true);
        }
        self.connected |= other.connected;
    }

    /// Reset all keyboard state.
    pub fn reset(&mut self) {
        self.pressed = BitArray::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keyboard::{RawKeyFlags, UsLayout, WM_KEYDOWN, WM_KEYUP};

    use ::pretty_assertions::assert_eq;
    use ::std::ops::Not;
    use ::strum::IntoEnumIterator;

    fn key_event(message: u32, make_code: u16, virtual_key: u16, flags: u16) -> RawKeyboard {
        RawKeyboard {
            make_code,
            flags: RawKeyFlags::from(flags),
            virtual_key,
            message,
            extra_information: 0,
        }
    }

    /// Pressing 'a' without any modifiers.
    #[test]
    fn test_key_down() {
        let mut kbd = KeyboardState::new();

        assert!(kbd.process_input_data(&key_event(WM_KEYDOWN, 30, 0x41, 0), &UsLayout));
        assert!(kbd.is_key_pressed(Key::A));
        assert_eq!(kbd.pressed_keys().collect::<Vec<_>>(), vec![Key::A]);
    }

    #[test]
    fn test_key_down_then_up() {
        let mut kbd = KeyboardState::new();

        kbd.process_input_data(&key_event(WM_KEYDOWN, 30, 0x41, 0), &UsLayout);
        assert!(kbd.process_input_data(&key_event(WM_KEYUP, 30, 0x41, 1), &UsLayout));
        assert!(!kbd.is_key_pressed(Key::A));
    }

    /// Tests correct handling of a series of key down and key up events,
    /// including auto-repeat.
    #[test]
    fn test_key_pressed_sequence() {
        let mut kbd = KeyboardState::new();

        for key in Key::iter() {
            assert!(!kbd.is_key_pressed(key));
        }

        for evt in [
            key_event(WM_KEYDOWN, 0x1E, 0x41, 0),
            key_event(WM_KEYDOWN, 0x4B, 0x25, 2),
            key_event(WM_KEYDOWN, 0x39, 0x20, 0),
            key_event(WM_KEYDOWN, 0x4B, 0x25, 2),
            key_event(WM_KEYUP, 0x1E, 0x41, 1),
            key_event(WM_KEYDOWN, 0x4B, 0x25, 2),
        ] {
            kbd.process_input_data(&evt, &UsLayout);
        }

        let expected_pressed = [Key::Space, Key::Left];
        for key in expected_pressed {
            assert!(kbd.is_key_pressed(key));
        }
        for key in Key::iter().filter(|key| expected_pressed.contains(key).not()) {
            assert!(!kbd.is_key_pressed(key), "{key:?} unexpectedly pressed");
        }
    }

    /// Both control keys are reported with `VK_CONTROL`; only the E0 flag
    /// tells them apart.
    #[test]
    fn test_left_and_right_control() {
        let mut kbd = KeyboardState::new();

        kbd.process_input_data(&key_event(WM_KEYDOWN, 0x1D, vk::CONTROL, 2), &UsLayout);
        assert!(kbd.is_key_pressed(Key::RightControl));
        assert!(!kbd.is_key_pressed(Key::LeftControl));

        kbd.process_input_data(&key_event(WM_KEYDOWN, 0x1D, vk::CONTROL, 0), &UsLayout);
        kbd.process_input_data(&key_event(WM_KEYUP, 0x1D, vk::CONTROL, 3), &UsLayout);
        assert!(!kbd.is_key_pressed(Key::RightControl));
        assert!(kbd.is_key_pressed(Key::LeftControl));
    }

    #[test]
    fn test_right_shift() {
        let mut kbd = KeyboardState::new();

        kbd.process_input_data(&key_event(WM_KEYDOWN, 54, vk::SHIFT, 0), &UsLayout);
        assert!(kbd.is_key_pressed(Key::RightShift));
        assert!(!kbd.is_key_pressed(Key::LeftShift));
    }

    /// The escaped half of a pause sequence arrives with the fake virtual key
    /// and must not register a key.
    #[test]
    fn test_fake_key_ignored() {
        let mut kbd = KeyboardState::new();

        assert!(!kbd.process_input_data(&key_event(WM_KEYDOWN, 0x2A, vk::FAKE, 2), &UsLayout));
        assert_eq!(kbd.pressed_keys().count(), 0);
    }

    #[test]
    fn test_non_key_message_ignored() {
        let mut kbd = KeyboardState::new();

        assert!(!kbd.process_input_data(&key_event(0x0102, 30, 0x41, 0), &UsLayout));
        assert!(!kbd.is_key_pressed(Key::A));
    }

    #[test]
    fn test_merge_is_logical_or() {
        let mut first = KeyboardState::new();
        first.set_key_pressed(Key::A, true);
        first.set_connected(true);

        let mut second = KeyboardState::new();
        second.set_key_pressed(Key::B, true);

        let mut merged = KeyboardState::new();
        merged.merge(&first);
        merged.merge(&second);

        assert!(merged.is_key_pressed(Key::A));
        assert!(merged.is_key_pressed(Key::B));
        assert!(!merged.is_key_pressed(Key::C));
        assert!(merged.is_connected());
    }

    #[test]
    fn test_reset() {
        let mut kbd = KeyboardState::new();
        kbd.set_key_pressed(Key::Escape, true);
        kbd.set_connected(true);
        kbd.reset();
        assert_eq!(kbd.pressed_keys().count(), 0);
        assert!(kbd.is_connected());
    }
}
