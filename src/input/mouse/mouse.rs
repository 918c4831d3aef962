//! Per-device and aggregate mouse state.

use ::strum::{EnumCount, IntoEnumIterator};
use ::tracing::trace;

use super::{button_flags, RawMouse, WHEEL_DELTA};
use crate::types::Point;

/// The logical buttons tracked for a mouse.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    ::strum::Display,
    ::strum::EnumIter,
    ::strum::EnumCount,
)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Mouse4,
    Mouse5,
}

impl MouseButton {
    /// The `(down, up)` raw input transition flags of the button.
    const fn transition_flags(self) -> (u16, u16) {
        match self {
            Self::Left => (
                button_flags::LEFT_BUTTON_DOWN,
                button_flags::LEFT_BUTTON_UP,
            ),
            Self::Right => (
                button_flags::RIGHT_BUTTON_DOWN,
                button_flags::RIGHT_BUTTON_UP,
            ),
            Self::Middle => (
                button_flags::MIDDLE_BUTTON_DOWN,
                button_flags::MIDDLE_BUTTON_UP,
            ),
            Self::Mouse4 => (button_flags::BUTTON_4_DOWN, button_flags::BUTTON_4_UP),
            Self::Mouse5 => (button_flags::BUTTON_5_DOWN, button_flags::BUTTON_5_UP),
        }
    }
}

/// Button, wheel and position state of one mouse, or the merged state of
/// several mice.
///
/// Wheel values are accumulated for the lifetime of the device in notches
/// (one notch is 120 raw units), so fractional values occur with
/// high-resolution wheels. Callers interested in scrolling should compare
/// successive snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MouseState {
    buttons: [bool; MouseButton::COUNT],
    wheel: f32,
    horizontal_wheel: f32,
    motion: (i64, i64),
    position: Point,
    connected: bool,
}

impl MouseState {
    /// Constructs a disconnected mouse with no buttons pressed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a raw mouse payload to the state.
    ///
    /// `cursor` is the OS cursor position at the time of the event, recorded
    /// as the last known position when available. Returns `true` as every
    /// mouse payload is applied.
    pub fn process_input_data(&mut self, data: &RawMouse, cursor: Option<Point>) -> bool {
        for button in MouseButton::iter() {
            let (down, up) = button.transition_flags();
            if data.button_flags & down != 0 {
                self.buttons[button as usize] = true;
            }
            if data.button_flags & up != 0 {
                self.buttons[button as usize] = false;
            }
        }

        if let Some(delta) = data.wheel_delta() {
            self.wheel += f32::from(delta) / WHEEL_DELTA;
        }
        if let Some(delta) = data.horizontal_wheel_delta() {
            self.horizontal_wheel += f32::from(delta) / WHEEL_DELTA;
        }
        if data.is_relative() {
            self.motion.0 += i64::from(data.last_x);
            self.motion.1 += i64::from(data.last_y);
        }
        if let Some(cursor) = cursor {
            self.position = cursor;
        }

        trace!(
            button_flags = format_args!("{:#06x}", data.button_flags),
            wheel = self.wheel,
            "Mouse input"
        );
        true
    }

    /// Returns `true` if the given button is currently pressed.
    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.buttons[button as usize]
    }

    /// Accumulated vertical wheel motion, in notches. Positive values are
    /// away from the user.
    pub fn wheel(&self) -> f32 {
        self.wheel
    }

    /// Accumulated horizontal wheel motion, in notches. Positive values are
    /// to the right.
    pub fn horizontal_wheel(&self) -> f32 {
        self.horizontal_wheel
    }

    /// Accumulated relative motion, in raw device counts.
    pub fn motion(&self) -> (i64, i64) {
        self.motion
    }

    /// Last known cursor position in screen coordinates. For a snapshot
    /// returned by [`InputManager::mouse_state`] this is the live OS cursor
    /// position.
    ///
    /// [`InputManager::mouse_state`]: crate::InputManager::mouse_state
    pub fn position(&self) -> Point {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Point) {
        self.position = position;
    }

    /// Whether the mouse is currently attached. For a merged state, whether
    /// any tracked mouse is attached.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Merges another mouse into this one. Buttons and the connected flag are
    /// OR-ed, wheel and motion are summed, and the position of `other`
    /// replaces this one's when `other` is connected.
    pub fn merge(&mut self, other: &Self) {
        for (mine, theirs) in self.buttons.iter_mut().zip(other.buttons) {
            *mine |= theirs;
        }
        self.wheel += other.wheel;
        self.horizontal_wheel += other.horizontal_wheel;
        self.motion.0 += other.motion.0;
        self.motion.1 += other.motion.1;
        if other.connected {
            self.position = other.position;
        }
        self.connected |= other.connected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    fn buttons(flags: u16) -> RawMouse {
        RawMouse {
            button_flags: flags,
            ..Default::default()
        }
    }

    fn wheel(delta: i16) -> RawMouse {
        RawMouse {
            button_flags: button_flags::WHEEL,
            button_data: delta as u16,
            ..Default::default()
        }
    }

    #[test]
    fn test_button_down_up() {
        let mut mouse = MouseState::new();

        assert!(mouse.process_input_data(&buttons(button_flags::LEFT_BUTTON_DOWN), None));
        assert!(mouse.is_button_pressed(MouseButton::Left));
        assert!(!mouse.is_button_pressed(MouseButton::Right));

        mouse.process_input_data(&buttons(button_flags::LEFT_BUTTON_UP), None);
        assert!(!mouse.is_button_pressed(MouseButton::Left));
    }

    #[test]
    fn test_all_buttons() {
        let mut mouse = MouseState::new();

        mouse.process_input_data(
            &buttons(
                button_flags::RIGHT_BUTTON_DOWN
                    | button_flags::MIDDLE_BUTTON_DOWN
                    | button_flags::BUTTON_4_DOWN
                    | button_flags::BUTTON_5_DOWN,
            ),
            None,
        );
        for button in MouseButton::iter() {
            assert_eq!(
                mouse.is_button_pressed(button),
                button != MouseButton::Left,
                "{button}"
            );
        }
    }

    #[test]
    fn test_wheel_nets_to_zero() {
        let mut mouse = MouseState::new();

        mouse.process_input_data(&wheel(120), None);
        assert_eq!(mouse.wheel(), 1.0);
        mouse.process_input_data(&wheel(-120), None);
        assert_eq!(mouse.wheel(), 0.0);
    }

    #[test]
    fn test_fractional_wheel() {
        let mut mouse = MouseState::new();

        mouse.process_input_data(&wheel(30), None);
        assert_eq!(mouse.wheel(), 0.25);
    }

    #[test]
    fn test_horizontal_wheel_is_separate() {
        let mut mouse = MouseState::new();

        mouse.process_input_data(
            &RawMouse {
                button_flags: button_flags::HWHEEL,
                button_data: (-240_i16) as u16,
                ..Default::default()
            },
            None,
        );
        assert_eq!(mouse.horizontal_wheel(), -2.0);
        assert_eq!(mouse.wheel(), 0.0);
    }

    #[test]
    fn test_relative_motion_and_position() {
        let mut mouse = MouseState::new();

        let moved = RawMouse {
            last_x: 5,
            last_y: -3,
            ..Default::default()
        };
        mouse.process_input_data(&moved, Some(Point::new(100, 200)));
        mouse.process_input_data(&moved, None);
        assert_eq!(mouse.motion(), (10, -6));
        assert_eq!(mouse.position(), Point::new(100, 200));
    }

    #[test]
    fn test_absolute_motion_not_accumulated() {
        let mut mouse = MouseState::new();

        mouse.process_input_data(
            &RawMouse {
                flags: super::super::MOUSE_MOVE_ABSOLUTE,
                last_x: 30000,
                last_y: 30000,
                ..Default::default()
            },
            None,
        );
        assert_eq!(mouse.motion(), (0, 0));
    }

    #[test]
    fn test_merge() {
        let mut first = MouseState::new();
        first.process_input_data(&buttons(button_flags::LEFT_BUTTON_DOWN), None);
        first.process_input_data(&wheel(120), None);
        first.set_connected(true);

        let mut second = MouseState::new();
        second.process_input_data(&buttons(button_flags::MIDDLE_BUTTON_DOWN), None);
        second.process_input_data(&wheel(240), None);

        let mut merged = MouseState::new();
        merged.merge(&first);
        merged.merge(&second);

        assert!(merged.is_button_pressed(MouseButton::Left));
        assert!(merged.is_button_pressed(MouseButton::Middle));
        assert!(!merged.is_button_pressed(MouseButton::Right));
        assert_eq!(merged.wheel(), 3.0);
        assert!(merged.is_connected());
    }
}
