//! The device kinds a [`DeviceRegistry`](super::DeviceRegistry) can track.

use crate::{
    input::{keyboard::KeyboardState, mouse::MouseState},
    types::{DeviceType, HidUsage},
};

/// Per-device state which can be combined into an aggregate.
pub trait DeviceState: Clone + Default + Send + 'static {
    fn is_connected(&self) -> bool;
    fn set_connected(&mut self, connected: bool);
    /// Folds `other` into `self` to build an aggregate snapshot.
    fn merge(&mut self, other: &Self);
}

impl DeviceState for KeyboardState {
    fn is_connected(&self) -> bool {
        KeyboardState::is_connected(self)
    }

    fn set_connected(&mut self, connected: bool) {
        KeyboardState::set_connected(self, connected)
    }

    fn merge(&mut self, other: &Self) {
        KeyboardState::merge(self, other)
    }
}

impl DeviceState for MouseState {
    fn is_connected(&self) -> bool {
        MouseState::is_connected(self)
    }

    fn set_connected(&mut self, connected: bool) {
        MouseState::set_connected(self, connected)
    }

    fn merge(&mut self, other: &Self) {
        MouseState::merge(self, other)
    }
}

/// A kind of device tracked by its own registry.
pub trait DeviceKind: Send + Sync + 'static {
    type State: DeviceState;

    /// The enumerated type which identifies this kind directly.
    const DEVICE_TYPE: DeviceType;
    /// The setup class name devices of this kind are installed under.
    const CLASS_NAME: &'static str;
    /// The top-level collection raw input is requested for.
    const USAGE: HidUsage;
}

/// Keyboards, tracked as [`KeyboardState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct KeyboardDevice;

impl DeviceKind for KeyboardDevice {
    type State = KeyboardState;

    const DEVICE_TYPE: DeviceType = DeviceType::Keyboard;
    const CLASS_NAME: &'static str = "keyboard";
    const USAGE: HidUsage = HidUsage::KEYBOARD;
}

/// Mice, tracked as [`MouseState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct MouseDevice;

impl DeviceKind for MouseDevice {
    type State = MouseState;

    const DEVICE_TYPE: DeviceType = DeviceType::Mouse;
    const CLASS_NAME: &'static str = "mouse";
    const USAGE: HidUsage = HidUsage::MOUSE;
}
