//! Capability traits over the OS input service.
//!
//! Everything the device registries and the input manager need from the
//! operating system is reached through these traits, so the whole pipeline
//! can run against the in-memory [`mock`] backend as well as the Win32 one.

use crate::{
    devices::DeviceInstanceId,
    errors::Result,
    input::{keyboard::VirtualKeyMapper, RawInput},
    types::{DeviceHandle, DeviceType, HidUsage, Point, WindowHandle},
};

mod dispatch;
pub mod mock;
#[cfg(windows)]
pub mod win32;

pub(crate) use dispatch::Dispatcher;

/// One entry of the raw input device list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDeviceInfo {
    pub handle: DeviceHandle,
    pub device_type: DeviceType,
}

/// The raw values stored for a device in the configuration tree. Strings are
/// returned exactly as stored; no value is required to be present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceConfiguration {
    /// `DeviceDesc`, typically `@<inf>,%<token>%;<friendly name>`.
    pub description: Option<String>,
    /// `Class`, e.g. `Keyboard`.
    pub class: Option<String>,
    /// `ClassGUID`, e.g. `{4d36e96b-e325-11ce-bfc1-08002be10318}`.
    pub class_guid: Option<String>,
}

/// Device discovery and raw input registration.
pub trait DeviceSource: Send + Sync {
    /// Lists every raw input device currently attached.
    fn enumerate_devices(&self) -> Result<Vec<RawDeviceInfo>>;

    /// The device interface path of a device, e.g.
    /// `\\?\HID#VID_046D&PID_C52B&MI_00#7&2a6fb1f&0&0000#{884b96c3-...}`.
    fn device_name(&self, device: DeviceHandle) -> Result<String>;

    /// Looks up the configuration tree entry of a device instance.
    fn device_configuration(&self, instance: &DeviceInstanceId) -> Option<DeviceConfiguration>;

    /// Resolves a setup class GUID to its class name.
    fn class_for_guid(&self, class_guid: &str) -> Option<String>;

    /// Requests raw input for a top-level collection, delivered to `window`.
    /// With `input_sink` set, input arrives even while the process is not in
    /// the foreground.
    fn register_for_input(
        &self,
        window: WindowHandle,
        usage: HidUsage,
        input_sink: bool,
    ) -> Result<()>;

    /// Requests device arrival and removal notifications for `window`.
    fn register_device_notifications(&self, window: WindowHandle) -> Result<()>;

    /// The current cursor position in screen coordinates.
    fn cursor_position(&self) -> Option<Point>;
}

/// Settings for the hidden message window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowOptions {
    pub class_name: String,
    pub title: String,
}

/// A complete backend: device access, key mapping and a message window.
pub trait Platform: DeviceSource + VirtualKeyMapper + 'static {
    type Window: MessageWindow;

    /// Creates the message window. Must be called on the thread which will
    /// pump its messages.
    fn create_window(&self, options: &WindowOptions) -> Result<Self::Window>;
}

/// A message delivered to the window handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WindowMessage {
    /// A device was attached or removed (`WM_DEVICECHANGE`).
    DeviceChange,
    /// A decoded raw input report (`WM_INPUT`).
    Input(RawInput),
}

/// Closure invoked synchronously for every message the window dispatches.
pub type MessageHandler = Box<dyn FnMut(&WindowMessage)>;

/// A hidden window and its message pump. Bound to the thread which created
/// it.
pub trait MessageWindow {
    type Closer: WindowCloser;

    fn handle(&self) -> WindowHandle;

    /// Dispatches every pending message without blocking and returns how
    /// many there were. Messages dispatched before a handler is installed
    /// only receive default processing.
    fn drain(&mut self) -> Result<usize>;

    /// Installs the message handler, replacing any previous one. A device
    /// change arriving while the handler runs is delivered after it returns;
    /// other nested messages are dropped.
    fn set_handler(&mut self, handler: MessageHandler);

    /// Blocks retrieving and dispatching messages until the window is
    /// destroyed.
    fn run(&mut self) -> Result<()>;

    /// A handle which tears the window down from any thread.
    fn closer(&self) -> Self::Closer;
}

/// Tears down a [`MessageWindow`] from another thread, which ends its
/// [`run`](MessageWindow::run) loop. Closing an already closed window is a
/// no-op.
pub trait WindowCloser: Send + Sync + 'static {
    fn close(&self) -> Result<()>;
}
