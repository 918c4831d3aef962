//! The input manager: a background input thread and the registries it feeds.

mod builder;

pub use builder::Builder;

use crate::{
    devices::{DeviceClassifier, DeviceInfo, DeviceRegistry, KeyboardDevice, MouseDevice},
    errors::{Error, ErrorKind, Result},
    input::{keyboard::KeyboardState, mouse::MouseState, RawInputData},
    platform::{
        DeviceSource, MessageWindow, Platform, WindowCloser, WindowMessage, WindowOptions,
    },
    types::WindowHandle,
};

use ::parking_lot::Mutex;
use ::std::{
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};
use ::tracing::{debug, error, trace};

const THREAD_NAME: &str = "rawpoll-input";

type Ready = mpsc::SyncSender<Result<Box<dyn WindowCloser>>>;

/// Live, polled keyboard and mouse state across every attached device.
///
/// Starting a manager spawns an input thread which owns a hidden message
/// window. The thread tracks keyboards and mice as they are attached and
/// removed, and applies their raw input to per-device state. Any thread may
/// take snapshots at any time; each snapshot merges the state of every
/// tracked device of a kind.
///
/// # Example
///
/// ```no_run
/// use ::rawpoll::{input::keyboard::Key, Builder};
///
/// # #[cfg(windows)]
/// # fn main() {
/// let input = Builder::new().build().expect("Failed to start input thread");
/// loop {
///     if input.keyboard_state().is_key_pressed(Key::Escape) {
///         break;
///     }
///     // update and render...
/// }
/// # }
/// # #[cfg(not(windows))]
/// # fn main() {}
/// ```
pub struct InputManager {
    source: Arc<dyn DeviceSource>,
    keyboards: Arc<DeviceRegistry<KeyboardDevice>>,
    mice: Arc<DeviceRegistry<MouseDevice>>,
    /// `None` once destroyed.
    closer: Mutex<Option<Box<dyn WindowCloser>>>,
    thread: JoinHandle<()>,
}

impl InputManager {
    /// Spawns the input thread and blocks until it has created its window
    /// and populated both registries. Blocking does not involve any async
    /// runtime, so this may be called from within one.
    pub(crate) fn start<P: Platform>(platform: P, builder: &Builder) -> Result<Self> {
        let platform = Arc::new(platform);
        let keyboards = Arc::new(DeviceRegistry::new());
        let mice = Arc::new(DeviceRegistry::new());

        let worker = Worker {
            platform: platform.clone(),
            keyboards: keyboards.clone(),
            mice: mice.clone(),
            classifier: builder.classifier(),
            input_sink: builder.input_sink(),
        };
        let options = builder.window_options();
        let (ready, readiness) = mpsc::sync_channel(1);

        debug!(wnd_class = %options.class_name, "Starting input thread");
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || worker.run(&options, ready))
            .map_err(|e| Error::from(ErrorKind::WorkerSpawn(e.to_string())))?;

        let closer = match readiness.recv() {
            Ok(Ok(closer)) => closer,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ErrorKind::WorkerExited.into()),
        };
        debug!("Input thread ready");

        Ok(Self {
            source: platform,
            keyboards,
            mice,
            closer: Mutex::new(Some(closer)),
            thread,
        })
    }

    /// The merged state of every tracked keyboard. A key is pressed if it is
    /// pressed on any keyboard.
    pub fn keyboard_state(&self) -> KeyboardState {
        self.keyboards.aggregate_state()
    }

    /// The merged state of every tracked mouse. Buttons are pressed if pressed
    /// on any mouse and wheel motion is summed. The position is the live
    /// cursor position, as all mice share one cursor.
    pub fn mouse_state(&self) -> MouseState {
        let mut state = self.mice.aggregate_state();
        if let Some(position) = self.source.cursor_position() {
            state.set_position(position);
        }
        state
    }

    /// Every keyboard seen so far, in discovery order.
    pub fn keyboards(&self) -> Vec<DeviceInfo> {
        self.keyboards.devices()
    }

    /// Every mouse seen so far, in discovery order.
    pub fn mice(&self) -> Vec<DeviceInfo> {
        self.mice.devices()
    }

    /// The state of a single keyboard, by [`DeviceInfo::index`].
    pub fn keyboard_state_for(&self, index: usize) -> Option<KeyboardState> {
        self.keyboards.state_for(index)
    }

    /// The state of a single mouse, by [`DeviceInfo::index`]. The position is
    /// the cursor position at the time of that mouse's last report.
    pub fn mouse_state_for(&self, index: usize) -> Option<MouseState> {
        self.mice.state_for(index)
    }

    /// Whether the input thread is still pumping messages.
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }

    /// Tears down the message window, which ends the input thread. Snapshots
    /// remain available afterwards but no longer change.
    ///
    /// Calling `destroy` more than once is a no-op. Does not wait for the
    /// input thread to exit.
    pub fn destroy(&self) -> Result<()> {
        match self.closer.lock().take() {
            Some(closer) => {
                debug!("Destroying input manager");
                closer.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            error!(error = %e, "Failed to stop input thread");
        }
    }
}

/// State owned by the input thread. Clones share the registries.
struct Worker<P> {
    platform: Arc<P>,
    keyboards: Arc<DeviceRegistry<KeyboardDevice>>,
    mice: Arc<DeviceRegistry<MouseDevice>>,
    classifier: Arc<dyn DeviceClassifier>,
    input_sink: bool,
}

impl<P> Clone for Worker<P> {
    fn clone(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            keyboards: self.keyboards.clone(),
            mice: self.mice.clone(),
            classifier: self.classifier.clone(),
            input_sink: self.input_sink,
        }
    }
}

impl<P: Platform> Worker<P> {
    fn run(self, options: &WindowOptions, ready: Ready) {
        let mut window = match self.setup(options) {
            Ok(window) => window,
            Err(e) => {
                error!(error = %e, "Failed to start input thread");
                let _ = ready.send(Err(e));
                return;
            }
        };

        let closer: Box<dyn WindowCloser> = Box::new(window.closer());
        if ready.send(Ok(closer)).is_err() {
            return;
        }
        if let Err(e) = window.run() {
            error!(error = %e, "Input message loop failed");
        }
        debug!("Input thread exiting");
    }

    /// Creates the window, populates the registries and installs the message
    /// handler.
    fn setup(&self, options: &WindowOptions) -> Result<P::Window> {
        let mut window = self.platform.create_window(options)?;
        window.drain()?;

        let handle = window.handle();
        self.platform.register_device_notifications(handle)?;
        self.update_devices(handle);

        let worker = self.clone();
        window.set_handler(Box::new(move |message: &WindowMessage| {
            worker.handle_message(handle, message)
        }));

        Ok(window)
    }

    fn update_devices(&self, window: WindowHandle) {
        let source: &dyn DeviceSource = &*self.platform;
        self.keyboards
            .update_devices(source, &*self.classifier, window, self.input_sink);
        self.mice
            .update_devices(source, &*self.classifier, window, self.input_sink);
        debug!(
            keyboards = self.keyboards.len(),
            mice = self.mice.len(),
            "Updated devices"
        );
    }

    fn handle_message(&self, window: WindowHandle, message: &WindowMessage) {
        match message {
            WindowMessage::DeviceChange => self.update_devices(window),
            WindowMessage::Input(input) => {
                let handled = match &input.data {
                    RawInputData::Keyboard(data) => {
                        self.keyboards.process_input(input.device, |state| {
                            state.process_input_data(data, &*self.platform)
                        })
                    }
                    RawInputData::Mouse(data) => {
                        let cursor = self.platform.cursor_position();
                        self.mice.process_input(input.device, |state| {
                            state.process_input_data(data, cursor)
                        })
                    }
                    RawInputData::Hid => false,
                };
                trace!(device = %input.device, handled, "Raw input");
            }
        }
    }
}
