//! In-memory backend for tests.
//!
//! [`MockPlatform`] keeps its device list and configuration tree in memory
//! and pumps its message window from a channel. Tests attach and detach
//! devices, then [`post`](MockPlatform::post) messages which are dispatched on
//! the pump thread exactly as OS messages would be.
//!
//! Posting only blocks on a std channel, so tests may drive the mock from
//! inside an async runtime.

use ::parking_lot::Mutex;
use ::std::{
    collections::{HashMap, HashSet},
    mem,
    sync::{
        atomic::{AtomicBool, AtomicIsize, Ordering},
        mpsc as std_mpsc, Arc,
    },
};
use ::tokio::sync::mpsc;
use ::tracing::{debug, trace};

use super::{
    DeviceConfiguration, DeviceSource, Dispatcher, MessageHandler, MessageWindow, Platform,
    RawDeviceInfo, WindowCloser, WindowMessage, WindowOptions,
};
use crate::{
    devices::DeviceInstanceId,
    errors::{Error, ErrorKind, Result},
    input::{
        keyboard::{UsLayout, VirtualKeyMapper},
        RawInput,
    },
    types::{DeviceHandle, DeviceType, HidUsage, Point, WindowHandle},
};

/// `ERROR_ACCESS_DENIED`, reported for simulated registration failures.
const ACCESS_DENIED: i32 = 5;
/// `ERROR_INVALID_HANDLE`, reported for unknown device handles.
const INVALID_HANDLE: i32 = 6;
/// `ERROR_INVALID_WINDOW_HANDLE`, reported by a failing pump.
const INVALID_WINDOW_HANDLE: i32 = 1400;

enum Command {
    /// A message and, unless it was queued at creation, the sender which
    /// acknowledges its dispatch.
    Deliver(WindowMessage, Option<std_mpsc::SyncSender<()>>),
    /// Makes message retrieval fail.
    Fail,
    Close,
}

#[derive(Clone)]
struct MockDevice {
    info: RawDeviceInfo,
    path: String,
}

#[derive(Default)]
struct State {
    devices: Vec<MockDevice>,
    configurations: HashMap<DeviceInstanceId, DeviceConfiguration>,
    class_guids: HashMap<String, String>,
    failing_usages: HashSet<HidUsage>,
    fail_enumeration: bool,
    fail_window: bool,
    registrations: Vec<(WindowHandle, HidUsage, bool)>,
    notifications: Vec<WindowHandle>,
    cursor: Option<Point>,
    pending: Vec<WindowMessage>,
    pump: Option<mpsc::UnboundedSender<Command>>,
}

/// A [`Platform`] whose devices, configuration tree and cursor are
/// controlled by the test.
///
/// Clones share state, so a test can keep one clone while another is handed
/// to the input manager.
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<State>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a device to the enumeration list without any configuration.
    pub fn add_device(&self, handle: DeviceHandle, device_type: DeviceType, path: &str) {
        self.state.lock().devices.push(MockDevice {
            info: RawDeviceInfo {
                handle,
                device_type,
            },
            path: path.to_owned(),
        });
    }

    /// Adds a device to the enumeration list and records a configuration
    /// entry with the given class and description for its path.
    pub fn attach(
        &self,
        handle: DeviceHandle,
        device_type: DeviceType,
        path: &str,
        class: &str,
        description: &str,
    ) {
        if let Some(instance) = DeviceInstanceId::from_device_path(path) {
            self.set_configuration(
                instance,
                DeviceConfiguration {
                    description: Some(description.to_owned()),
                    class: Some(class.to_owned()),
                    class_guid: None,
                },
            );
        }
        self.add_device(handle, device_type, path);
    }

    /// Removes a device from the enumeration list. Its configuration entry
    /// is kept, as the OS keeps it.
    pub fn detach(&self, handle: DeviceHandle) {
        self.state
            .lock()
            .devices
            .retain(|device| device.info.handle != handle);
    }

    pub fn set_configuration(&self, instance: DeviceInstanceId, config: DeviceConfiguration) {
        self.state.lock().configurations.insert(instance, config);
    }

    pub fn set_class_for_guid(&self, class_guid: &str, class: &str) {
        self.state
            .lock()
            .class_guids
            .insert(class_guid.to_lowercase(), class.to_owned());
    }

    /// Makes every raw input registration for `usage` fail.
    pub fn fail_registration(&self, usage: HidUsage) {
        self.state.lock().failing_usages.insert(usage);
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    /// Makes the next window creation fail.
    pub fn fail_window_creation(&self) {
        self.state.lock().fail_window = true;
    }

    pub fn set_cursor(&self, cursor: Option<Point>) {
        self.state.lock().cursor = cursor;
    }

    /// Queues a message which is already waiting when the next window is
    /// created, as OS bookkeeping messages are. It is dispatched by the first
    /// [`drain`](MessageWindow::drain).
    pub fn queue_on_create(&self, message: WindowMessage) {
        self.state.lock().pending.push(message);
    }

    /// Makes message retrieval fail on the most recently created window,
    /// which ends its pump loop with an error. Returns `false` if there is
    /// no live window.
    pub fn fail_pump(&self) -> bool {
        self.state
            .lock()
            .pump
            .as_ref()
            .map_or(false, |pump| pump.send(Command::Fail).is_ok())
    }

    /// Every successful raw input registration, in order.
    pub fn registrations(&self) -> Vec<(WindowHandle, HidUsage, bool)> {
        self.state.lock().registrations.clone()
    }

    /// Every window registered for device notifications, in order.
    pub fn notification_windows(&self) -> Vec<WindowHandle> {
        self.state.lock().notifications.clone()
    }

    /// Posts a message to the most recently created window and blocks until
    /// the pump thread has dispatched it. Returns `false` if there is no live
    /// window to deliver to.
    ///
    /// Must not be called from the pump thread.
    pub fn post(&self, message: WindowMessage) -> bool {
        let Some(pump) = self.state.lock().pump.clone() else {
            return false;
        };
        let (ack, done) = std_mpsc::sync_channel(1);
        if pump.send(Command::Deliver(message, Some(ack))).is_err() {
            return false;
        }
        done.recv().is_ok()
    }

    /// Posts a raw input report. See [`post`](Self::post).
    pub fn post_input(&self, input: RawInput) -> bool {
        self.post(WindowMessage::Input(input))
    }

    /// Posts a device change notification. See [`post`](Self::post).
    pub fn post_device_change(&self) -> bool {
        self.post(WindowMessage::DeviceChange)
    }
}

impl DeviceSource for MockPlatform {
    fn enumerate_devices(&self) -> Result<Vec<RawDeviceInfo>> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(os_error(ACCESS_DENIED, "Access is denied."));
        }
        Ok(state.devices.iter().map(|device| device.info).collect())
    }

    fn device_name(&self, device: DeviceHandle) -> Result<String> {
        self.state
            .lock()
            .devices
            .iter()
            .find(|candidate| candidate.info.handle == device)
            .map(|device| device.path.clone())
            .ok_or_else(|| os_error(INVALID_HANDLE, "The handle is invalid."))
    }

    fn device_configuration(&self, instance: &DeviceInstanceId) -> Option<DeviceConfiguration> {
        self.state.lock().configurations.get(instance).cloned()
    }

    fn class_for_guid(&self, class_guid: &str) -> Option<String> {
        self.state
            .lock()
            .class_guids
            .get(&class_guid.to_lowercase())
            .cloned()
    }

    fn register_for_input(
        &self,
        window: WindowHandle,
        usage: HidUsage,
        input_sink: bool,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing_usages.contains(&usage) {
            return Err(os_error(ACCESS_DENIED, "Access is denied."));
        }
        state.registrations.push((window, usage, input_sink));
        Ok(())
    }

    fn register_device_notifications(&self, window: WindowHandle) -> Result<()> {
        self.state.lock().notifications.push(window);
        Ok(())
    }

    fn cursor_position(&self) -> Option<Point> {
        self.state.lock().cursor
    }
}

impl VirtualKeyMapper for MockPlatform {
    fn scan_code(&self, virtual_key: u16) -> u16 {
        UsLayout.scan_code(virtual_key)
    }
}

impl Platform for MockPlatform {
    type Window = MockWindow;

    fn create_window(&self, options: &WindowOptions) -> Result<MockWindow> {
        static NEXT_HANDLE: AtomicIsize = AtomicIsize::new(0x1000);

        let mut state = self.state.lock();
        if mem::take(&mut state.fail_window) {
            return Err(os_error(ACCESS_DENIED, "Access is denied."));
        }

        let handle = WindowHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();
        for message in mem::take(&mut state.pending) {
            // The receiver is alive, so queueing cannot fail.
            let _ = sender.send(Command::Deliver(message, None));
        }
        state.pump = Some(sender.clone());
        debug!(wnd_class = %options.class_name, wnd_title = %options.title, "Creating mock window");

        Ok(MockWindow {
            handle,
            sender,
            receiver,
            dispatcher: Dispatcher::default(),
            alive: Arc::new(AtomicBool::new(true)),
        })
    }
}

/// The message window of a [`MockPlatform`].
pub struct MockWindow {
    handle: WindowHandle,
    sender: mpsc::UnboundedSender<Command>,
    receiver: mpsc::UnboundedReceiver<Command>,
    dispatcher: Dispatcher,
    alive: Arc<AtomicBool>,
}

impl MockWindow {
    fn deliver(&self, message: WindowMessage, ack: Option<std_mpsc::SyncSender<()>>) {
        self.dispatcher.dispatch(&message);
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }

    fn destroyed(&mut self) {
        self.receiver.close();
        self.alive.store(false, Ordering::SeqCst);
        debug!(wnd = self.handle.0, "Mock window destroyed");
    }
}

impl MessageWindow for MockWindow {
    type Closer = MockCloser;

    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn drain(&mut self) -> Result<usize> {
        let mut count = 0;
        while let Ok(command) = self.receiver.try_recv() {
            match command {
                Command::Deliver(message, ack) => {
                    self.deliver(message, ack);
                    count += 1;
                }
                Command::Fail => {
                    self.destroyed();
                    return Err(pump_error());
                }
                Command::Close => self.destroyed(),
            }
        }
        trace!(count, "Drained mock message queue");
        Ok(count)
    }

    fn set_handler(&mut self, handler: MessageHandler) {
        self.dispatcher.set_handler(handler);
    }

    fn run(&mut self) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ErrorKind::Destroyed.into());
        }
        while let Some(command) = self.receiver.blocking_recv() {
            match command {
                Command::Deliver(message, ack) => self.deliver(message, ack),
                Command::Fail => {
                    self.destroyed();
                    return Err(pump_error());
                }
                Command::Close => break,
            }
        }
        self.destroyed();
        Ok(())
    }

    fn closer(&self) -> MockCloser {
        MockCloser {
            sender: self.sender.clone(),
            alive: self.alive.clone(),
        }
    }
}

/// Ends the pump loop of a [`MockWindow`].
pub struct MockCloser {
    sender: mpsc::UnboundedSender<Command>,
    alive: Arc<AtomicBool>,
}

impl WindowCloser for MockCloser {
    fn close(&self) -> Result<()> {
        if self.alive.load(Ordering::SeqCst) {
            // The pump may already have exited, in which case there is nothing
            // left to close.
            let _ = self.sender.send(Command::Close);
        }
        Ok(())
    }
}

fn os_error(code: i32, message: &str) -> Error {
    ErrorKind::Os {
        code,
        message: message.to_owned(),
    }
    .into()
}

fn pump_error() -> Error {
    os_error(INVALID_WINDOW_HANDLE, "Invalid window handle.")
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;
    use ::std::{sync::mpsc as std_mpsc, thread};

    #[test]
    fn test_device_source() {
        let platform = MockPlatform::new();
        platform.attach(
            DeviceHandle(1),
            DeviceType::Keyboard,
            r"\\?\HID#VID_1#1&0#{884b96c3}",
            "Keyboard",
            "Keyboard",
        );

        assert_eq!(
            platform.enumerate_devices().unwrap(),
            vec![RawDeviceInfo {
                handle: DeviceHandle(1),
                device_type: DeviceType::Keyboard,
            }]
        );
        assert_eq!(
            platform.device_name(DeviceHandle(1)).unwrap(),
            r"\\?\HID#VID_1#1&0#{884b96c3}"
        );
        assert_eq!(
            platform
                .device_name(DeviceHandle(2))
                .unwrap_err()
                .code(),
            Some(INVALID_HANDLE)
        );

        platform.detach(DeviceHandle(1));
        assert!(platform.enumerate_devices().unwrap().is_empty());
    }

    #[test]
    fn test_post_without_window() {
        assert!(!MockPlatform::new().post_device_change());
    }

    #[test]
    fn test_pump_dispatches_until_closed() {
        let platform = MockPlatform::new();
        let (tx, rx) = std_mpsc::channel();

        let pump = {
            let platform = platform.clone();
            thread::spawn(move || {
                let mut window = platform.create_window(&WindowOptions {
                    class_name: "Test".into(),
                    title: "Test".into(),
                })?;
                let seen = Arc::new(Mutex::new(Vec::new()));
                let handler_seen = seen.clone();
                window.set_handler(Box::new(move |message: &WindowMessage| {
                    handler_seen.lock().push(message.clone());
                }));
                tx.send(window.closer()).ok();
                window.run()?;
                let seen = seen.lock().clone();
                Ok::<_, Error>(seen)
            })
        };

        let closer = rx.recv().unwrap();
        assert!(platform.post_device_change());
        assert!(platform.post_device_change());
        closer.close().unwrap();

        let seen = pump.join().unwrap().unwrap();
        assert_eq!(seen, vec![WindowMessage::DeviceChange; 2]);

        // Closing again and posting to a dead window are both harmless.
        closer.close().unwrap();
        assert!(!platform.post_device_change());
    }

    #[test]
    fn test_messages_queued_on_create_are_drained_before_the_handler() {
        let platform = MockPlatform::new();
        platform.queue_on_create(WindowMessage::DeviceChange);
        let (tx, rx) = std_mpsc::channel();

        let pump = {
            let platform = platform.clone();
            thread::spawn(move || {
                let mut window = platform.create_window(&WindowOptions {
                    class_name: "Test".into(),
                    title: "Test".into(),
                })?;
                let drained = window.drain()?;
                let seen = Arc::new(Mutex::new(Vec::new()));
                let handler_seen = seen.clone();
                window.set_handler(Box::new(move |message: &WindowMessage| {
                    handler_seen.lock().push(message.clone());
                }));
                tx.send(window.closer()).ok();
                window.run()?;
                let seen = seen.lock().clone();
                Ok::<_, Error>((drained, seen))
            })
        };

        let closer = rx.recv().unwrap();
        let input = RawInput {
            device: DeviceHandle(7),
            data: crate::input::RawInputData::Hid,
        };
        assert!(platform.post_input(input.clone()));
        closer.close().unwrap();

        let (drained, seen) = pump.join().unwrap().unwrap();
        assert_eq!(drained, 1);
        assert_eq!(seen, vec![WindowMessage::Input(input)]);
    }

    #[test]
    fn test_failing_pump_ends_run() {
        let platform = MockPlatform::new();
        assert!(!platform.fail_pump());

        let mut window = platform
            .create_window(&WindowOptions {
                class_name: "Test".into(),
                title: "Test".into(),
            })
            .unwrap();
        let closer = window.closer();
        assert!(platform.fail_pump());

        let err = window.run().unwrap_err();
        assert_eq!(err.code(), Some(INVALID_WINDOW_HANDLE));
        assert!(!platform.post_device_change());
        closer.close().unwrap();
    }

    #[test]
    fn test_drain_without_handler() {
        let platform = MockPlatform::new();
        let mut window = platform
            .create_window(&WindowOptions {
                class_name: "Test".into(),
                title: "Test".into(),
            })
            .unwrap();
        assert_eq!(window.drain().unwrap(), 0);

        platform.fail_window_creation();
        assert!(platform
            .create_window(&WindowOptions {
                class_name: "Test".into(),
                title: "Test".into(),
            })
            .is_err());
    }
}
