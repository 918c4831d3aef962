//! Tracking of the devices of one kind.

use ::parking_lot::Mutex;
use ::std::{collections::HashMap, marker::PhantomData};
use ::tracing::{debug, warn};

use super::{DeviceClassifier, DeviceKind, DeviceState};
use crate::{
    platform::{DeviceSource, RawDeviceInfo},
    types::{DeviceHandle, DeviceType, WindowHandle},
};

/// A tracked device as seen from outside the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position of the device in its registry. Stable for the lifetime of
    /// the registry.
    pub index: usize,
    pub handle: DeviceHandle,
    pub connected: bool,
    /// The type the device was enumerated as. Keyboards and mice exposed
    /// through a generic HID driver show up as [`DeviceType::Hid`].
    pub device_type: DeviceType,
    pub description: String,
}

/// What [`DeviceRegistry::update_devices`] did with one enumerated device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceDisposition {
    /// Already tracked at the given index and marked connected again.
    Tracked(usize),
    /// Newly tracked at the given index.
    Registered(usize),
    /// A virtual or remote-session device.
    SkippedPseudoDevice,
    /// Enumerated as a different kind of device.
    SkippedUnsupportedType,
    /// No class could be determined from the device path.
    SkippedUnclassifiable,
    /// Installed under a different setup class.
    SkippedClassMismatch,
    /// Raw input registration failed. The device is retried on the next
    /// update.
    RegistrationFailed,
}

struct Entry<S> {
    handle: DeviceHandle,
    device_type: DeviceType,
    description: String,
    state: S,
}

struct Devices<S> {
    entries: Vec<Entry<S>>,
    by_handle: HashMap<DeviceHandle, usize>,
}

/// Everything needed to vet and register a newly seen device.
struct Discovery<'a> {
    source: &'a dyn DeviceSource,
    classifier: &'a dyn DeviceClassifier,
    window: WindowHandle,
    input_sink: bool,
}

/// The outcome of looking at one enumerated device, before it is applied to
/// the registry.
enum Vetting {
    Known(usize),
    Accepted { description: String },
    Rejected(DeviceDisposition),
}

/// The devices of one kind, in discovery order, together with their state.
///
/// Entries are appended the first time a device is seen and are never
/// removed or reordered; a device which goes away is only marked
/// disconnected, and keeps its index if it comes back with the same handle.
///
/// All access goes through one mutex. The input thread is the only writer;
/// snapshots may be taken from any thread.
pub struct DeviceRegistry<K: DeviceKind> {
    devices: Mutex<Devices<K::State>>,
    kind: PhantomData<fn() -> K>,
}

impl<K: DeviceKind> Default for DeviceRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: DeviceKind> DeviceRegistry<K> {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(Devices {
                entries: Vec::new(),
                by_handle: HashMap::new(),
            }),
            kind: PhantomData,
        }
    }

    /// Reconciles the registry with the devices currently attached.
    ///
    /// Every tracked device which is no longer enumerated is marked
    /// disconnected and every one which is enumerated again is marked
    /// connected. Each new device is vetted and, if it passes, registered for
    /// raw input and appended. If enumeration fails the registry is left
    /// untouched.
    ///
    /// The lock is only held to update connection flags and to append. Device
    /// queries and registration run without it, so snapshots are not held up
    /// by a refresh.
    ///
    /// Returns what was done with each enumerated device.
    pub fn update_devices(
        &self,
        source: &dyn DeviceSource,
        classifier: &dyn DeviceClassifier,
        window: WindowHandle,
        input_sink: bool,
    ) -> Vec<(DeviceHandle, DeviceDisposition)> {
        let attached = match source.enumerate_devices() {
            Ok(attached) => attached,
            Err(err) => {
                warn!(kind = K::CLASS_NAME, error = %err, "Failed to enumerate devices");
                return Vec::new();
            }
        };
        let discovery = Discovery {
            source,
            classifier,
            window,
            input_sink,
        };

        let vetted = self
            .reconnect(&attached)
            .into_iter()
            .zip(&attached)
            .map(|(index, &device)| match index {
                Some(index) => Vetting::Known(index),
                None => Self::vet(device, &discovery),
            })
            .collect::<Vec<_>>();

        let mut devices = self.devices.lock();
        vetted
            .into_iter()
            .zip(attached)
            .map(|(vetting, device)| {
                let disposition = match vetting {
                    Vetting::Known(index) => DeviceDisposition::Tracked(index),
                    Vetting::Rejected(disposition) => disposition,
                    Vetting::Accepted { description } => {
                        Self::append(&mut devices, device, description)
                    }
                };
                (device.handle, disposition)
            })
            .collect()
    }

    /// Updates the connection flag of every tracked device and returns the
    /// index of each attached device which is already tracked.
    fn reconnect(&self, attached: &[RawDeviceInfo]) -> Vec<Option<usize>> {
        let mut devices = self.devices.lock();
        let was_connected: Vec<bool> = devices
            .entries
            .iter()
            .map(|entry| entry.state.is_connected())
            .collect();
        for entry in &mut devices.entries {
            entry.state.set_connected(false);
        }

        attached
            .iter()
            .map(|device| {
                let &index = devices.by_handle.get(&device.handle)?;
                devices.entries[index].state.set_connected(true);
                if !was_connected[index] {
                    debug!(kind = K::CLASS_NAME, index, handle = %device.handle, "Device reconnected");
                }
                Some(index)
            })
            .collect()
    }

    /// Decides whether a device seen for the first time belongs in this
    /// registry, and registers it for raw input if so.
    fn vet(device: RawDeviceInfo, discovery: &Discovery<'_>) -> Vetting {
        let path = match discovery.source.device_name(device.handle) {
            Ok(path) => path,
            Err(err) => {
                debug!(handle = %device.handle, error = %err, "Failed to query device path");
                return Vetting::Rejected(DeviceDisposition::SkippedUnclassifiable);
            }
        };
        if discovery.classifier.is_pseudo_device(&path) {
            return Vetting::Rejected(DeviceDisposition::SkippedPseudoDevice);
        }
        if device.device_type != K::DEVICE_TYPE && device.device_type != DeviceType::Hid {
            return Vetting::Rejected(DeviceDisposition::SkippedUnsupportedType);
        }
        let Some(class) = discovery.classifier.classify(discovery.source, &path) else {
            return Vetting::Rejected(DeviceDisposition::SkippedUnclassifiable);
        };
        if !class.class.eq_ignore_ascii_case(K::CLASS_NAME) {
            return Vetting::Rejected(DeviceDisposition::SkippedClassMismatch);
        }

        if let Err(err) =
            discovery
                .source
                .register_for_input(discovery.window, K::USAGE, discovery.input_sink)
        {
            warn!(
                kind = K::CLASS_NAME,
                handle = %device.handle,
                device = %path,
                error = %err,
                "Failed to register device for raw input"
            );
            return Vetting::Rejected(DeviceDisposition::RegistrationFailed);
        }

        Vetting::Accepted {
            description: class.description,
        }
    }

    fn append(
        devices: &mut Devices<K::State>,
        device: RawDeviceInfo,
        description: String,
    ) -> DeviceDisposition {
        // Another refresh may have added the device while the lock was free.
        if let Some(&index) = devices.by_handle.get(&device.handle) {
            devices.entries[index].state.set_connected(true);
            return DeviceDisposition::Tracked(index);
        }

        let index = devices.entries.len();
        let mut state = K::State::default();
        state.set_connected(true);
        debug!(
            kind = K::CLASS_NAME,
            index,
            handle = %device.handle,
            description = %description,
            "Device added"
        );
        devices.entries.push(Entry {
            handle: device.handle,
            device_type: device.device_type,
            description,
            state,
        });
        devices.by_handle.insert(device.handle, index);

        DeviceDisposition::Registered(index)
    }

    /// Applies `update` to the state of the device with the given handle.
    /// Returns `false` without calling `update` if the device is not tracked,
    /// otherwise whatever `update` returns.
    pub fn process_input<F>(&self, handle: DeviceHandle, update: F) -> bool
    where
        F: FnOnce(&mut K::State) -> bool,
    {
        let mut devices = self.devices.lock();
        let Some(&index) = devices.by_handle.get(&handle) else {
            return false;
        };
        update(&mut devices.entries[index].state)
    }

    /// The merged state of every tracked device: connected, pressed and
    /// similar flags are OR-ed, accumulators are summed.
    pub fn aggregate_state(&self) -> K::State {
        let devices = self.devices.lock();
        devices
            .entries
            .iter()
            .fold(K::State::default(), |mut merged, entry| {
                merged.merge(&entry.state);
                merged
            })
    }

    /// The state of a single device.
    pub fn state_for(&self, index: usize) -> Option<K::State> {
        self.devices
            .lock()
            .entries
            .get(index)
            .map(|entry| entry.state.clone())
    }

    /// The index of the device with the given handle, if tracked.
    pub fn index_of(&self, handle: DeviceHandle) -> Option<usize> {
        self.devices.lock().by_handle.get(&handle).copied()
    }

    /// Every tracked device, in index order.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.devices
            .lock()
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| DeviceInfo {
                index,
                handle: entry.handle,
                connected: entry.state.is_connected(),
                device_type: entry.device_type,
                description: entry.description.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.devices.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::{DeviceClass, InstanceIdClassifier, KeyboardDevice, MouseDevice},
        input::{
            keyboard::{Key, KeyboardState},
            mouse::MouseState,
        },
        platform::mock::MockPlatform,
        types::HidUsage,
    };

    use ::maplit::hashmap;
    use ::pretty_assertions::assert_eq;
    use ::std::sync::Arc;

    const WINDOW: WindowHandle = WindowHandle(0x42);
    const KEYBOARD: DeviceHandle = DeviceHandle(0x10);
    const MOUSE: DeviceHandle = DeviceHandle(0x20);

    fn platform_with_keyboard_and_mouse() -> MockPlatform {
        let platform = MockPlatform::new();
        platform.attach(
            KEYBOARD,
            DeviceType::Keyboard,
            r"\\?\HID#VID_046D&PID_C52B&MI_00#7&2a6fb1f&0&0000#{884b96c3}",
            "Keyboard",
            "HID Keyboard Device",
        );
        platform.attach(
            MOUSE,
            DeviceType::Mouse,
            r"\\?\HID#VID_046D&PID_C52B&MI_01#7&1c5b3ad&0&0000#{378de44c}",
            "Mouse",
            "HID-compliant mouse",
        );
        platform
    }

    fn update<K: DeviceKind>(
        registry: &DeviceRegistry<K>,
        platform: &MockPlatform,
    ) -> Vec<(DeviceHandle, DeviceDisposition)> {
        registry.update_devices(platform, &InstanceIdClassifier::default(), WINDOW, true)
    }

    #[test]
    fn test_registers_matching_devices_only() {
        let platform = platform_with_keyboard_and_mouse();
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();
        let mice = DeviceRegistry::<MouseDevice>::new();

        assert_eq!(
            update(&keyboards, &platform),
            vec![
                (KEYBOARD, DeviceDisposition::Registered(0)),
                (MOUSE, DeviceDisposition::SkippedUnsupportedType),
            ]
        );
        assert_eq!(
            update(&mice, &platform),
            vec![
                (KEYBOARD, DeviceDisposition::SkippedUnsupportedType),
                (MOUSE, DeviceDisposition::Registered(0)),
            ]
        );

        assert_eq!(
            keyboards.devices(),
            vec![DeviceInfo {
                index: 0,
                handle: KEYBOARD,
                connected: true,
                device_type: DeviceType::Keyboard,
                description: "HID Keyboard Device".into(),
            }]
        );
        assert!(keyboards.aggregate_state().is_connected());
        assert!(mice.aggregate_state().is_connected());
        assert_eq!(
            platform.registrations(),
            vec![
                (WINDOW, HidUsage::KEYBOARD, true),
                (WINDOW, HidUsage::MOUSE, true)
            ]
        );
    }

    #[test]
    fn test_indices_stable_across_updates() {
        let platform = platform_with_keyboard_and_mouse();
        platform.attach(
            DeviceHandle(0x11),
            DeviceType::Hid,
            r"\\?\HID#VID_1532&PID_0084&MI_02#8&3b9c1e2&0&0000#{884b96c3}",
            "KEYBOARD",
            "Razer keypad",
        );
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();

        update(&keyboards, &platform);
        let first = keyboards.devices();
        let second_update = update(&keyboards, &platform);

        assert_eq!(keyboards.devices(), first);
        assert_eq!(keyboards.len(), 2);
        assert_eq!(
            second_update.into_iter().collect::<HashMap<_, _>>(),
            hashmap! {
                KEYBOARD => DeviceDisposition::Tracked(0),
                MOUSE => DeviceDisposition::SkippedUnsupportedType,
                DeviceHandle(0x11) => DeviceDisposition::Tracked(1),
            }
        );
    }

    #[test]
    fn test_detach_and_reattach_keeps_index() {
        let platform = platform_with_keyboard_and_mouse();
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();
        update(&keyboards, &platform);

        platform.detach(KEYBOARD);
        update(&keyboards, &platform);
        assert_eq!(keyboards.len(), 1);
        assert!(!keyboards.devices()[0].connected);
        assert!(!keyboards.aggregate_state().is_connected());

        platform.attach(
            KEYBOARD,
            DeviceType::Keyboard,
            r"\\?\HID#VID_046D&PID_C52B&MI_00#7&2a6fb1f&0&0000#{884b96c3}",
            "Keyboard",
            "HID Keyboard Device",
        );
        let dispositions = update(&keyboards, &platform)
            .into_iter()
            .collect::<HashMap<_, _>>();
        assert_eq!(dispositions[&KEYBOARD], DeviceDisposition::Tracked(0));
        assert!(keyboards.devices()[0].connected);
        assert_eq!(keyboards.index_of(KEYBOARD), Some(0));
    }

    /// Takes a snapshot of the registry it feeds from inside `classify`.
    struct SnapshotClassifier {
        inner: InstanceIdClassifier,
        registry: Arc<DeviceRegistry<KeyboardDevice>>,
        snapshots: Mutex<Vec<(bool, usize)>>,
    }

    impl DeviceClassifier for SnapshotClassifier {
        fn is_pseudo_device(&self, path: &str) -> bool {
            self.inner.is_pseudo_device(path)
        }

        fn classify(&self, source: &dyn DeviceSource, path: &str) -> Option<DeviceClass> {
            let connected = self.registry.aggregate_state().is_connected();
            self.snapshots.lock().push((connected, self.registry.len()));
            self.inner.classify(source, path)
        }
    }

    #[test]
    fn test_snapshots_available_while_classifying() {
        let platform = platform_with_keyboard_and_mouse();
        let keyboards = Arc::new(DeviceRegistry::<KeyboardDevice>::new());
        let classifier = SnapshotClassifier {
            inner: InstanceIdClassifier::default(),
            registry: keyboards.clone(),
            snapshots: Mutex::new(Vec::new()),
        };
        keyboards.update_devices(&platform, &classifier, WINDOW, true);
        assert_eq!(*classifier.snapshots.lock(), vec![(false, 0)]);

        platform.attach(
            DeviceHandle(0x11),
            DeviceType::Keyboard,
            r"\\?\HID#VID_1532&PID_0084&MI_02#8&3b9c1e2&0&0000#{884b96c3}",
            "Keyboard",
            "Razer keypad",
        );
        let dispositions = keyboards.update_devices(&platform, &classifier, WINDOW, true);

        // The tracked keyboard never reads as disconnected mid-refresh.
        assert_eq!(*classifier.snapshots.lock(), vec![(false, 0), (true, 1)]);
        assert_eq!(
            dispositions,
            vec![
                (KEYBOARD, DeviceDisposition::Tracked(0)),
                (MOUSE, DeviceDisposition::SkippedUnsupportedType),
                (DeviceHandle(0x11), DeviceDisposition::Registered(1)),
            ]
        );
    }

    #[test]
    fn test_pseudo_devices_never_added() {
        let platform = MockPlatform::new();
        platform.attach(
            DeviceHandle(1),
            DeviceType::Keyboard,
            r"\\?\Root#RDP_KBD#0000#{884b96c3}",
            "Keyboard",
            "Terminal Server Keyboard Driver",
        );
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();

        assert_eq!(
            update(&keyboards, &platform),
            vec![(DeviceHandle(1), DeviceDisposition::SkippedPseudoDevice)]
        );
        assert!(keyboards.is_empty());
        assert!(platform.registrations().is_empty());
    }

    #[test]
    fn test_unclassifiable_and_mismatched_devices() {
        let platform = MockPlatform::new();
        platform.add_device(DeviceHandle(1), DeviceType::Hid, r"\\?\HID#VID_1234");
        platform.attach(
            DeviceHandle(2),
            DeviceType::Hid,
            r"\\?\HID#VID_045E&PID_028E#6&3a2b1c&0&0000#{4d1e55b2}",
            "HIDClass",
            "HID-compliant game controller",
        );
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();

        assert_eq!(
            update(&keyboards, &platform),
            vec![
                (DeviceHandle(1), DeviceDisposition::SkippedUnclassifiable),
                (DeviceHandle(2), DeviceDisposition::SkippedClassMismatch),
            ]
        );
        assert!(keyboards.is_empty());
    }

    #[test]
    fn test_registration_failure_excludes_device() {
        let platform = platform_with_keyboard_and_mouse();
        platform.fail_registration(HidUsage::MOUSE);
        let mice = DeviceRegistry::<MouseDevice>::new();

        assert_eq!(
            update(&mice, &platform)[1],
            (MOUSE, DeviceDisposition::RegistrationFailed)
        );
        assert!(mice.is_empty());
        assert!(!mice.aggregate_state().is_connected());
    }

    #[test]
    fn test_enumeration_failure_leaves_registry_untouched() {
        let platform = platform_with_keyboard_and_mouse();
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();
        update(&keyboards, &platform);

        platform.fail_enumeration(true);
        assert!(update(&keyboards, &platform).is_empty());
        assert!(keyboards.devices()[0].connected);
    }

    #[test]
    fn test_aggregate_is_or_across_devices() {
        let platform = platform_with_keyboard_and_mouse();
        platform.attach(
            DeviceHandle(0x11),
            DeviceType::Keyboard,
            r"\\?\HID#VID_1532&PID_0084&MI_02#8&3b9c1e2&0&0000#{884b96c3}",
            "Keyboard",
            "Second keyboard",
        );
        let keyboards = DeviceRegistry::<KeyboardDevice>::new();
        update(&keyboards, &platform);

        keyboards.process_input(KEYBOARD, |state: &mut KeyboardState| {
            state.set_key_pressed(Key::A, true);
            true
        });
        keyboards.process_input(DeviceHandle(0x11), |state: &mut KeyboardState| {
            state.set_key_pressed(Key::B, true);
            true
        });

        let merged = keyboards.aggregate_state();
        assert!(merged.is_key_pressed(Key::A));
        assert!(merged.is_key_pressed(Key::B));
        assert!(!merged.is_key_pressed(Key::C));

        let first = keyboards.state_for(0).unwrap();
        assert!(first.is_key_pressed(Key::A));
        assert!(!first.is_key_pressed(Key::B));
        assert_eq!(keyboards.state_for(2), None);
    }

    #[test]
    fn test_input_for_untracked_device_is_ignored() {
        let mice = DeviceRegistry::<MouseDevice>::new();
        let handled = mice.process_input(MOUSE, |_: &mut MouseState| {
            panic!("untracked device state must not be touched")
        });
        assert!(!handled);
    }
}
