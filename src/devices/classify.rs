//! Device classification from interface paths.
//!
//! A raw input device path such as
//! `\\?\HID#VID_045E&PID_07A5&MI_01#8&1a2b3c4d&0&0000#{884b96c3-...}`
//! names the device instance in its first three `#` separated segments:
//! enumerator, device id and instance id. Those key the device's entry in the
//! configuration tree, which records its setup class and description.

use ::std::fmt;

use crate::platform::DeviceSource;

const PATH_PREFIX: &str = r"\\?\";

/// The `enumerator\device\instance` triple which keys a device instance in
/// the configuration tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceInstanceId {
    pub enumerator: String,
    pub device: String,
    pub instance: String,
}

impl DeviceInstanceId {
    /// Parses the instance id out of a device interface path. Returns `None`
    /// if the path has fewer than three `#` separated segments.
    pub fn from_device_path(path: &str) -> Option<Self> {
        let mut segments = path.split('#');
        let enumerator = segments.next()?;
        let enumerator = enumerator.strip_prefix(PATH_PREFIX).unwrap_or(enumerator);
        let device = segments.next()?;
        let instance = segments.next()?;

        Some(Self {
            enumerator: enumerator.to_owned(),
            device: device.to_owned(),
            instance: instance.to_owned(),
        })
    }

    pub fn new(
        enumerator: impl Into<String>,
        device: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            enumerator: enumerator.into(),
            device: device.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for DeviceInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r"{}\{}\{}", self.enumerator, self.device, self.instance)
    }
}

/// The outcome of classifying a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceClass {
    /// Setup class name, e.g. `Keyboard` or `Mouse`.
    pub class: String,
    /// Human readable description. Empty if none is recorded.
    pub description: String,
}

/// Decides which devices a registry may track.
pub trait DeviceClassifier: Send + Sync {
    /// Returns `true` for virtual or remote-session devices which must never
    /// be tracked.
    fn is_pseudo_device(&self, path: &str) -> bool;

    /// Determines the setup class of a device from its interface path.
    /// `None` means the device cannot be classified and is skipped.
    fn classify(&self, source: &dyn DeviceSource, path: &str) -> Option<DeviceClass>;
}

/// Classifies devices through their configuration tree entry, falling back
/// to the class GUID when no class name is recorded.
#[derive(Clone, Debug)]
pub struct InstanceIdClassifier {
    pseudo_marker: String,
}

impl Default for InstanceIdClassifier {
    fn default() -> Self {
        Self::new("root")
    }
}

impl InstanceIdClassifier {
    /// Constructs a classifier which rejects every device whose path contains
    /// `pseudo_marker`, compared case-insensitively.
    pub fn new(pseudo_marker: impl AsRef<str>) -> Self {
        Self {
            pseudo_marker: pseudo_marker.as_ref().to_lowercase(),
        }
    }

    pub fn pseudo_marker(&self) -> &str {
        &self.pseudo_marker
    }
}

impl DeviceClassifier for InstanceIdClassifier {
    fn is_pseudo_device(&self, path: &str) -> bool {
        path.to_lowercase().contains(&self.pseudo_marker)
    }

    fn classify(&self, source: &dyn DeviceSource, path: &str) -> Option<DeviceClass> {
        let instance = DeviceInstanceId::from_device_path(path)?;
        let config = source.device_configuration(&instance)?;

        let class = match config.class {
            Some(class) => class,
            None => source.class_for_guid(config.class_guid.as_deref()?)?,
        };
        let description = config
            .description
            .as_deref()
            .map(friendly_description)
            .unwrap_or_default();

        Some(DeviceClass { class, description })
    }
}

/// Strips the localisation reference from a `DeviceDesc` value, keeping the
/// text after the last `;`.
fn friendly_description(desc: &str) -> String {
    desc.rsplit(';').next().unwrap_or(desc).to_owned()
}
