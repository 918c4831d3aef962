//! Builder object which starts an [`InputManager`].

use crate::{
    devices::{DeviceClassifier, InstanceIdClassifier},
    errors::Result,
    manager::InputManager,
    platform::{Platform, WindowOptions},
};

use ::std::{fmt, sync::Arc};

/// A builder pattern object which simplifies the process of starting an
/// [`InputManager`].
///
/// The same builder can be re-used to start several managers with the same
/// configuration, as a type of prototype.
///
/// ```no_run
/// use ::rawpoll::{platform::mock::MockPlatform, Builder};
///
/// let input = Builder::new()
///     .with_input_sink(false)
///     .build_with(MockPlatform::new())
///     .expect("Failed to start input thread");
/// assert!(input.keyboards().is_empty());
/// ```
#[derive(Clone)]
pub struct Builder {
    class_name: String,
    title: String,
    input_sink: bool,
    classifier: Arc<dyn DeviceClassifier>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("class_name", &self.class_name)
            .field("title", &self.title)
            .field("input_sink", &self.input_sink)
            .finish_non_exhaustive()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Construct a new builder. Default values will be used for all properties
    /// until explicitly set.
    pub fn new() -> Self {
        Self {
            class_name: "RawPollInputWindow".to_owned(),
            title: "rawpoll input".to_owned(),
            input_sink: true,
            classifier: Arc::new(InstanceIdClassifier::default()),
        }
    }

    /// Set the class name of the hidden message window.
    ///
    /// Defaults to `RawPollInputWindow` if not set.
    pub fn with_class_name(self, class_name: impl AsRef<str>) -> Self {
        Self {
            class_name: class_name.as_ref().to_owned(),
            ..self
        }
    }

    /// Set the title of the hidden message window. It is never displayed, but
    /// shows up in window spying tools.
    pub fn with_title(self, title: impl AsRef<str>) -> Self {
        Self {
            title: title.as_ref().to_owned(),
            ..self
        }
    }

    /// Whether input is received while the application is in the background.
    ///
    /// Defaults to `true` if not set.
    pub fn with_input_sink(self, input_sink: bool) -> Self {
        Self { input_sink, ..self }
    }

    /// Rejects devices whose path contains `marker`, compared
    /// case-insensitively. Replaces any classifier set with
    /// [`with_classifier`](Self::with_classifier).
    ///
    /// Defaults to `root` if not set, which excludes the virtual keyboard and
    /// mouse of remote desktop sessions.
    pub fn with_pseudo_device_marker(self, marker: impl AsRef<str>) -> Self {
        Self {
            classifier: Arc::new(InstanceIdClassifier::new(marker)),
            ..self
        }
    }

    /// Use a custom strategy to decide which devices are tracked.
    pub fn with_classifier(self, classifier: impl DeviceClassifier + 'static) -> Self {
        Self {
            classifier: Arc::new(classifier),
            ..self
        }
    }

    /// Gets the currently set window class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Gets the currently set window title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Gets the currently set input sink preference.
    pub fn input_sink(&self) -> bool {
        self.input_sink
    }

    pub(crate) fn window_options(&self) -> WindowOptions {
        WindowOptions {
            class_name: self.class_name.clone(),
            title: self.title.clone(),
        }
    }

    pub(crate) fn classifier(&self) -> Arc<dyn DeviceClassifier> {
        self.classifier.clone()
    }

    /// Start a new [`InputManager`] on the Win32 backend. Blocks until the
    /// input thread is ready.
    #[cfg(windows)]
    pub fn build(&self) -> Result<InputManager> {
        self.build_with(crate::platform::win32::Win32Platform::new())
    }

    /// Start a new [`InputManager`] on the given backend. Blocks until the
    /// input thread is ready.
    pub fn build_with<P: Platform>(&self, platform: P) -> Result<InputManager> {
        InputManager::start(platform, self)
    }
}
