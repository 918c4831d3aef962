//! Crate-specific error and result types, plus common conversions.

use ::std::{
    fmt::{self, Display},
    io,
};

/// Result type returned by functions that call into the OS input service or
/// manage the input thread.
pub type Result<T> = ::std::result::Result<T, Error>;

/// The underlying cause of an [`Error`].
#[derive(Clone, Debug, PartialEq, Eq, ::thiserror::Error)]
pub enum ErrorKind {
    /// An OS call failed. Carries the OS error code and the system error
    /// message gathered at the point of failure.
    #[error("OS error {code:#010x}: {message}")]
    Os { code: i32, message: String },

    /// The input thread could not be started.
    #[error("failed to spawn input thread: {0}")]
    WorkerSpawn(String),

    /// The input thread ended before it signalled readiness.
    #[error("input thread exited before signalling readiness")]
    WorkerExited,

    /// The operation requires a live message window, but it has already been
    /// torn down.
    #[error("message window has already been destroyed")]
    Destroyed,

    /// A window class name or title contained an interior nul.
    #[error("invalid window string {0:?}: contains a nul character")]
    InvalidString(String),
}

impl ErrorKind {
    /// Captures the calling thread's last OS error.
    pub(crate) fn last_os_error() -> Self {
        io::Error::last_os_error().into()
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        Self::Os {
            code: err.raw_os_error().unwrap_or_default(),
            message: err.to_string(),
        }
    }
}

#[cfg(windows)]
impl From<::windows::core::Error> for ErrorKind {
    fn from(err: ::windows::core::Error) -> Self {
        Self::Os {
            code: err.code().0,
            message: err.message().to_string_lossy(),
        }
    }
}

/// Returns the calling thread's last OS error, or `Ok` if it is
/// `ERROR_SUCCESS`.
///
/// Needed for functions like `SetWindowLongPtrW` whose return value cannot
/// distinguish success from failure.
#[cfg(windows)]
pub(crate) fn get_last_err() -> Result<()> {
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(0) | None => Ok(()),
        Some(_) => Err(ErrorKind::from(err).into()),
    }
}

/// Clears the last error by setting the system error value to
/// `ERROR_SUCCESS`.
#[cfg(windows)]
pub(crate) fn clear_last_error() {
    unsafe {
        ::windows::Win32::Foundation::SetLastError(::windows::Win32::Foundation::NO_ERROR);
    }
}

/// Error type for the crate. The error attempts to pro-actively capture as
/// much context as possible (error codes, system error message strings, the
/// failing OS function, etc).
#[derive(Clone, Debug)]
pub struct Error {
    /// The underlying cause. Implements [`Display`] to conveniently print any
    /// OS error codes or system error messages which were gathered at the
    /// point of the error.
    ///
    /// [`Display`]: std::fmt::Display
    kind: ErrorKind,

    /// The name of the OS API function which failed.
    function: Option<&'static str>,

    /// An optional context information which describes what was happening
    /// at the time error.
    context: Option<String>,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            kind,
            function,
            context,
        } = &self;

        if let Some(context) = context {
            write!(f, "{context}\nCaused by:\n    {kind}")?;
        } else {
            write!(f, "{kind}")?;
        }

        if let Some(function) = function {
            write!(f, " ({function})")?;
        }

        Ok(())
    }
}

impl ::std::error::Error for Error {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            function: None,
            context: None,
        }
    }
}

impl Error {
    /// The underlying cause of the error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the underlying OS error code, if any.
    pub fn code(&self) -> Option<i32> {
        match self.kind {
            ErrorKind::Os { code, .. } => Some(code),
            _ => None,
        }
    }

    /// The name of the OS function which failed, if known.
    pub fn function(&self) -> Option<&'static str> {
        self.function
    }
}

/// A crate-private trait which allows context information to be attached to
/// fallible types.
///
/// This is useful to attach high level context information and track which
/// particular OS function failed, something that might not be obvious when
/// relying on the inner OS error alone.
pub(crate) trait Context<T> {
    /// Attach the name of the function which failed to the error as additional
    /// context.
    fn function(self, function: &'static str) -> Result<T>
    where
        Self: Sized;

    /// Attach a context message to a fallible type and return crate error.
    fn context(self, ctx: impl AsRef<str>) -> Result<T>
    where
        Self: Sized;
}

impl<T> Context<T> for Result<T> {
    fn function(mut self, f: &'static str) -> Result<T> {
        if let Err(err) = &mut self {
            err.function = Some(f);
        }
        self
    }

    fn context(mut self, ctx: impl AsRef<str>) -> Result<T> {
        if let Err(err) = &mut self {
            err.context = Some(ctx.as_ref().to_owned());
        }
        self
    }
}

/// A `None` is taken to mean the OS call failed and left its reason in the
/// thread's last-error slot.
impl<T> Context<T> for Option<T> {
    fn function(self, function: &'static str) -> Result<T> {
        self.ok_or_else(|| Error {
            kind: ErrorKind::last_os_error(),
            function: Some(function),
            context: None,
        })
    }

    fn context(self, ctx: impl AsRef<str>) -> Result<T> {
        self.ok_or_else(|| Error {
            kind: ErrorKind::last_os_error(),
            function: None,
            context: Some(ctx.as_ref().to_owned()),
        })
    }
}

#[cfg(windows)]
impl<T> Context<T> for ::std::result::Result<T, ::windows::core::Error> {
    fn function(self, function: &'static str) -> Result<T> {
        self.map_err(|source| Error {
            kind: source.into(),
            context: None,
            function: Some(function),
        })
    }

    fn context(self, ctx: impl AsRef<str>) -> Result<T> {
        self.map_err(|source| Error {
            kind: source.into(),
            context: Some(ctx.as_ref().to_owned()),
            function: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ::pretty_assertions::assert_eq;

    #[test]
    fn test_display_with_context_and_function() {
        let err = Err::<(), _>(Error::from(ErrorKind::Os {
            code: 5,
            message: "Access is denied.".to_owned(),
        }))
        .context("Failed to register for raw input")
        .function("RegisterRawInputDevices")
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Failed to register for raw input\nCaused by:\n    \
             OS error 0x00000005: Access is denied. (RegisterRawInputDevices)"
        );
        assert_eq!(err.code(), Some(5));
        assert_eq!(err.function(), Some("RegisterRawInputDevices"));
    }

    #[test]
    fn test_display_without_context() {
        let err = Error::from(ErrorKind::WorkerExited);
        assert_eq!(
            err.to_string(),
            "input thread exited before signalling readiness"
        );
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_option_context_is_os_error() {
        let err = None::<u32>.function("GetCursorPos").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Os { .. }));
        assert_eq!(err.function(), Some("GetCursorPos"));
    }

    #[test]
    fn test_ok_values_pass_through() {
        let val = Some(7).context("unused").unwrap();
        assert_eq!(val, 7);
    }
}
