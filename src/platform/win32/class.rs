//! Management of Win32 window classes.

use crate::errors::*;

use ::lazy_static::lazy_static;
use ::parking_lot::Mutex;
use ::std::{
    collections::{hash_map::Entry, HashMap},
    num::NonZeroU16,
    sync::{Arc, Weak},
};
use ::tap::prelude::*;
use ::tracing::{debug, error};
use ::widestring::U16CString;
use ::windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::WindowsAndMessaging::{RegisterClassExW, UnregisterClassW, WNDCLASSEXW},
    },
};

/// Typedef for the Win32 windows procedure function - the primary entry point
/// for the Windows message pump.
pub(super) type WndProc = extern "system" fn(HWND, u32, WPARAM, LPARAM) -> LRESULT;

lazy_static! {
    static ref CLASS_REGISTRATIONS: Mutex<HashMap<U16CString, Weak<WindowClass>>> =
        Default::default();
}

/// A RAII object which manages window class registrations.
///
/// A window class is registered with the system the first time one is
/// requested. Later requests for the same class name share the registration,
/// which is released once the last reference is dropped. Message windows
/// live on their own input threads, so the registry is shared between
/// threads.
pub(super) struct WindowClass {
    class_name: U16CString,
}

impl WindowClass {
    /// Gets a handle to an existing window class registration, or registers
    /// the window class for the first time.
    pub(super) fn get_or_create(class_name: &str, wnd_proc_setup: WndProc) -> Result<Arc<Self>> {
        let class_name = U16CString::from_str(class_name)
            .map_err(|_| Error::from(ErrorKind::InvalidString(class_name.to_owned())))?;
        let mut registry = CLASS_REGISTRATIONS.lock();

        match registry.entry(class_name) {
            Entry::Vacant(entry) => {
                let class = Self::register(entry.key().clone(), wnd_proc_setup)?;
                entry.insert(Arc::downgrade(&class));
                Ok(class)
            }
            Entry::Occupied(mut entry) => {
                if let Some(strong_ref) = entry.get().upgrade() {
                    Ok(strong_ref)
                } else {
                    let class = Self::register(entry.key().clone(), wnd_proc_setup)?;
                    entry.insert(Arc::downgrade(&class));
                    Ok(class)
                }
            }
        }
    }

    pub(super) fn class_name(&self) -> &U16CString {
        &self.class_name
    }

    fn register(class_name: U16CString, wnd_proc_setup: WndProc) -> Result<Arc<Self>> {
        debug!(
            wnd_class = class_name.to_string_lossy(),
            "Register window class"
        );

        let module = unsafe { GetModuleHandleW(None) }
            .context("Failed to get module handle to register window class")
            .function("GetModuleHandleW")?;

        let wnd_class = WNDCLASSEXW {
            cbSize: ::std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(wnd_proc_setup),
            hInstance: module,
            lpszClassName: PCWSTR::from_raw(class_name.as_ptr()),
            ..Default::default()
        };
        let _atom = unsafe { RegisterClassExW(&wnd_class) }
            .pipe(NonZeroU16::new)
            .context("Failed to register window class")
            .function("RegisterClassExW")?;

        Ok(Arc::new(Self { class_name }))
    }

    fn unregister(&self) -> Result<()> {
        debug!(wnd_class = ?self.class_name().to_string_lossy(), "Unregister window class");
        let module = unsafe { GetModuleHandleW(None) }
            .context("Failed to get current module handle")
            .function("GetModuleHandleW")?;
        unsafe { UnregisterClassW(PCWSTR::from_raw(self.class_name().as_ptr()), module) }
            .ok()
            .context("Failed to unregister window class")
            .function("UnregisterClassW")?;
        Ok(())
    }
}

impl Drop for WindowClass {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            error!(error = %e);
        }
    }
}
