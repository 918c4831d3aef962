//! The hidden message-only window which receives raw input.

use super::class::WindowClass;
use crate::{
    errors::{self, Context, Error, ErrorKind, Result},
    input::RawInput,
    platform::{
        Dispatcher, MessageHandler, MessageWindow, WindowCloser, WindowMessage, WindowOptions,
    },
    types::WindowHandle,
};

use ::std::{
    cell::{Cell, UnsafeCell},
    ffi::c_void,
    marker::PhantomData,
    mem::size_of,
    num::NonZeroIsize,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use ::tap::Pipe;
use ::tracing::{debug, error, trace, warn};
use ::widestring::U16CString;
use ::windows::{
    core::PCWSTR,
    Win32::{
        Foundation::{HWND, LPARAM, LRESULT, WPARAM},
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            Input::{GetRawInputData, HRAWINPUT, RAWINPUTHEADER, RID_INPUT},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
                GetMessageW, GetWindowLongPtrW, PeekMessageW, PostMessageW, PostQuitMessage,
                SetWindowLongPtrW, TranslateMessage, CREATESTRUCTW, GWLP_USERDATA, GWLP_WNDPROC,
                HWND_MESSAGE, MSG, PM_REMOVE, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE,
                WM_DESTROY, WM_DEVICECHANGE, WM_INPUT, WM_NCCREATE, WM_NCDESTROY,
            },
        },
    },
};

/// A message-only window (parented to `HWND_MESSAGE`) and its message pump.
///
/// A [`Win32Window`] is `!Sync + !Send` as Win32 windows must be pumped by the
/// thread on which they were created. Use [`closer`](MessageWindow::closer)
/// to tear it down from elsewhere.
pub struct Win32Window {
    /// A clone of this object is held on the Win32 side and released when the
    /// window is destroyed.
    inner: Rc<WindowInner>,
}

impl Win32Window {
    pub(super) fn new(options: &WindowOptions) -> Result<Self> {
        debug!(wnd_title = %options.title, "Creating message window");
        WindowInner::new(options).map(|inner| Self { inner })
    }
}

impl MessageWindow for Win32Window {
    type Closer = Win32Closer;

    fn handle(&self) -> WindowHandle {
        WindowHandle(self.inner.hwnd.get().0)
    }

    fn drain(&mut self) -> Result<usize> {
        let mut msg = MSG::default();
        let mut count = 0;
        while unsafe { PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE) }.as_bool() {
            unsafe {
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
            count += 1;
        }
        trace!(count, "Drained message queue");
        Ok(count)
    }

    fn set_handler(&mut self, handler: MessageHandler) {
        self.inner.dispatcher.set_handler(handler);
    }

    fn run(&mut self) -> Result<()> {
        if !self.inner.alive.load(Ordering::SeqCst) {
            return Err(ErrorKind::Destroyed.into());
        }

        let mut msg = MSG::default();
        loop {
            match unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 {
                -1 => {
                    return None::<()>
                        .context("Failed to retrieve message for input window")
                        .function("GetMessageW")
                }
                0 => break,
                _ => unsafe {
                    TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                },
            }
        }

        debug!("Message loop finished");
        Ok(())
    }

    fn closer(&self) -> Win32Closer {
        Win32Closer {
            hwnd: self.inner.hwnd.get().0,
            alive: self.inner.alive.clone(),
        }
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        if self.inner.alive.load(Ordering::SeqCst) {
            if let Err(e) = self.inner.destroy() {
                error!(error = %e);
            }
        }
    }
}

/// Posts `WM_CLOSE` to a [`Win32Window`]; its pump thread then destroys the
/// window, which ends the message loop.
pub struct Win32Closer {
    hwnd: isize,
    alive: Arc<AtomicBool>,
}

impl WindowCloser for Win32Closer {
    fn close(&self) -> Result<()> {
        if !self.alive.load(Ordering::SeqCst) {
            return Ok(());
        }
        debug!(hwnd = self.hwnd, "Requesting input window close");
        unsafe { PostMessageW(HWND(self.hwnd), WM_CLOSE, WPARAM(0), LPARAM(0)) }
            .ok()
            .context("Failed to request input window close")
            .function("PostMessageW")
    }
}

struct WindowInner {
    /// Force !Send & !Sync, as our window can only be used by the thread on
    /// which it was created.
    phantom: PhantomData<UnsafeCell<()>>,
    /// The window class is de-registered once the last window using it is
    /// gone.
    window_class: Arc<WindowClass>,
    /// Zero once the window has been destroyed on the Win32 side.
    hwnd: Cell<HWND>,
    /// Cleared on `WM_NCDESTROY`. Shared with [`Win32Closer`]s.
    alive: Arc<AtomicBool>,
    dispatcher: Dispatcher,
}

impl WindowInner {
    fn new(options: &WindowOptions) -> Result<Rc<Self>> {
        let title = U16CString::from_str(&options.title)
            .map_err(|_| Error::from(ErrorKind::InvalidString(options.title.clone())))?;

        let this = Rc::new(Self {
            phantom: Default::default(),
            window_class: WindowClass::get_or_create(&options.class_name, Self::wnd_proc_setup)?,
            hwnd: Default::default(),
            alive: Arc::new(AtomicBool::new(false)),
            dispatcher: Dispatcher::default(),
        });

        let hwnd = {
            let module = unsafe { GetModuleHandleW(None) }
                .context("Failed to construct input window")
                .function("GetModuleHandleW")?;

            unsafe {
                CreateWindowExW(
                    WINDOW_EX_STYLE::default(),
                    PCWSTR::from_raw(this.window_class.class_name().as_ptr()),
                    PCWSTR::from_raw(title.as_ptr()),
                    WINDOW_STYLE::default(),
                    0,
                    0,
                    0,
                    0,
                    HWND_MESSAGE,
                    None,
                    module,
                    Some(Rc::into_raw(this.clone()) as *const c_void),
                )
            }
            .pipe(|hwnd| (hwnd.0 != 0).then_some(hwnd))
            .context("Failed to create input window")
            .function("CreateWindowExW")?
        };
        this.hwnd.set(hwnd);
        this.alive.store(true, Ordering::SeqCst);
        debug!(hwnd = hwnd.0, "Created input window");

        Ok(this)
    }

    fn destroy(&self) -> Result<()> {
        unsafe { DestroyWindow(self.hwnd.get()) }
            .ok()
            .context("Failed to destroy input window")
            .function("DestroyWindow")
    }

    /// Copies the `RAWINPUT` buffer for a `WM_INPUT` message.
    fn read_raw_input(lparam: LPARAM) -> Result<Vec<u8>> {
        let handle = HRAWINPUT(lparam.0);
        let header_size = size_of::<RAWINPUTHEADER>() as u32;

        let mut size = 0_u32;
        let ret = unsafe { GetRawInputData(handle, RID_INPUT, None, &mut size, header_size) };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to query raw input size")
            .function("GetRawInputData")?;

        let mut buf = vec![0_u8; size as usize];
        let ret = unsafe {
            GetRawInputData(
                handle,
                RID_INPUT,
                Some(buf.as_mut_ptr() as *mut c_void),
                &mut size,
                header_size,
            )
        };
        (ret != u32::MAX)
            .then_some(())
            .context("Failed to read raw input")
            .function("GetRawInputData")?;
        buf.truncate(ret as usize);

        Ok(buf)
    }

    /// Handles a Win32 message.
    ///
    /// ## Return Value
    ///
    /// Returns `Some` if the message was handled and should not be forwarded
    /// to the default window procedure. Returns `None` if the message should
    /// still be forwarded to the default procedure.
    fn handle_message(&self, umsg: u32, wparam: WPARAM, lparam: LPARAM) -> Option<LRESULT> {
        match umsg {
            WM_INPUT => {
                match Self::read_raw_input(lparam) {
                    Ok(buf) => match RawInput::from_bytes(&buf) {
                        Some(input) => self.dispatcher.dispatch(&WindowMessage::Input(input)),
                        None => warn!(len = buf.len(), "Malformed raw input"),
                    },
                    Err(e) => warn!(error = %e),
                }
                // The default procedure releases the raw input buffer.
                None
            }
            WM_DEVICECHANGE => {
                trace!(event = wparam.0, "Device change");
                self.dispatcher.dispatch(&WindowMessage::DeviceChange);
                Some(LRESULT(1))
            }
            WM_CLOSE => {
                if let Err(e) = self.destroy() {
                    error!(error = %e);
                }
                Some(LRESULT(0))
            }
            WM_DESTROY => {
                unsafe { PostQuitMessage(0) };
                Some(LRESULT(0))
            }
            WM_NCDESTROY => {
                let hwnd = self.hwnd.get();
                debug!(hwnd = hwnd.0, "Destroying input window");
                self.alive.store(false, Ordering::SeqCst);

                // Our window is being destroyed, so we must clean up our Rc'd
                // handle on the Win32 side.
                errors::clear_last_error();
                let self_ = unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) };
                match errors::get_last_err()
                    .context("Failed to clear Rust window reference from Win32 window data")
                    .function("SetWindowLongPtrW")
                {
                    Ok(()) if self_ != 0 => drop(unsafe { Rc::from_raw(self_ as *const Self) }),
                    Ok(()) => {}
                    Err(e) => error!(error = %e),
                }

                self.hwnd.set(HWND(0));
                None
            }
            _ => None,
        }
    }

    /// C-function Win32 window procedure performs one-time setup of the
    /// structures on the Win32 side to associate our Rust object with the Win32
    /// object.
    extern "system" fn wnd_proc_setup(
        hwnd: HWND,
        umsg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        // If we've received a create event, then we populate an `Rc`'ed
        // reference our rust window type in the user data section of the Win32
        // window.
        if umsg == WM_NCCREATE {
            let create_struct = lparam.0 as *const CREATESTRUCTW;
            // SAFETY:
            // The `CREATESTRUCTW` structure is guaranteed by the Win32 API to be
            // valid if we've received an event of type `WM_NCCREATE`.
            let self_ = unsafe { (*create_struct).lpCreateParams } as *const Self;

            errors::clear_last_error();
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, self_ as _);
            }
            if let Err(e) = errors::get_last_err()
                .context("Failed to store reference to Rust window in Win32 window data")
                .function("SetWindowLongPtrW")
            {
                error!(error = %e);
                return LRESULT(0);
            }
            unsafe {
                SetWindowLongPtrW(hwnd, GWLP_WNDPROC, (Self::wnd_proc_thunk as usize) as isize);
            }
            if let Err(e) = errors::get_last_err()
                .context("Failed to swap Win32 window proc function")
                .function("SetWindowLongPtrW")
            {
                error!(error = %e);
                return LRESULT(0);
            }
        }

        // We _always_ pass our message through to the default window procedure.
        unsafe { DefWindowProcW(hwnd, umsg, wparam, lparam) }
    }

    /// A minimal shim which forwards Win32 window proc messages to our own
    /// type for handling.
    extern "system" fn wnd_proc_thunk(
        hwnd: HWND,
        umsg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if let Some(ptr) = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) }.pipe(NonZeroIsize::new)
        {
            let self_ = ptr.get() as *const Self;

            unsafe {
                // Add extra retain for the duration of following call
                Rc::increment_strong_count(self_);
                if let Some(result) = Rc::from_raw(self_).handle_message(umsg, wparam, lparam) {
                    return result;
                }
            }
        }

        unsafe { DefWindowProcW(hwnd, umsg, wparam, lparam) }
    }
}
