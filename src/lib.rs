//! Polled keyboard and mouse state for every attached device, read through
//! the Win32 Raw Input API.
//!
//! An [`InputManager`] runs a background input thread with a hidden
//! message-only window. The thread discovers keyboards and mice (following
//! them as they are plugged in and out), decodes their raw input reports and
//! keeps per-device state. Applications poll merged snapshots whenever it
//! suits them, typically once per frame:
//!
//! ```no_run
//! use ::rawpoll::{
//!     input::{keyboard::Key, mouse::MouseButton},
//!     Builder,
//! };
//!
//! # #[cfg(windows)]
//! # fn main() {
//! let input = Builder::new().build().expect("Failed to start input thread");
//!
//! let keyboard = input.keyboard_state();
//! let mouse = input.mouse_state();
//! if keyboard.is_key_pressed(Key::LeftShift) && mouse.is_button_pressed(MouseButton::Left) {
//!     println!("shift-click at {:?}", mouse.position());
//! }
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! The OS is reached through the traits in [`platform`]; the Win32 backend is
//! only compiled on Windows, while [`platform::mock`] runs anywhere.

pub mod devices;
mod errors;
pub mod input;
mod manager;
pub mod platform;
mod types;

pub use errors::{Error, ErrorKind, Result};
pub use manager::{Builder, InputManager};
pub use types::*;
