//! The Win32 Raw Input backend.

mod class;
mod devices;
mod window;

pub use devices::Win32Platform;
pub use window::{Win32Closer, Win32Window};
