//! Raw input payloads and the keyboard and mouse state they drive.

pub mod keyboard;
pub mod mouse;
mod raw;

pub use raw::*;
