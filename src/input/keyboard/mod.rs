//! Keyboard payloads, key translation and keyboard state.

mod codes;
mod event;
mod keyboard;
pub mod translate;
mod vkey;

pub use codes::*;
pub use event::*;
pub use keyboard::*;
pub use translate::{extended_scan_code, translate_key};
pub use vkey::*;
