//! Mouse payloads and mouse state.

mod event;
mod mouse;

pub use event::*;
pub use mouse::*;
