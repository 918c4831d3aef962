//! Discovery, classification and tracking of keyboards and mice.

mod classify;
mod kind;
mod registry;

pub use classify::*;
pub use kind::*;
pub use registry::*;
