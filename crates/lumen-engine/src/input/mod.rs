//! Input subsystem.
//!
//! Public API is platform-agnostic. Platform glue is responsible for
//! translating native events into `InputEventKind`s and adding them to an
//! `InputManager`; frame callbacks fetch them in batches.

mod manager;
mod types;

pub use manager::{InputManager, EVENT_RETENTION};
pub use types::{InputEvent, InputEventKind, InputEventsExt, MouseButton, PointerKind};
