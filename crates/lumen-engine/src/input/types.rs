use std::time::Instant;

use glam::Vec2;

/// Mouse button identifier.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Other,
}

/// Source of a pointer event.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PointerKind {
    Mouse(MouseButton),
    /// Touch number `index` of the current gesture.
    Touch(usize),
}

/// Platform-agnostic input event payload.
///
/// Positions are view-local points; deltas are in the same units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEventKind {
    PointerDown { pointer: PointerKind, position: Vec2 },
    PointerUp { pointer: PointerKind, position: Vec2 },
    PointerDrag { pointer: PointerKind, delta: Vec2 },
    Scroll { delta: Vec2 },
    KeyDown { key_code: u16 },
    KeyUp { key_code: u16 },
}

/// Timestamped input event as queued by `InputManager`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct InputEvent {
    pub timestamp: Instant,
    pub kind: InputEventKind,
}

/// Batch queries over a fetched slice of events.
pub trait InputEventsExt {
    /// Sum of drag deltas of `button`, or `None` if it was not dragged.
    fn mouse_drag(&self, button: MouseButton) -> Option<Vec2>;

    /// Sum of scroll deltas, or `None` without scroll events.
    fn scroll(&self) -> Option<Vec2>;

    /// Whether a key-down for `key_code` is in the batch.
    fn is_key_down(&self, key_code: u16) -> bool;
}

impl InputEventsExt for [InputEvent] {
    fn mouse_drag(&self, button: MouseButton) -> Option<Vec2> {
        sum_deltas(self.iter().filter_map(|e| match e.kind {
            InputEventKind::PointerDrag {
                pointer: PointerKind::Mouse(b),
                delta,
            } if b == button => Some(delta),
            _ => None,
        }))
    }

    fn scroll(&self) -> Option<Vec2> {
        sum_deltas(self.iter().filter_map(|e| match e.kind {
            InputEventKind::Scroll { delta } => Some(delta),
            _ => None,
        }))
    }

    fn is_key_down(&self, key_code: u16) -> bool {
        self.iter()
            .any(|e| matches!(e.kind, InputEventKind::KeyDown { key_code: k } if k == key_code))
    }
}

fn sum_deltas(deltas: impl Iterator<Item = Vec2>) -> Option<Vec2> {
    deltas.fold(None, |acc, d| Some(acc.unwrap_or(Vec2::ZERO) + d))
}
