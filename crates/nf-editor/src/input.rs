//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and pen events from the host into a small value
//! type the controller consumes. Coordinates are screen-space, relative to
//! the canvas origin; the controller converts them with the current zoom.

use nf_core::model::Point;

/// Keyboard modifier state at the time of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// Which part of a pointer gesture an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// Second activation in quick succession (dblclick).
    DoubleClick,
}

/// A pointer event in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f32,
    pub y: f32,
    /// Whether the primary button is currently held.
    pub pressed: bool,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A normalized input event from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),

    /// Keyboard event. `key` is the DOM `KeyboardEvent.key` value.
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn from_pointer_down(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::pointer(PointerPhase::Down, x, y, true, modifiers)
    }

    pub fn from_pointer_move(x: f32, y: f32, pressed: bool, modifiers: Modifiers) -> Self {
        Self::pointer(PointerPhase::Move, x, y, pressed, modifiers)
    }

    pub fn from_pointer_up(x: f32, y: f32, modifiers: Modifiers) -> Self {
        Self::pointer(PointerPhase::Up, x, y, false, modifiers)
    }

    pub fn from_double_click(x: f32, y: f32) -> Self {
        Self::pointer(PointerPhase::DoubleClick, x, y, false, Modifiers::NONE)
    }

    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
        }
    }

    fn pointer(phase: PointerPhase, x: f32, y: f32, pressed: bool, modifiers: Modifiers) -> Self {
        Self::Pointer(PointerEvent {
            phase,
            x,
            y,
            pressed,
            modifiers,
        })
    }
}
