pub mod controller;
pub mod input;
pub mod shortcuts;

pub use controller::{CanvasController, Gesture};
pub use input::{InputEvent, Modifiers, PointerEvent, PointerPhase};
pub use shortcuts::{ShortcutAction, ShortcutMap};
