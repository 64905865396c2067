pub mod hit;
pub mod projection;

pub use hit::{HitTarget, hit_test};
pub use projection::{EdgeView, NodeView, Projection, ProjectionState, ScreenRect, project};
