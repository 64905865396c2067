pub mod config;
pub mod id;
pub mod model;
pub mod transform;

pub use config::CanvasConfig;
pub use id::{EDGE_SEPARATOR, EdgeId, NodeId};
pub use model::*;
pub use transform::{clamp_zoom, logical_to_screen, screen_to_logical};
