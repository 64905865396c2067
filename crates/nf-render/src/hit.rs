//! Hit testing: screen point → canvas item.
//!
//! Walks the projected nodes front-to-back (last painted = topmost), checking
//! the output handle, then the input handle, then the body. Edges are only
//! considered when no node is hit; the closest curve within tolerance wins.

use crate::projection::Projection;
use kurbo::{ParamCurveNearest, Point};
use nf_core::config::CanvasConfig;
use nf_core::id::{EdgeId, NodeId};

/// Curve-distance accuracy in screen pixels.
const NEAREST_ACCURACY: f64 = 1e-3;

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// The connect handle on the node's right edge.
    OutputHandle(NodeId),
    /// The receiving handle on the node's left edge.
    InputHandle(NodeId),
    /// Anywhere else inside the node box.
    Node(NodeId),
    Edge(EdgeId),
}

impl HitTarget {
    /// The node involved, if the hit was on a node or one of its handles.
    pub fn node(self) -> Option<NodeId> {
        match self {
            HitTarget::OutputHandle(id) | HitTarget::InputHandle(id) | HitTarget::Node(id) => {
                Some(id)
            }
            HitTarget::Edge(_) => None,
        }
    }
}

/// Find the topmost item at screen position (px, py).
/// Returns `None` if nothing is hit (background).
pub fn hit_test(projection: &Projection, config: &CanvasConfig, px: f64, py: f64) -> Option<HitTarget> {
    let pointer = Point::new(px, py);
    let handle_r = (config.handle_radius * projection.zoom) as f64;

    for view in projection.nodes.iter().rev() {
        if view.rect.output_anchor().distance(pointer) <= handle_r {
            return Some(HitTarget::OutputHandle(view.id));
        }
        if view.rect.input_anchor().distance(pointer) <= handle_r {
            return Some(HitTarget::InputHandle(view.id));
        }
        if view.rect.contains(px, py) {
            return Some(HitTarget::Node(view.id));
        }
    }

    let tolerance = config.edge_hit_tolerance as f64;
    projection
        .edges
        .iter()
        .map(|e| (e.id, e.curve.nearest(pointer, NEAREST_ACCURACY).distance_sq))
        .filter(|(_, d2)| *d2 <= tolerance * tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| HitTarget::Edge(id))
}
