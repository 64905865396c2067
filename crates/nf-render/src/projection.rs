//! Flow graph → screen-space projection.
//!
//! Produces everything a presentation layer needs to draw one frame: node
//! rectangles scaled by zoom, per-node interaction flags, and a cubic curve
//! for each edge running from the source's right-centre anchor to the
//! target's left-centre anchor. The projection is a pure function of the
//! graph and interaction state, so calling it twice yields the same frame.

use kurbo::{CubicBez, Point, Shape};
use nf_core::config::CanvasConfig;
use nf_core::id::{EdgeId, NodeId};
use nf_core::model::{FlowGraph, Node, NodeKind, Selection};
use nf_core::transform::logical_to_screen;
use serde::Serialize;

/// Tolerance used when flattening edge curves for SVG output.
const SVG_TOLERANCE: f64 = 0.1;

/// Interaction state the projection needs to set per-item flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionState {
    pub zoom: f32,
    pub selected: Option<Selection>,
    pub editing: Option<NodeId>,
    pub dragging: Option<NodeId>,
    pub connecting: Option<NodeId>,
}

impl Default for ProjectionState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            selected: None,
            editing: None,
            dragging: None,
            connecting: None,
        }
    }
}

/// Screen-space rectangle of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    /// Where incoming edges attach.
    pub fn input_anchor(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }

    /// Where outgoing edges attach (and the connect handle sits).
    pub fn output_anchor(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height / 2.0)
    }
}

/// One node as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub accent: &'static str,
    pub rect: ScreenRect,
    pub selected: bool,
    pub editing: bool,
    pub dragging: bool,
    pub connecting: bool,
}

/// One edge as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub selected: bool,
    /// SVG path data for the curve (`M … C …`).
    pub path: String,
    #[serde(skip)]
    pub curve: CubicBez,
}

/// A full frame: nodes in paint order, then edges in creation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub zoom: f32,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    /// Screen anchor of the live connector while a connect gesture is open.
    /// The host draws from here to the pointer.
    pub pending_connector: Option<(f64, f64)>,
}

impl Projection {
    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Screen rectangle for a node at the given zoom.
pub fn node_rect(node: &Node, zoom: f32, config: &CanvasConfig) -> ScreenRect {
    let origin = logical_to_screen(node.position, zoom);
    ScreenRect {
        x: origin.x as f64,
        y: origin.y as f64,
        width: (config.node_width * zoom) as f64,
        height: (config.node_height * zoom) as f64,
    }
}

/// Horizontal S-curve between a source and target box.
///
/// Control points extend straight out of each anchor by half the horizontal
/// gap, but never less than `min_curve_offset` (scaled), so back-links
/// (target left of source) still leave and enter their handles sideways.
pub fn edge_curve(from: &ScreenRect, to: &ScreenRect, zoom: f32, config: &CanvasConfig) -> CubicBez {
    let p0 = from.output_anchor();
    let p3 = to.input_anchor();
    let reach = ((p3.x - p0.x).abs() * 0.5).max((config.min_curve_offset * zoom) as f64);
    CubicBez::new(
        p0,
        Point::new(p0.x + reach, p0.y),
        Point::new(p3.x - reach, p3.y),
        p3,
    )
}

/// Build the projection for one frame.
pub fn project(graph: &FlowGraph, state: &ProjectionState, config: &CanvasConfig) -> Projection {
    let zoom = state.zoom;
    let selected_node = state.selected.and_then(Selection::node);
    let selected_edge = state.selected.and_then(Selection::edge);

    let nodes: Vec<NodeView> = graph
        .nodes()
        .map(|node| NodeView {
            id: node.id,
            kind: node.kind(),
            label: node.label.clone(),
            accent: node.kind().accent(),
            rect: node_rect(node, zoom, config),
            selected: selected_node == Some(node.id),
            editing: state.editing == Some(node.id),
            dragging: state.dragging == Some(node.id),
            connecting: state.connecting == Some(node.id),
        })
        .collect();

    let rect_of = |id: NodeId| nodes.iter().find(|n| n.id == id).map(|n| n.rect);

    let edges = graph
        .edges()
        .filter_map(|edge| {
            let (Some(from), Some(to)) = (rect_of(edge.source), rect_of(edge.target)) else {
                log::trace!("skipping edge {} with unprojected endpoint", edge.id);
                return None;
            };
            let curve = edge_curve(&from, &to, zoom, config);
            Some(EdgeView {
                id: edge.id,
                source: edge.source,
                target: edge.target,
                selected: selected_edge == Some(edge.id),
                path: curve.to_path(SVG_TOLERANCE).to_svg(),
                curve,
            })
        })
        .collect();

    let pending_connector = state
        .connecting
        .and_then(rect_of)
        .map(|r| {
            let a = r.output_anchor();
            (a.x, a.y)
        });

    Projection {
        zoom,
        nodes,
        edges,
        pending_connector,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nf_core::model::Point as LogicalPoint;
    use pretty_assertions::assert_eq;

    fn two_node_graph() -> (FlowGraph, NodeId, NodeId) {
        let mut g = FlowGraph::new();
        let a = NodeId::intern("proj_a");
        let b = NodeId::intern("proj_b");
        g.add_node(Node::new(a, NodeKind::Input, LogicalPoint::new(100.0, 100.0)));
        g.add_node(Node::new(b, NodeKind::Output, LogicalPoint::new(400.0, 100.0)));
        g.add_edge(a, b).unwrap();
        (g, a, b)
    }

    #[test]
    fn node_rects_scale_with_zoom() {
        let (g, a, _) = two_node_graph();
        let config = CanvasConfig::default();
        let state = ProjectionState {
            zoom: 2.0,
            ..Default::default()
        };
        let p = project(&g, &state, &config);
        let view = p.node(a).unwrap();
        assert_eq!(
            view.rect,
            ScreenRect {
                x: 200.0,
                y: 200.0,
                width: 320.0,
                height: 112.0
            }
        );
    }

    #[test]
    fn edge_runs_between_anchors() {
        let (g, a, b) = two_node_graph();
        let config = CanvasConfig::default();
        let p = project(&g, &ProjectionState::default(), &config);
        let edge = &p.edges[0];
        let from = p.node(a).unwrap().rect.output_anchor();
        let to = p.node(b).unwrap().rect.input_anchor();
        assert_eq!(edge.curve.p0, from);
        assert_eq!(edge.curve.p3, to);
        assert!(edge.path.starts_with('M'), "path: {}", edge.path);
    }

    #[test]
    fn back_link_keeps_minimum_reach() {
        let config = CanvasConfig::default();
        let from = ScreenRect { x: 300.0, y: 0.0, width: 160.0, height: 56.0 };
        let to = ScreenRect { x: 0.0, y: 0.0, width: 160.0, height: 56.0 };
        let c = edge_curve(&from, &to, 1.0, &config);
        assert!(c.p1.x > c.p0.x, "source control point must exit rightwards");
        assert!(c.p2.x < c.p3.x, "target control point must enter from the left");
    }

    #[test]
    fn flags_follow_state() {
        let (g, a, b) = two_node_graph();
        let config = CanvasConfig::default();
        let state = ProjectionState {
            zoom: 1.0,
            selected: Some(Selection::Node(b)),
            editing: Some(b),
            dragging: None,
            connecting: Some(a),
        };
        let p = project(&g, &state, &config);
        let va = p.node(a).unwrap();
        let vb = p.node(b).unwrap();
        assert!(va.connecting && !va.selected);
        assert!(vb.selected && vb.editing);
        assert_eq!(p.pending_connector, Some((260.0, 128.0)));
    }

    #[test]
    fn projection_is_deterministic() {
        let g = FlowGraph::seeded_topology();
        let config = CanvasConfig::default();
        let state = ProjectionState::default();
        assert_eq!(project(&g, &state, &config), project(&g, &state, &config));
    }
}
