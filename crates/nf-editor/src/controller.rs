//! Graph canvas controller.
//!
//! Owns the flow graph and the single source of truth for interaction state.
//! Pointer gestures are translated into mutations here; nothing else is
//! supposed to touch the graph directly (palette and inspector go through
//! the operations below).
//!
//! ## Gesture modes
//!
//! | From         | Event                         | To           |
//! |--------------|-------------------------------|--------------|
//! | `Idle`       | down on node body             | `Dragging`   |
//! | `Idle`       | down on output handle         | `Connecting` |
//! | `Idle`       | double-click on node          | `Editing`    |
//! | `Dragging`   | up                            | `Idle`       |
//! | `Connecting` | up over a node / background   | `Idle`       |
//! | `Editing`    | Enter / blur / select elsewhere | `Idle`     |
//!
//! A busy mode never hands over to another busy mode directly; starting a
//! drag or connect while editing closes the edit first.
//!
//! Every operation is total: calls that make no sense in the current state
//! are no-ops. Methods return `true` when something visible changed.

use crate::input::{InputEvent, PointerEvent, PointerPhase};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use nf_core::config::CanvasConfig;
use nf_core::id::{EdgeId, NodeId};
use nf_core::model::{FlowGraph, Node, NodeKind, Point, Selection};
use nf_core::transform::{clamp_zoom, screen_to_logical};
use nf_render::hit::{HitTarget, hit_test};
use nf_render::projection::{Projection, ProjectionState, project};

/// The exclusive gesture the canvas is in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// A node follows the pointer. `offset` is pointer minus node position,
    /// in logical space, captured at drag start.
    Dragging { node: NodeId, offset: Point },
    /// A connection is pending from `source`'s output handle.
    Connecting { source: NodeId },
    /// The node's label is open in an inline editor.
    Editing { node: NodeId },
}

pub struct CanvasController {
    graph: FlowGraph,
    config: CanvasConfig,
    zoom: f32,
    selected: Option<Selection>,
    gesture: Gesture,
}

impl Default for CanvasController {
    fn default() -> Self {
        Self::new(FlowGraph::new())
    }
}

impl CanvasController {
    /// Create a controller over `graph` with the default configuration.
    pub fn new(graph: FlowGraph) -> Self {
        Self::with_config(graph, CanvasConfig::default())
    }

    /// Create a controller with an explicit configuration. An invalid config
    /// is replaced by the default.
    pub fn with_config(graph: FlowGraph, config: CanvasConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("{e}; falling back to default canvas config");
                CanvasConfig::default()
            }
        };
        let zoom = clamp_zoom(1.0, &config).unwrap_or(config.min_zoom);
        Self {
            graph,
            config,
            zoom,
            selected: None,
            gesture: Gesture::Idle,
        }
    }

    // ─── Read access ─────────────────────────────────────────────────────

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn selected(&self) -> Option<Selection> {
        self.selected
    }

    pub fn dragging_node_id(&self) -> Option<NodeId> {
        match self.gesture {
            Gesture::Dragging { node, .. } => Some(node),
            _ => None,
        }
    }

    pub fn connecting_from_id(&self) -> Option<NodeId> {
        match self.gesture {
            Gesture::Connecting { source } => Some(source),
            _ => None,
        }
    }

    pub fn editing_node_id(&self) -> Option<NodeId> {
        match self.gesture {
            Gesture::Editing { node } => Some(node),
            _ => None,
        }
    }

    /// Convert a screen point with the zoom in effect right now.
    pub fn to_logical(&self, screen: Point) -> Point {
        screen_to_logical(screen, self.zoom)
    }

    /// The frame a presentation layer should draw.
    pub fn projection(&self) -> Projection {
        let state = ProjectionState {
            zoom: self.zoom,
            selected: self.selected,
            editing: self.editing_node_id(),
            dragging: self.dragging_node_id(),
            connecting: self.connecting_from_id(),
        };
        project(&self.graph, &state, &self.config)
    }

    /// Topmost item under a screen point.
    pub fn hit(&self, screen: Point) -> Option<HitTarget> {
        hit_test(&self.projection(), &self.config, screen.x as f64, screen.y as f64)
    }

    // ─── Node creation & inspector ───────────────────────────────────────

    /// Place a new node of `kind` at a logical position. Always succeeds.
    pub fn create_node(&mut self, kind: NodeKind, logical: Point) -> NodeId {
        let id = self.graph.fresh_id(kind);
        let node = Node::new(id, kind, logical);
        log::debug!("create {} at ({}, {})", id, node.position.x, node.position.y);
        self.graph.add_node(node);
        id
    }

    /// Palette drop: the drag payload carries a kind tag and the drop lands
    /// at a screen point. Unknown tags fall back to the default kind.
    pub fn drop_node(&mut self, kind_tag: &str, screen: Point) -> NodeId {
        let logical = self.to_logical(screen);
        self.create_node(NodeKind::from_tag(kind_tag), logical)
    }

    /// Inspector write of a single payload field.
    pub fn set_payload_field(&mut self, id: NodeId, key: &str, value: &str) -> bool {
        self.graph
            .get_mut(id)
            .is_some_and(|node| node.set_field(key, value))
    }

    /// Inspector bulk write: a plain merge of `fields` into the payload.
    pub fn merge_payload<'a, I>(&mut self, id: NodeId, fields: I) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let Some(node) = self.graph.get_mut(id) else {
            return false;
        };
        fields
            .into_iter()
            .fold(false, |changed, (k, v)| node.set_field(k, v) || changed)
    }

    // ─── Drag ────────────────────────────────────────────────────────────

    /// Start moving `id`. Ignored while connecting; closes any open edit.
    pub fn begin_drag(&mut self, id: NodeId, pointer: Point) -> bool {
        if matches!(self.gesture, Gesture::Connecting { .. }) || !pointer.is_finite() {
            return false;
        }
        let Some(node) = self.graph.get(id) else {
            return false;
        };
        let offset = pointer - node.position;
        self.end_edit();
        self.end_drag();
        log::debug!("drag start {id}");
        self.gesture = Gesture::Dragging { node: id, offset };
        self.selected = Some(Selection::Node(id));
        true
    }

    /// Move the dragging node so the grab offset stays under the pointer.
    pub fn update_drag(&mut self, pointer: Point) -> bool {
        let Gesture::Dragging { node, offset } = self.gesture else {
            return false;
        };
        if !pointer.is_finite() {
            return false;
        }
        let Some(n) = self.graph.get_mut(node) else {
            return false;
        };
        let next = pointer - offset;
        if !next.is_finite() || n.position == next {
            return false;
        }
        log::trace!("drag {node} to ({}, {})", next.x, next.y);
        n.position = next;
        true
    }

    pub fn end_drag(&mut self) -> bool {
        if let Gesture::Dragging { node, .. } = self.gesture {
            log::debug!("drag end {node}");
            self.gesture = Gesture::Idle;
            return true;
        }
        false
    }

    // ─── Connect ─────────────────────────────────────────────────────────

    /// Anchor a pending connection at `id`'s output handle.
    pub fn begin_connect(&mut self, id: NodeId) -> bool {
        if matches!(self.gesture, Gesture::Dragging { .. }) || !self.graph.contains(id) {
            return false;
        }
        self.end_edit();
        log::debug!("connect start {id}");
        self.gesture = Gesture::Connecting { source: id };
        true
    }

    /// Finish a pending connection at `target`. Self-loops and duplicate
    /// pairs are declined silently. Connect mode is always left.
    pub fn complete_connect(&mut self, target: NodeId) -> Option<EdgeId> {
        let Gesture::Connecting { source } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        match self.graph.add_edge(source, target) {
            Ok(edge) => {
                log::debug!("connect {edge}");
                Some(edge)
            }
            Err(reason) => {
                log::trace!("connect {source} -> {target} declined: {reason:?}");
                None
            }
        }
    }

    pub fn cancel_connect(&mut self) -> bool {
        if let Gesture::Connecting { source } = self.gesture {
            log::debug!("connect cancelled from {source}");
            self.gesture = Gesture::Idle;
            return true;
        }
        false
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Select a node or edge, or clear the selection. Selecting anything
    /// other than the node being edited closes the editor. Stale IDs are
    /// ignored.
    pub fn select(&mut self, selection: Option<Selection>) -> bool {
        let exists = match selection {
            None => true,
            Some(Selection::Node(id)) => self.graph.contains(id),
            Some(Selection::Edge(id)) => self.graph.contains_edge(id),
        };
        if !exists {
            return false;
        }
        let mut changed = false;
        let keeps_editor = self
            .editing_node_id()
            .is_some_and(|editing| selection == Some(Selection::Node(editing)));
        if !keeps_editor {
            changed |= self.end_edit();
        }
        if self.selected != selection {
            self.selected = selection;
            changed = true;
        }
        changed
    }

    /// Background click: drop every piece of interaction state.
    pub fn click_background(&mut self) -> bool {
        let had_gesture = self.gesture != Gesture::Idle;
        let had_selection = self.selected.is_some();
        if let Gesture::Connecting { source } = self.gesture {
            log::debug!("connect cancelled from {source}");
        }
        self.gesture = Gesture::Idle;
        self.selected = None;
        had_gesture || had_selection
    }

    // ─── Inline edit ─────────────────────────────────────────────────────

    /// Open the inline label editor on `id`. Ignored mid-drag or mid-connect.
    pub fn begin_edit(&mut self, id: NodeId) -> bool {
        if matches!(
            self.gesture,
            Gesture::Dragging { .. } | Gesture::Connecting { .. }
        ) || !self.graph.contains(id)
        {
            return false;
        }
        log::debug!("edit start {id}");
        self.selected = Some(Selection::Node(id));
        self.gesture = Gesture::Editing { node: id };
        true
    }

    /// Store the edited label. Closes the editor if it was open on `id`.
    pub fn commit_edit(&mut self, id: NodeId, label: &str) -> bool {
        let Some(node) = self.graph.get_mut(id) else {
            return false;
        };
        let mut changed = false;
        if node.label != label {
            label.clone_into(&mut node.label);
            changed = true;
        }
        if self.editing_node_id() == Some(id) {
            self.gesture = Gesture::Idle;
            changed = true;
        }
        changed
    }

    /// Close the editor without touching the label.
    pub fn end_edit(&mut self) -> bool {
        if let Gesture::Editing { node } = self.gesture {
            log::debug!("edit end {node}");
            self.gesture = Gesture::Idle;
            return true;
        }
        false
    }

    // ─── Delete ──────────────────────────────────────────────────────────

    /// Remove the selected node (and every edge touching it) or the selected
    /// edge. Any gesture on a removed node is dropped with it.
    pub fn delete_selected(&mut self) -> bool {
        let Some(selection) = self.selected.take() else {
            return false;
        };
        match selection {
            Selection::Node(id) => {
                let Some((_, edges)) = self.graph.remove_node(id) else {
                    return false;
                };
                log::debug!("delete {id} with {} edge(s)", edges.len());
                let involved = match self.gesture {
                    Gesture::Idle => false,
                    Gesture::Dragging { node, .. }
                    | Gesture::Editing { node }
                    | Gesture::Connecting { source: node } => node == id,
                };
                if involved {
                    self.gesture = Gesture::Idle;
                }
                true
            }
            Selection::Edge(id) => {
                let removed = self.graph.remove_edge(id).is_some();
                if removed {
                    log::debug!("delete edge {id}");
                }
                removed
            }
        }
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    /// Store a new zoom, clamped to the configured bounds. NaN is ignored.
    pub fn set_zoom(&mut self, requested: f32) -> bool {
        let Some(zoom) = clamp_zoom(requested, &self.config) else {
            return false;
        };
        if zoom == self.zoom {
            return false;
        }
        log::debug!("zoom {} -> {}", self.zoom, zoom);
        self.zoom = zoom;
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.zoom + self.config.zoom_step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.zoom - self.config.zoom_step)
    }

    // ─── Event dispatch ──────────────────────────────────────────────────

    /// Route a host event through hit testing into the operations above.
    /// Returns `true` if the canvas needs a redraw.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        match event {
            InputEvent::Pointer(p) => self.handle_pointer(p),
            InputEvent::Key { key, modifiers } => {
                match ShortcutMap::resolve(key, modifiers.ctrl, modifiers.shift, modifiers.alt, modifiers.meta) {
                    Some(action) => self.apply_shortcut(action),
                    None => false,
                }
            }
        }
    }

    fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        let screen = event.position();
        match event.phase {
            PointerPhase::Down => {
                let hit = self.hit(screen);
                // A connect opened through `begin_connect` (not by a press on
                // a handle) is finished or cancelled by the next press.
                if self.connecting_from_id().is_some() {
                    return match hit.and_then(HitTarget::node) {
                        Some(target) => {
                            self.complete_connect(target);
                            true
                        }
                        None => self.click_background(),
                    };
                }
                match hit {
                    Some(HitTarget::OutputHandle(id)) => self.begin_connect(id),
                    Some(HitTarget::Node(id) | HitTarget::InputHandle(id)) => {
                        let logical = self.to_logical(screen);
                        self.begin_drag(id, logical)
                    }
                    Some(HitTarget::Edge(id)) => self.select(Some(Selection::Edge(id))),
                    None => self.click_background(),
                }
            }
            PointerPhase::Move => {
                if event.pressed && self.dragging_node_id().is_some() {
                    let logical = self.to_logical(screen);
                    return self.update_drag(logical);
                }
                // the pending connector follows the pointer
                self.connecting_from_id().is_some()
            }
            PointerPhase::Up => {
                if self.connecting_from_id().is_some() {
                    // Connect mode ends on every release; a release over the
                    // source is a self-loop and is declined.
                    match self.hit(screen).and_then(HitTarget::node) {
                        Some(target) => {
                            self.complete_connect(target);
                        }
                        None => {
                            self.cancel_connect();
                        }
                    }
                    return true;
                }
                self.end_drag()
            }
            PointerPhase::DoubleClick => match self.hit(screen).and_then(HitTarget::node) {
                Some(id) => {
                    self.end_drag();
                    self.begin_edit(id)
                }
                None => false,
            },
        }
    }

    fn apply_shortcut(&mut self, action: ShortcutAction) -> bool {
        let editing = self.editing_node_id().is_some();
        match action {
            // the inline text field owns these keys while editing
            ShortcutAction::Delete if editing => false,
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::CommitEdit => self.end_edit(),
            ShortcutAction::Cancel => {
                if self.cancel_connect() || self.end_edit() {
                    true
                } else {
                    self.select(None)
                }
            }
            ShortcutAction::ZoomIn => self.zoom_in(),
            ShortcutAction::ZoomOut => self.zoom_out(),
            ShortcutAction::ZoomReset => self.set_zoom(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn controller_with(nodes: &[(&str, f32, f32)]) -> (CanvasController, Vec<NodeId>) {
        let mut graph = FlowGraph::new();
        let ids = nodes
            .iter()
            .map(|(name, x, y)| {
                let id = NodeId::intern(name);
                graph.add_node(Node::new(id, NodeKind::Process, Point::new(*x, *y)));
                id
            })
            .collect();
        (CanvasController::new(graph), ids)
    }

    #[test]
    fn begin_drag_captures_offset_and_selects() {
        let (mut c, ids) = controller_with(&[("ctl_drag", 100.0, 100.0)]);
        assert!(c.begin_drag(ids[0], Point::new(110.0, 110.0)));
        assert_eq!(
            c.gesture(),
            Gesture::Dragging {
                node: ids[0],
                offset: Point::new(10.0, 10.0)
            }
        );
        assert_eq!(c.selected(), Some(Selection::Node(ids[0])));
    }

    #[test]
    fn drag_suppressed_while_connecting() {
        let (mut c, ids) = controller_with(&[("ctl_sa", 0.0, 0.0), ("ctl_sb", 300.0, 0.0)]);
        c.begin_connect(ids[0]);
        assert!(!c.begin_drag(ids[1], Point::new(310.0, 10.0)));
        assert_eq!(c.connecting_from_id(), Some(ids[0]));
        assert_eq!(c.dragging_node_id(), None);
    }

    #[test]
    fn connect_blocked_while_dragging() {
        let (mut c, ids) = controller_with(&[("ctl_ba", 0.0, 0.0)]);
        c.begin_drag(ids[0], Point::new(5.0, 5.0));
        assert!(!c.begin_connect(ids[0]));
        assert!(!c.begin_edit(ids[0]));
        assert_eq!(c.dragging_node_id(), Some(ids[0]));
    }

    #[test]
    fn drag_closes_open_edit() {
        let (mut c, ids) = controller_with(&[("ctl_de", 0.0, 0.0)]);
        c.begin_edit(ids[0]);
        c.begin_drag(ids[0], Point::new(1.0, 1.0));
        assert_eq!(c.editing_node_id(), None);
        assert_eq!(c.dragging_node_id(), Some(ids[0]));
    }

    #[test]
    fn select_elsewhere_ends_edit() {
        let (mut c, ids) = controller_with(&[("ctl_ea", 0.0, 0.0), ("ctl_eb", 300.0, 0.0)]);
        c.begin_edit(ids[0]);
        c.select(Some(Selection::Node(ids[0])));
        assert_eq!(c.editing_node_id(), Some(ids[0]), "reselecting the edited node keeps the editor");
        c.select(Some(Selection::Node(ids[1])));
        assert_eq!(c.editing_node_id(), None);
    }

    #[test]
    fn select_ignores_stale_ids() {
        let (mut c, _) = controller_with(&[("ctl_stale", 0.0, 0.0)]);
        assert!(!c.select(Some(Selection::Node(NodeId::intern("ctl_nowhere")))));
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn delete_edge_only_removes_that_edge() {
        let (mut c, ids) = controller_with(&[("ctl_xa", 0.0, 0.0), ("ctl_xb", 300.0, 0.0)]);
        c.begin_connect(ids[0]);
        let edge = c.complete_connect(ids[1]).unwrap();
        c.select(Some(Selection::Edge(edge)));
        assert!(c.delete_selected());
        assert_eq!(c.graph().edge_count(), 0);
        assert_eq!(c.graph().node_count(), 2);
        assert_eq!(c.selected(), None);
    }

    #[test]
    fn delete_with_nothing_selected_is_noop() {
        let (mut c, _) = controller_with(&[("ctl_none", 0.0, 0.0)]);
        assert!(!c.delete_selected());
        assert_eq!(c.graph().node_count(), 1);
    }

    #[test]
    fn deleting_edited_node_returns_to_idle() {
        let (mut c, ids) = controller_with(&[("ctl_del_edit", 0.0, 0.0)]);
        c.begin_edit(ids[0]);
        assert!(c.delete_selected());
        assert_eq!(c.gesture(), Gesture::Idle);
    }

    #[test]
    fn zoom_steps_and_reset() {
        let mut c = CanvasController::default();
        assert!(c.zoom_in());
        assert!((c.zoom() - 1.1).abs() < 1e-6);
        for _ in 0..30 {
            c.zoom_out();
        }
        assert_eq!(c.zoom(), 0.5);
        assert!(!c.set_zoom(f32::NAN));
        assert_eq!(c.zoom(), 0.5);
    }

    #[test]
    fn invalid_config_falls_back_to_default() {
        let config = CanvasConfig {
            min_zoom: 3.0,
            max_zoom: 1.0,
            ..CanvasConfig::default()
        };
        let c = CanvasController::with_config(FlowGraph::new(), config);
        assert_eq!(*c.config(), CanvasConfig::default());
        assert_eq!(c.zoom(), 1.0);
    }

    #[test]
    fn drop_converts_through_current_zoom() {
        let mut c = CanvasController::default();
        c.set_zoom(2.0);
        let id = c.drop_node("output", Point::new(300.0, 120.0));
        let node = c.graph().get(id).unwrap();
        assert_eq!(node.position, Point::new(150.0, 60.0));
        assert_eq!(node.kind(), NodeKind::Output);
    }

    #[test]
    fn merge_payload_reports_change() {
        let mut c = CanvasController::default();
        let id = c.create_node(NodeKind::ExternalEndpoint, Point::ORIGIN);
        assert!(c.merge_payload(id, [("url", "https://radius.local"), ("realm", "isp")]));
        let node = c.graph().get(id).unwrap();
        assert_eq!(node.field("url"), Some("https://radius.local"));
        assert_eq!(node.field("realm"), Some("isp"));
        assert!(!c.set_payload_field(NodeId::intern("ctl_ghost"), "url", "x"));
    }

    #[test]
    fn delete_key_swallowed_while_editing() {
        let (mut c, ids) = controller_with(&[("ctl_key", 0.0, 0.0)]);
        c.begin_edit(ids[0]);
        assert!(!c.handle(&InputEvent::key("Backspace", Default::default())));
        assert!(c.graph().contains(ids[0]));
        assert!(c.handle(&InputEvent::key("Enter", Default::default())));
        assert!(c.handle(&InputEvent::key("Delete", Default::default())));
        assert!(!c.graph().contains(ids[0]));
    }

    #[test]
    fn escape_unwinds_one_layer_at_a_time() {
        let (mut c, ids) = controller_with(&[("ctl_esc", 0.0, 0.0)]);
        c.begin_edit(ids[0]);
        let esc = InputEvent::key("Escape", Default::default());
        assert!(c.handle(&esc));
        assert_eq!(c.editing_node_id(), None);
        assert_eq!(c.selected(), Some(Selection::Node(ids[0])));
        assert!(c.handle(&esc));
        assert_eq!(c.selected(), None);
        assert!(!c.handle(&esc));
    }
}
