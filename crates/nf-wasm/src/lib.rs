//! WASM bridge for NodeFlow — exposes the canvas controller to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page forwards DOM
//! pointer/keyboard events here, asks for a redraw when a call returns
//! `true`, and reads projections back as JSON for overlays (inline label
//! editor, property inspector).

mod render2d;

use nf_core::config::CanvasConfig;
use nf_core::id::{EdgeId, NodeId};
use nf_core::model::{FlowGraph, Point, Selection};
use nf_editor::controller::CanvasController;
use nf_editor::input::{InputEvent, Modifiers};
use nf_editor::shortcuts::{ShortcutAction, ShortcutMap};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The JS-facing canvas. All interaction from the page goes through here.
#[wasm_bindgen]
pub struct FlowCanvas {
    controller: CanvasController,
    width: f64,
    height: f64,
    /// Last pointer position in screen space, for the live connector.
    pointer: Option<(f64, f64)>,
    /// Dark mode flag — `false` = light (default), `true` = dark.
    dark_mode: bool,
}

#[wasm_bindgen]
impl FlowCanvas {
    /// Create an empty canvas with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        Self::from_controller(CanvasController::new(FlowGraph::new()), width, height)
    }

    /// Create a canvas pre-populated with the starter topology.
    pub fn seeded(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();
        Self::from_controller(
            CanvasController::new(FlowGraph::seeded_topology()),
            width,
            height,
        )
    }

    /// Create an empty canvas from a JSON config object. Missing keys take
    /// their defaults; an invalid config is rejected.
    pub fn with_config_json(width: f64, height: f64, json: &str) -> Result<FlowCanvas, JsValue> {
        console_error_panic_hook_setup();
        let config = CanvasConfig::from_json(json).map_err(|e| JsValue::from_str(&e))?;
        Ok(Self::from_controller(
            CanvasController::with_config(FlowGraph::new(), config),
            width,
            height,
        ))
    }

    /// Render the current frame to a Canvas2D context.
    pub fn render(&self, ctx: &CanvasRenderingContext2d) {
        let theme = if self.dark_mode {
            render2d::CanvasTheme::dark()
        } else {
            render2d::CanvasTheme::light()
        };
        let projection = self.controller.projection();
        let handle_radius = (self.controller.config().handle_radius * self.controller.zoom()) as f64;
        render2d::render_frame(
            ctx,
            &projection,
            self.width,
            self.height,
            handle_radius,
            self.pointer,
            &theme,
        );
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.dark_mode = is_dark;
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    // ─── Pointer API ─────────────────────────────────────────────────────

    /// Handle pointer down. Returns true if the canvas needs a redraw.
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        self.track_pointer(x, y);
        self.controller
            .handle(&InputEvent::from_pointer_down(x, y, mods))
    }

    /// Handle pointer move. `pressed` is whether the primary button is held.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f32,
        y: f32,
        pressed: bool,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        self.track_pointer(x, y);
        self.controller
            .handle(&InputEvent::from_pointer_move(x, y, pressed, mods))
    }

    pub fn handle_pointer_up(
        &mut self,
        x: f32,
        y: f32,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let mods = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        self.track_pointer(x, y);
        self.controller
            .handle(&InputEvent::from_pointer_up(x, y, mods))
    }

    /// Double-click opens the inline label editor on the node under the
    /// pointer. The page then positions its text field over
    /// `get_editing_rect()`.
    pub fn handle_double_click(&mut self, x: f32, y: f32) -> bool {
        self.controller.handle(&InputEvent::from_double_click(x, y))
    }

    // ─── Keyboard Shortcut API ───────────────────────────────────────────

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool, "action":"<action_name>"}`
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let action = ShortcutMap::resolve(key, ctrl, shift, alt, meta);
        let modifiers = Modifiers {
            shift,
            ctrl,
            alt,
            meta,
        };
        let changed = action.is_some() && self.controller.handle(&InputEvent::key(key, modifiers));
        serde_json::json!({
            "changed": changed,
            "action": action.map_or("none", action_to_name),
        })
        .to_string()
    }

    // ─── Palette & inspector ─────────────────────────────────────────────

    /// Drop a palette item at a screen position. Unknown kind tags fall
    /// back to the default kind. Returns the new node's id.
    pub fn drop_node(&mut self, kind_tag: &str, sx: f32, sy: f32) -> String {
        self.controller
            .drop_node(kind_tag, Point::new(sx, sy))
            .as_str()
            .to_string()
    }

    /// Set one payload field on a node. Returns true if it changed.
    pub fn set_payload_field(&mut self, node_id: &str, key: &str, value: &str) -> bool {
        NodeId::lookup(node_id)
            .is_some_and(|id| self.controller.set_payload_field(id, key, value))
    }

    /// Merge a flat JSON object into a node's payload. Non-string scalars
    /// are stored in their JSON text form; nested values are skipped.
    pub fn merge_payload_json(&mut self, node_id: &str, json: &str) -> bool {
        let fields = match payload_fields(json) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("merge_payload_json({node_id}): {e}");
                return false;
            }
        };
        let Some(id) = NodeId::lookup(node_id) else {
            return false;
        };
        self.controller
            .merge_payload(id, fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Inspector view of one node:
    /// `{"id","kind","label","fields":{...}}`, or `{}` if it doesn't exist.
    pub fn get_node_props(&self, node_id: &str) -> String {
        let Some(node) = NodeId::lookup(node_id).and_then(|id| self.controller.graph().get(id)) else {
            return "{}".to_string();
        };
        let fields: serde_json::Map<String, serde_json::Value> = node
            .fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
            .collect();
        serde_json::json!({
            "id": node.id.as_str(),
            "kind": node.kind().tag(),
            "label": node.label,
            "fields": fields,
        })
        .to_string()
    }

    // ─── Selection & editing ─────────────────────────────────────────────

    /// Select a node or edge by id; an empty string clears the selection.
    pub fn select_by_id(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return self.controller.select(None);
        }
        if let Some(node) = NodeId::lookup(id).filter(|n| self.controller.graph().contains(*n)) {
            return self.controller.select(Some(Selection::Node(node)));
        }
        EdgeId::lookup(id).is_some_and(|edge| self.controller.select(Some(Selection::Edge(edge))))
    }

    /// The selected node or edge id, or `""`.
    pub fn get_selected_id(&self) -> String {
        match self.controller.selected() {
            Some(Selection::Node(id)) => id.as_str().to_string(),
            Some(Selection::Edge(id)) => id.as_str().to_string(),
            None => String::new(),
        }
    }

    pub fn get_editing_id(&self) -> String {
        self.controller
            .editing_node_id()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// Screen rect of the node being edited as `{"x","y","width","height"}`,
    /// or `null`.
    pub fn get_editing_rect(&self) -> String {
        let projection = self.controller.projection();
        let rect = self
            .controller
            .editing_node_id()
            .and_then(|id| projection.node(id))
            .map(|n| n.rect);
        serde_json::to_string(&rect).unwrap_or_else(|_| "null".to_string())
    }

    pub fn begin_edit(&mut self, node_id: &str) -> bool {
        NodeId::lookup(node_id).is_some_and(|id| self.controller.begin_edit(id))
    }

    /// Store an edited label and close the editor on that node.
    pub fn commit_edit(&mut self, node_id: &str, label: &str) -> bool {
        NodeId::lookup(node_id).is_some_and(|id| self.controller.commit_edit(id, label))
    }

    /// Close the editor without storing (blur with no change).
    pub fn end_edit(&mut self) -> bool {
        self.controller.end_edit()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.controller.delete_selected()
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    pub fn set_zoom(&mut self, zoom: f32) -> bool {
        self.controller.set_zoom(zoom)
    }

    pub fn zoom_in(&mut self) -> bool {
        self.controller.zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.controller.zoom_out()
    }

    pub fn get_zoom(&self) -> f32 {
        self.controller.zoom()
    }

    // ─── Read-back ───────────────────────────────────────────────────────

    /// The full frame as JSON, for hosts that draw with DOM/SVG instead of
    /// `render()`.
    pub fn projection_json(&self) -> String {
        serde_json::to_string(&self.controller.projection()).unwrap_or_else(|e| {
            log::error!("projection serialization failed: {e}");
            "{}".to_string()
        })
    }

    /// Node ids in paint order.
    pub fn node_ids(&self) -> js_sys::Array {
        self.controller
            .graph()
            .nodes()
            .map(|n| JsValue::from_str(n.id.as_str()))
            .collect()
    }
}

impl FlowCanvas {
    fn from_controller(controller: CanvasController, width: f64, height: f64) -> Self {
        Self {
            controller,
            width,
            height,
            pointer: None,
            dark_mode: false,
        }
    }

    fn track_pointer(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.pointer = Some((x as f64, y as f64));
        }
    }
}

/// Flatten a JSON object into string fields for the payload merge.
fn payload_fields(json: &str) -> Result<Vec<(String, String)>, String> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let serde_json::Value::Object(map) = value else {
        return Err("expected a JSON object".to_string());
    };
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            serde_json::Value::Number(n) => Some((k, n.to_string())),
            serde_json::Value::Bool(b) => Some((k, b.to_string())),
            _ => None,
        })
        .collect())
}

fn action_to_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Delete => "delete",
        ShortcutAction::CommitEdit => "commitEdit",
        ShortcutAction::ZoomIn => "zoomIn",
        ShortcutAction::ZoomOut => "zoomOut",
        ShortcutAction::ZoomReset => "zoomReset",
        ShortcutAction::Cancel => "cancel",
    }
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("NodeFlow WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drop_then_inspect() {
        let mut canvas = FlowCanvas::new(800.0, 600.0);
        canvas.set_zoom(2.0);
        let id = canvas.drop_node("data_store", 200.0, 100.0);
        assert!(canvas.set_payload_field(&id, "table", "sessions"));

        let props: serde_json::Value = serde_json::from_str(&canvas.get_node_props(&id)).unwrap();
        assert_eq!(props["kind"], "data_store");
        assert_eq!(props["fields"]["table"], "sessions");

        let frame: serde_json::Value = serde_json::from_str(&canvas.projection_json()).unwrap();
        assert_eq!(frame["nodes"][0]["rect"]["x"], 200.0);
        assert_eq!(frame["nodes"][0]["rect"]["y"], 100.0);
    }

    #[test]
    fn merge_payload_json_flattens_scalars() {
        let mut canvas = FlowCanvas::new(800.0, 600.0);
        let id = canvas.drop_node("conditional", 0.0, 0.0);
        assert!(canvas.merge_payload_json(&id, r#"{"condition":"greater_than","value":3,"nested":{"a":1}}"#));

        let props: serde_json::Value = serde_json::from_str(&canvas.get_node_props(&id)).unwrap();
        assert_eq!(props["fields"]["condition"], "greater_than");
        assert_eq!(props["fields"]["value"], "3");
        assert_eq!(props["fields"].get("nested"), None);
        assert!(!canvas.merge_payload_json(&id, "[1, 2]"));
    }

    #[test]
    fn key_reports_action() {
        let mut canvas = FlowCanvas::seeded(800.0, 600.0);
        canvas.select_by_id("olt");
        let out: serde_json::Value =
            serde_json::from_str(&canvas.handle_key("Delete", false, false, false, false)).unwrap();
        assert_eq!(out["changed"], true);
        assert_eq!(out["action"], "delete");
        assert_eq!(canvas.get_selected_id(), "");

        let out: serde_json::Value =
            serde_json::from_str(&canvas.handle_key("q", false, false, false, false)).unwrap();
        assert_eq!(out["action"], "none");
    }

    #[test]
    fn unknown_ids_are_not_interned() {
        let mut canvas = FlowCanvas::seeded(800.0, 600.0);
        assert_eq!(canvas.get_node_props("ghost_from_host"), "{}");
        assert!(!canvas.set_payload_field("ghost_from_host", "url", "x"));
        assert!(!canvas.merge_payload_json("ghost_from_host", r#"{"url":"x"}"#));
        assert!(!canvas.select_by_id("ghost_from_host"));
        assert!(!canvas.begin_edit("ghost_from_host"));
        assert!(!canvas.commit_edit("ghost_from_host", "label"));
        assert_eq!(NodeId::lookup("ghost_from_host"), None);
        assert_eq!(EdgeId::lookup("ghost_from_host"), None);
    }

    #[test]
    fn select_edge_by_id() {
        let mut canvas = FlowCanvas::seeded(800.0, 600.0);
        assert!(canvas.select_by_id("splitter->ont"));
        assert_eq!(canvas.get_selected_id(), "splitter->ont");
        assert!(!canvas.select_by_id("nowhere->ont"));
        assert!(canvas.select_by_id(""));
    }

    #[test]
    fn editing_rect_tracks_zoom() {
        let mut canvas = FlowCanvas::seeded(800.0, 600.0);
        assert_eq!(canvas.get_editing_rect(), "null");
        canvas.set_zoom(0.5);
        assert!(canvas.begin_edit("olt"));
        let rect: serde_json::Value = serde_json::from_str(&canvas.get_editing_rect()).unwrap();
        assert_eq!(rect["x"], 130.0);
        assert_eq!(rect["width"], 80.0);
        assert!(canvas.commit_edit("olt", "OLT-2"));
        assert_eq!(canvas.get_editing_id(), "");
    }

    #[test]
    fn custom_config_drives_geometry() {
        let Ok(mut canvas) = FlowCanvas::with_config_json(800.0, 600.0, r#"{"node_width": 200, "max_zoom": 3}"#)
        else {
            panic!("config should parse");
        };
        canvas.set_zoom(3.0);
        assert_eq!(canvas.get_zoom(), 3.0);
        let id = canvas.drop_node("input", 30.0, 30.0);
        let frame: serde_json::Value = serde_json::from_str(&canvas.projection_json()).unwrap();
        assert_eq!(frame["nodes"][0]["id"], id.as_str());
        assert_eq!(frame["nodes"][0]["rect"]["width"], 600.0);
    }
}
