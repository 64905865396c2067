//! Canvas2D renderer.
//!
//! Draws a [`Projection`] to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`. Everything arrives already in screen space,
//! so this module does no geometry of its own beyond arrowheads.

use nf_render::projection::{EdgeView, NodeView, Projection};
use web_sys::CanvasRenderingContext2d;

const SELECTION: &str = "#4FC3F7";

/// Theme-dependent colors for the canvas renderer.
pub struct CanvasTheme {
    pub bg: &'static str,
    pub grid: &'static str,
    pub node_bg: &'static str,
    pub node_border: &'static str,
    pub label: &'static str,
    pub edge: &'static str,
    pub handle_fill: &'static str,
}

impl CanvasTheme {
    /// Light theme — warm white canvas.
    pub fn light() -> Self {
        Self {
            bg: "#F5F5F7",
            grid: "rgba(0, 0, 0, 0.05)",
            node_bg: "#FFFFFF",
            node_border: "#D1D1D6",
            label: "#1D1D1F",
            edge: "#6B7080",
            handle_fill: "#FFFFFF",
        }
    }

    /// Dark theme.
    pub fn dark() -> Self {
        Self {
            bg: "#1C1C1E",
            grid: "rgba(255, 255, 255, 0.04)",
            node_bg: "#2C2C2E",
            node_border: "#48484A",
            label: "#F5F5F7",
            edge: "#98989D",
            handle_fill: "#1C1C1E",
        }
    }
}

/// Render one frame. `pointer` is the last known screen pointer, used as
/// the free end of the pending connector.
pub fn render_frame(
    ctx: &CanvasRenderingContext2d,
    projection: &Projection,
    canvas_width: f64,
    canvas_height: f64,
    handle_radius: f64,
    pointer: Option<(f64, f64)>,
    theme: &CanvasTheme,
) {
    ctx.set_fill_style_str(theme.bg);
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);
    draw_grid(ctx, canvas_width, canvas_height, projection.zoom as f64, theme);

    // Edges under nodes so handles stay clickable-looking.
    for edge in &projection.edges {
        draw_edge(ctx, edge, projection.zoom as f64, theme);
    }

    if let (Some(anchor), Some(pointer)) = (projection.pending_connector, pointer) {
        draw_pending_connector(ctx, anchor, pointer);
    }

    for node in &projection.nodes {
        draw_node(ctx, node, projection.zoom as f64, handle_radius, theme);
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

fn draw_node(ctx: &CanvasRenderingContext2d, node: &NodeView, zoom: f64, handle_radius: f64, theme: &CanvasTheme) {
    let r = &node.rect;
    let (x, y, w, h) = (r.x, r.y, r.width, r.height);
    let radius = 8.0 * zoom;

    ctx.save();
    if node.dragging {
        ctx.set_shadow_color("rgba(0, 0, 0, 0.18)");
        ctx.set_shadow_blur(12.0 * zoom);
        ctx.set_shadow_offset_y(4.0 * zoom);
    }

    rounded_rect_path(ctx, x, y, w, h, radius);
    ctx.set_fill_style_str(theme.node_bg);
    ctx.fill();
    ctx.set_shadow_color("transparent");

    // Accent stripe on the left edge
    ctx.save();
    rounded_rect_path(ctx, x, y, w, h, radius);
    ctx.clip();
    ctx.set_fill_style_str(node.accent);
    ctx.fill_rect(x, y, 4.0 * zoom, h);
    ctx.restore();

    ctx.set_line_width(if node.selected { 2.0 } else { 1.0 });
    ctx.set_stroke_style_str(if node.selected { SELECTION } else { theme.node_border });
    rounded_rect_path(ctx, x, y, w, h, radius);
    ctx.stroke();

    // The host overlays a text field while editing; leave the slot empty.
    if !node.editing {
        ctx.set_font(&format!("500 {}px Inter, system-ui, sans-serif", 13.0 * zoom));
        ctx.set_fill_style_str(theme.label);
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let _ = ctx.fill_text_with_max_width(&node.label, x + w / 2.0, y + h / 2.0, w - 16.0 * zoom);
    }
    ctx.restore();

    let input = r.input_anchor();
    let output = r.output_anchor();
    draw_handle(ctx, input.x, input.y, handle_radius, theme.handle_fill, theme.node_border);
    let out_stroke = if node.connecting { SELECTION } else { node.accent };
    draw_handle(ctx, output.x, output.y, handle_radius, theme.handle_fill, out_stroke);
}

fn draw_handle(ctx: &CanvasRenderingContext2d, cx: f64, cy: f64, r: f64, fill: &str, stroke: &str) {
    ctx.begin_path();
    let _ = ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU);
    ctx.set_fill_style_str(fill);
    ctx.fill();
    ctx.set_line_width(1.5);
    ctx.set_stroke_style_str(stroke);
    ctx.stroke();
}

// ─── Edges ───────────────────────────────────────────────────────────────

fn draw_edge(ctx: &CanvasRenderingContext2d, edge: &EdgeView, zoom: f64, theme: &CanvasTheme) {
    let c = &edge.curve;
    let color = if edge.selected { SELECTION } else { theme.edge };
    let width = if edge.selected { 2.5 } else { 1.5 };

    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(width);
    ctx.begin_path();
    ctx.move_to(c.p0.x, c.p0.y);
    ctx.bezier_curve_to(c.p1.x, c.p1.y, c.p2.x, c.p2.y, c.p3.x, c.p3.y);
    ctx.stroke();
    ctx.restore();

    // Arrive along the last control leg.
    draw_arrowhead(ctx, (c.p2.x, c.p2.y), (c.p3.x, c.p3.y), 6.0 * zoom + width, color);
}

fn draw_pending_connector(ctx: &CanvasRenderingContext2d, from: (f64, f64), to: (f64, f64)) {
    ctx.save();
    ctx.set_stroke_style_str(SELECTION);
    ctx.set_line_width(1.5);
    let _ = ctx.set_line_dash(&js_sys::Array::of2(
        &wasm_bindgen::JsValue::from_f64(6.0),
        &wasm_bindgen::JsValue::from_f64(4.0),
    ));
    ctx.begin_path();
    ctx.move_to(from.0, from.1);
    ctx.line_to(to.0, to.1);
    ctx.stroke();
    ctx.restore();
}

fn draw_arrowhead(ctx: &CanvasRenderingContext2d, from: (f64, f64), tip: (f64, f64), size: f64, color: &str) {
    let angle = (tip.1 - from.1).atan2(tip.0 - from.0);

    ctx.save();
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.move_to(tip.0, tip.1);
    ctx.line_to(tip.0 - size * (angle - 0.4).cos(), tip.1 - size * (angle - 0.4).sin());
    ctx.line_to(tip.0 - size * (angle + 0.4).cos(), tip.1 - size * (angle + 0.4).sin());
    ctx.close_path();
    ctx.fill();
    ctx.restore();
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn draw_grid(ctx: &CanvasRenderingContext2d, width: f64, height: f64, zoom: f64, theme: &CanvasTheme) {
    ctx.set_fill_style_str(theme.grid);
    let spacing = 20.0 * zoom;
    let mut x = 0.0;
    while x < width {
        let mut y = 0.0;
        while y < height {
            ctx.fill_rect(x, y, 1.0, 1.0);
            y += spacing;
        }
        x += spacing;
    }
}

fn rounded_rect_path(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
    let r = r.min(w / 2.0).min(h / 2.0);
    ctx.begin_path();
    ctx.move_to(x + r, y);
    ctx.line_to(x + w - r, y);
    ctx.arc_to(x + w, y, x + w, y + r, r).unwrap_or(());
    ctx.line_to(x + w, y + h - r);
    ctx.arc_to(x + w, y + h, x + w - r, y + h, r).unwrap_or(());
    ctx.line_to(x + r, y + h);
    ctx.arc_to(x, y + h, x, y + h - r, r).unwrap_or(());
    ctx.line_to(x, y + r);
    ctx.arc_to(x, y, x + r, y, r).unwrap_or(());
    ctx.close_path();
}
