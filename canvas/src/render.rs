//! Rendering: a [`Surface`] backed by an HTML canvas 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives read-only views of actions and overlay records and produces
//! pixels. It does not mutate any application state.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use frames::{ActionKind, DrawAction, Tool};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::compositor::{Overlay, Surface};
use crate::consts::{
    ARROW_HEAD_ANGLE, ARROW_HEAD_MIN, ARROW_HEAD_WIDTH_FACTOR, BACKGROUND_COLOR, DEFAULT_SURFACE_HEIGHT,
    DEFAULT_SURFACE_WIDTH, ERASER_WIDTH_FACTOR, LABEL_FONT,
};
use crate::overlay::{CursorRecord, LaserRecord, TrailSegment};

/// Radius of the colored dot at a cursor's tip.
const CURSOR_DOT_RADIUS: f64 = 3.0;
/// Radius of the laser accent dot and its halo.
const LASER_DOT_RADIUS: f64 = 4.0;
const LASER_HALO_RADIUS: f64 = 8.0;

/// A canvas element and its 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl CanvasSurface {
    /// Bind to `canvas`, giving it the default backing size if it has none.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the element has no 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        if canvas.width() == 0 || canvas.height() == 0 {
            canvas.set_width(DEFAULT_SURFACE_WIDTH);
            canvas.set_height(DEFAULT_SURFACE_HEIGHT);
        }

        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(JsValue::from)?;
        ctx.set_line_cap("round");
        ctx.set_line_join("round");

        Ok(Self { canvas, ctx })
    }

    #[must_use]
    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }
}

impl Surface for CanvasSurface {
    type Error = JsValue;

    fn clear_surface(&mut self) -> Result<(), JsValue> {
        let width = f64::from(self.canvas.width());
        let height = f64::from(self.canvas.height());
        self.ctx.set_fill_style_str(BACKGROUND_COLOR);
        self.ctx.fill_rect(0.0, 0.0, width, height);
        Ok(())
    }

    fn render_persistent_action(&mut self, action: &DrawAction) -> Result<(), JsValue> {
        match action.kind {
            ActionKind::Stroke => {
                draw_segment(&self.ctx, action);
                Ok(())
            }
            ActionKind::Shape => draw_shape(&self.ctx, action),
            ActionKind::Text => draw_text(&self.ctx, action),
            ActionKind::Laser => Ok(()),
        }
    }

    fn render_overlay(&mut self, overlay: &Overlay<'_>) -> Result<(), JsValue> {
        match overlay {
            Overlay::LocalPreview(action) => draw_shape(&self.ctx, action),
            Overlay::RemotePreview(preview) => draw_shape(&self.ctx, &preview.action),
            Overlay::LaserTrail { laser, segments } => {
                draw_laser_trail(&self.ctx, laser, segments);
                Ok(())
            }
            Overlay::LaserPoint { laser, label } => draw_laser_point(&self.ctx, laser, *label),
            Overlay::Cursor { cursor, label } => draw_cursor(&self.ctx, cursor, *label),
        }
    }

    /// Scale client coordinates by the ratio of backing size to on-screen size.
    fn local_coordinates(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        let rect = self.canvas.get_bounding_client_rect();
        let scale_x = scale(f64::from(self.canvas.width()), rect.width());
        let scale_y = scale(f64::from(self.canvas.height()), rect.height());
        ((client_x - rect.left()) * scale_x, (client_y - rect.top()) * scale_y)
    }
}

/// Backing pixels per on-screen pixel. A collapsed element maps 1:1.
fn scale(backing: f64, on_screen: f64) -> f64 {
    if on_screen > 0.0 { backing / on_screen } else { 1.0 }
}

// =============================================================
// Persistent actions
// =============================================================

/// Ink and width for a freehand segment. Erasers paint background.
fn segment_style(action: &DrawAction) -> (&str, f64) {
    let width = f64::from(action.line_width);
    if action.tool == Tool::Eraser {
        (BACKGROUND_COLOR, width * ERASER_WIDTH_FACTOR)
    } else {
        (action.color.as_str(), width)
    }
}

fn draw_segment(ctx: &CanvasRenderingContext2d, action: &DrawAction) {
    let (ink, width) = segment_style(action);
    ctx.begin_path();
    ctx.move_to(action.prev_x, action.prev_y);
    ctx.line_to(action.x, action.y);
    ctx.set_stroke_style_str(ink);
    ctx.set_line_width(width);
    ctx.stroke();
}

fn draw_shape(ctx: &CanvasRenderingContext2d, action: &DrawAction) -> Result<(), JsValue> {
    let (sx, sy, ex, ey) = (action.start_x, action.start_y, action.end_x, action.end_y);

    ctx.set_stroke_style_str(&action.color);
    ctx.set_fill_style_str(&action.color);
    ctx.set_line_width(f64::from(action.line_width));

    match action.tool {
        Tool::Rectangle => {
            if action.filled {
                ctx.fill_rect(sx, sy, ex - sx, ey - sy);
            } else {
                ctx.stroke_rect(sx, sy, ex - sx, ey - sy);
            }
        }
        Tool::Circle => {
            let radius = (ex - sx).hypot(ey - sy);
            ctx.begin_path();
            ctx.arc(sx, sy, radius, 0.0, 2.0 * PI)?;
            fill_or_stroke(ctx, action.filled);
        }
        Tool::Ellipse => {
            ctx.begin_path();
            ctx.ellipse(sx, sy, (ex - sx).abs(), (ey - sy).abs(), 0.0, 0.0, 2.0 * PI)?;
            fill_or_stroke(ctx, action.filled);
        }
        Tool::Triangle => {
            ctx.begin_path();
            ctx.move_to((sx + ex) / 2.0, sy);
            ctx.line_to(sx, ey);
            ctx.line_to(ex, ey);
            ctx.close_path();
            fill_or_stroke(ctx, action.filled);
        }
        Tool::Line => {
            ctx.begin_path();
            ctx.move_to(sx, sy);
            ctx.line_to(ex, ey);
            ctx.stroke();
        }
        Tool::Arrow => {
            ctx.begin_path();
            ctx.move_to(sx, sy);
            ctx.line_to(ex, ey);
            ctx.stroke();

            let [left, right] = arrowhead_points((sx, sy), (ex, ey), action.line_width);
            ctx.begin_path();
            ctx.move_to(ex, ey);
            ctx.line_to(left.0, left.1);
            ctx.move_to(ex, ey);
            ctx.line_to(right.0, right.1);
            ctx.stroke();
        }
        // Not a shape tool; nothing to outline.
        Tool::Pen | Tool::Eraser | Tool::Laser | Tool::Text => {}
    }
    Ok(())
}

fn fill_or_stroke(ctx: &CanvasRenderingContext2d, filled: bool) {
    if filled {
        ctx.fill();
    } else {
        ctx.stroke();
    }
}

/// Ends of the two arrowhead barbs for an arrow from `from` to `tip`.
fn arrowhead_points(from: (f64, f64), tip: (f64, f64), line_width: u32) -> [(f64, f64); 2] {
    let length = ARROW_HEAD_MIN.max(f64::from(line_width) * ARROW_HEAD_WIDTH_FACTOR);
    let angle = (tip.1 - from.1).atan2(tip.0 - from.0);
    let barb = |a: f64| (tip.0 - length * a.cos(), tip.1 - length * a.sin());
    [barb(angle - ARROW_HEAD_ANGLE), barb(angle + ARROW_HEAD_ANGLE)]
}

fn draw_text(ctx: &CanvasRenderingContext2d, action: &DrawAction) -> Result<(), JsValue> {
    let Some(text) = action.text.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(());
    };
    ctx.set_font(&format!("{}px Arial", action.font_size));
    ctx.set_fill_style_str(&action.color);
    ctx.fill_text(text, action.x, action.y)
}

// =============================================================
// Overlays
// =============================================================

fn draw_laser_trail(ctx: &CanvasRenderingContext2d, laser: &LaserRecord, segments: &[TrailSegment]) {
    ctx.save();
    for segment in segments {
        ctx.begin_path();
        ctx.move_to(segment.from.x, segment.from.y);
        ctx.line_to(segment.to.x, segment.to.y);
        ctx.set_stroke_style_str(&hex_to_rgba(&laser.color, segment.opacity * 0.6));
        ctx.set_line_width(2.0 + segment.opacity * 2.0);
        ctx.stroke();
    }
    ctx.restore();
}

fn draw_laser_point(ctx: &CanvasRenderingContext2d, laser: &LaserRecord, label: bool) -> Result<(), JsValue> {
    draw_pointer(ctx, laser.x, laser.y);

    ctx.begin_path();
    ctx.arc(laser.x + 2.0, laser.y + 2.0, LASER_HALO_RADIUS, 0.0, 2.0 * PI)?;
    ctx.set_fill_style_str(&hex_to_rgba(&laser.color, 0.3));
    ctx.fill();

    ctx.begin_path();
    ctx.arc(laser.x + 2.0, laser.y + 2.0, LASER_DOT_RADIUS, 0.0, 2.0 * PI)?;
    ctx.set_fill_style_str(&laser.color);
    ctx.fill();

    if label {
        draw_label(ctx, laser.x, laser.y, &laser.name, &laser.peer_color)?;
    }
    Ok(())
}

fn draw_cursor(ctx: &CanvasRenderingContext2d, cursor: &CursorRecord, label: bool) -> Result<(), JsValue> {
    draw_pointer(ctx, cursor.x, cursor.y);

    ctx.begin_path();
    ctx.arc(cursor.x + 2.0, cursor.y + 2.0, CURSOR_DOT_RADIUS, 0.0, 2.0 * PI)?;
    ctx.set_fill_style_str(&cursor.color);
    ctx.fill();

    if label {
        draw_label(ctx, cursor.x, cursor.y, &cursor.name, &cursor.color)?;
    }
    Ok(())
}

/// Classic arrow pointer, white with a black outline, tip at `(x, y)`.
fn draw_pointer(ctx: &CanvasRenderingContext2d, x: f64, y: f64) {
    ctx.save();
    ctx.begin_path();
    ctx.move_to(x, y);
    ctx.line_to(x, y + 16.0);
    ctx.line_to(x + 4.0, y + 12.0);
    ctx.line_to(x + 7.0, y + 18.0);
    ctx.line_to(x + 9.0, y + 17.0);
    ctx.line_to(x + 6.0, y + 11.0);
    ctx.line_to(x + 11.0, y + 11.0);
    ctx.close_path();
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill();
    ctx.set_stroke_style_str("#000000");
    ctx.set_line_width(1.5);
    ctx.stroke();
    ctx.restore();
}

/// Name tag to the lower right of a pointer, on the peer's color.
fn draw_label(ctx: &CanvasRenderingContext2d, x: f64, y: f64, name: &str, color: &str) -> Result<(), JsValue> {
    if name.is_empty() {
        return Ok(());
    }
    ctx.save();
    ctx.set_font(LABEL_FONT);
    let padding = 4.0;
    let width = ctx.measure_text(name)?.width() + padding * 2.0;
    let (bg_x, bg_y) = (x + 14.0, y + 14.0);

    ctx.set_global_alpha(0.95);
    ctx.set_fill_style_str(color);
    ctx.fill_rect(bg_x, bg_y, width, 18.0);

    ctx.set_global_alpha(1.0);
    ctx.set_fill_style_str("#FFFFFF");
    ctx.fill_text(name, bg_x + padding, bg_y + 13.0)?;
    ctx.restore();
    Ok(())
}

/// `#RRGGBB` to a CSS `rgba()` string. Malformed channels read as zero.
fn hex_to_rgba(hex: &str, alpha: f64) -> String {
    let hex = hex.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| hex.get(range).map_or(0, |c| u8::from_str_radix(c, 16).unwrap_or(0));
    format!("rgba({}, {}, {}, {alpha})", channel(0..2), channel(2..4), channel(4..6))
}
