//! Shared numeric constants for the canvas crate.

use std::f64::consts::PI;

// ── Overlay lifetimes ───────────────────────────────────────────

/// A remote cursor disappears after this long without an update.
pub const CURSOR_TTL_MS: i64 = 2000;

/// A remote shape preview disappears after this long without an update.
pub const PREVIEW_TTL_MS: i64 = 2000;

/// A laser pointer disappears after this long without an update.
pub const LASER_TTL_MS: i64 = 1000;

/// Most trail points kept per laser; older points drop first.
pub const TRAIL_CAPACITY: usize = 15;

/// Trail points older than this are fully faded.
pub const TRAIL_MAX_AGE_MS: i64 = 500;

// ── Surface ─────────────────────────────────────────────────────

/// Fill color of an empty board. Also the eraser's ink.
pub const BACKGROUND_COLOR: &str = "#FFFFFF";

/// Backing-store size used when the canvas element has none.
pub const DEFAULT_SURFACE_WIDTH: u32 = 1600;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 900;

// ── Strokes ─────────────────────────────────────────────────────

/// Eraser strokes are this many times wider than the requested width.
pub const ERASER_WIDTH_FACTOR: f64 = 3.0;

/// Shortest arrowhead side, in surface pixels.
pub const ARROW_HEAD_MIN: f64 = 10.0;

/// Arrowhead side grows with line width by this factor.
pub const ARROW_HEAD_WIDTH_FACTOR: f64 = 3.0;

/// Arrowhead half-angle (30°).
pub const ARROW_HEAD_ANGLE: f64 = PI / 6.0;

// ── Labels ──────────────────────────────────────────────────────

/// Font used for the name tag next to cursors and laser pointers.
pub const LABEL_FONT: &str = "bold 12px Arial";
