//! Drawing actions: the payload of `draw:send` and `draw:preview`.
//!
//! `Tool` and `ActionKind` are closed vocabularies. Decoding never rejects an
//! unrecognized or null name; it falls back to the most harmless value (`pen`,
//! `draw`) so a forward-incompatible client cannot wedge the session. Integer
//! style fields saturate on decode and are brought into range by
//! [`DrawAction::normalize`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lenient;

/// Default stroke color when the client omits one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Default stroke width in surface pixels.
pub const DEFAULT_LINE_WIDTH: u32 = 2;

/// Thinnest allowed stroke.
pub const MIN_LINE_WIDTH: u32 = 1;

/// Thickest allowed stroke.
pub const MAX_LINE_WIDTH: u32 = 30;

/// Default text size in pixels.
pub const DEFAULT_FONT_SIZE: u32 = 16;

// =============================================================================
// VOCABULARIES
// =============================================================================

/// Instrument that produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "&'static str")]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Laser,
    Line,
    Arrow,
    Rectangle,
    Circle,
    Ellipse,
    Triangle,
    Text,
}

impl Tool {
    /// Wire name of the tool.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pen => "pen",
            Self::Eraser => "eraser",
            Self::Laser => "laser",
            Self::Line => "line",
            Self::Arrow => "arrow",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Ellipse => "ellipse",
            Self::Triangle => "triangle",
            Self::Text => "text",
        }
    }

    /// Parse a wire name, case-insensitively. Unknown names become `Pen`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "eraser" => Self::Eraser,
            "laser" => Self::Laser,
            "line" => Self::Line,
            "arrow" => Self::Arrow,
            "rectangle" => Self::Rectangle,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "triangle" => Self::Triangle,
            "text" => Self::Text,
            _ => Self::Pen,
        }
    }

    /// Tools that draw a two-point shape from `start` to `end`.
    #[must_use]
    pub fn is_shape(self) -> bool {
        matches!(
            self,
            Self::Line | Self::Arrow | Self::Rectangle | Self::Circle | Self::Ellipse | Self::Triangle
        )
    }

    /// Tools that draw continuous segments from `previous` to `current`.
    #[must_use]
    pub fn is_freehand(self) -> bool {
        matches!(self, Self::Pen | Self::Eraser)
    }
}

impl From<String> for Tool {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Option<String>> for Tool {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map_or(Self::Pen, Self::parse)
    }
}

impl From<Tool> for &'static str {
    fn from(tool: Tool) -> Self {
        tool.as_str()
    }
}

/// What an action contributes to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "&'static str")]
pub enum ActionKind {
    /// Freehand segment. Wire name `draw`; `stroke` is accepted on decode.
    #[default]
    Stroke,
    Shape,
    Laser,
    Text,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stroke => "draw",
            Self::Shape => "shape",
            Self::Laser => "laser",
            Self::Text => "text",
        }
    }

    /// Parse a wire name, case-insensitively. Unknown names become `Stroke`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "shape" => Self::Shape,
            "laser" => Self::Laser,
            "text" => Self::Text,
            _ => Self::Stroke,
        }
    }

    /// Durable kinds belong in history; lasers are overlay-only.
    #[must_use]
    pub fn is_durable(self) -> bool {
        !matches!(self, Self::Laser)
    }
}

impl From<String> for ActionKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<Option<String>> for ActionKind {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map_or(Self::Stroke, Self::parse)
    }
}

impl From<ActionKind> for &'static str {
    fn from(kind: ActionKind) -> Self {
        kind.as_str()
    }
}

// =============================================================================
// DRAW ACTION
// =============================================================================

/// One drawing event as it travels over the wire and sits in history.
///
/// Every field is optional on decode. The `author_*` fields are owned by the
/// server: whatever a client puts there is overwritten by [`DrawAction::stamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawAction {
    pub kind: ActionKind,
    pub tool: Tool,
    /// Current point.
    pub x: f64,
    pub y: f64,
    /// Previous point, for freehand segments.
    pub prev_x: f64,
    pub prev_y: f64,
    /// Shape anchor.
    pub start_x: f64,
    pub start_y: f64,
    /// Shape extent.
    pub end_x: f64,
    pub end_y: f64,
    pub color: String,
    #[serde(deserialize_with = "lenient::int")]
    pub line_width: u32,
    pub filled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient::int")]
    pub font_size: u32,
    pub is_laser_end: bool,
    pub is_preview: bool,
    /// Server receive time, milliseconds since the Unix epoch.
    #[serde(deserialize_with = "lenient::int")]
    pub timestamp: i64,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub author_color: Option<String>,
}

impl Default for DrawAction {
    fn default() -> Self {
        Self {
            kind: ActionKind::Stroke,
            tool: Tool::Pen,
            x: 0.0,
            y: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
            start_x: 0.0,
            start_y: 0.0,
            end_x: 0.0,
            end_y: 0.0,
            color: DEFAULT_COLOR.to_owned(),
            line_width: DEFAULT_LINE_WIDTH,
            filled: false,
            text: None,
            font_size: DEFAULT_FONT_SIZE,
            is_laser_end: false,
            is_preview: false,
            timestamp: 0,
            author_id: None,
            author_name: None,
            author_color: None,
        }
    }
}

impl DrawAction {
    /// Freehand segment from `(px, py)` to `(x, y)`.
    #[must_use]
    pub fn segment(tool: Tool, prev: (f64, f64), current: (f64, f64)) -> Self {
        Self {
            kind: ActionKind::Stroke,
            tool,
            x: current.0,
            y: current.1,
            prev_x: prev.0,
            prev_y: prev.1,
            ..Self::default()
        }
    }

    /// Two-point shape from `start` to `end`.
    #[must_use]
    pub fn shape(tool: Tool, start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            kind: ActionKind::Shape,
            tool,
            start_x: start.0,
            start_y: start.1,
            end_x: end.0,
            end_y: end.1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    #[must_use]
    pub fn with_line_width(mut self, line_width: u32) -> Self {
        self.line_width = line_width;
        self
    }

    #[must_use]
    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    /// Clamp style fields into their legal ranges and fill a blank color.
    pub fn normalize(&mut self) {
        self.line_width = self.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
        self.font_size = self.font_size.max(1);
        if self.color.trim().is_empty() {
            self.color = DEFAULT_COLOR.to_owned();
        }
    }

    /// Overwrite identity with the authoritative author and receive time.
    pub fn stamp(&mut self, author_id: Uuid, author_name: &str, author_color: &str, timestamp: i64) {
        self.author_id = Some(author_id);
        self.author_name = Some(author_name.to_owned());
        self.author_color = Some(author_color.to_owned());
        self.timestamp = timestamp;
    }
}

#[cfg(test)]
#[path = "action_test.rs"]
mod tests;
