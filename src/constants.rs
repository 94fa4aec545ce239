//! Shared defaults for new mindmaps and nodes.

/// Accent color applied to new nodes.
pub const DEFAULT_NODE_COLOR: &str = "#007bff";
pub const DEFAULT_NODE_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_NODE_TEXT_COLOR: &str = "#000000";
pub const DEFAULT_NODE_TYPE: &str = "main";
pub const DEFAULT_NODE_WIDTH: i64 = 150;
pub const DEFAULT_NODE_HEIGHT: i64 = 50;
pub const DEFAULT_NODE_FONT_SIZE: i64 = 14;
pub const DEFAULT_NODE_FONT_WEIGHT: &str = "normal";
pub const DEFAULT_NODE_PRIORITY: &str = "medium";
pub const DEFAULT_NODE_STATUS: &str = "pending";

pub const DEFAULT_THEME: &str = "default";
pub const DEFAULT_CANVAS_WIDTH: i64 = 2000;
pub const DEFAULT_CANVAS_HEIGHT: i64 = 1500;
pub const DEFAULT_ZOOM_LEVEL: f64 = 1.0;
/// Canvas midpoint; the seeded central node is placed here as well.
pub const DEFAULT_CENTER_X: f64 = 1000.0;
pub const DEFAULT_CENTER_Y: f64 = 750.0;

pub const MIN_PASSWORD_LENGTH: usize = 6;
