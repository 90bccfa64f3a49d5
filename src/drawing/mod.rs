//! Drawing tools layered over the price pane.
//!
//! This module provides:
//! - `DrawingTool` - Trait every tool implements (placement, hit-test, draw)
//! - `TrendLine`, `HorizontalLine`, `Rectangle` - Built-in tools
//! - `ToolStyle` / `StylePatch` - Persisted style and partial updates
//! - `DrawingManager` - Ordered tool list with selection and JSON persistence

mod geometry;
mod manager;
mod style;
mod tool;
mod tools;

pub use geometry::{
    distance_to_segment, hit_handles, HitAction, HitResult, HANDLE_RADIUS_PX, HIT_TOLERANCE_PX,
    MIN_TOOL_SIZE_PX,
};
pub use manager::DrawingManager;
pub use style::{parse_color, StylePatch, ToolStyle, DEFAULT_FILL_COLOR, DEFAULT_STROKE_COLOR};
pub use tool::{new_tool_id, DrawingTool, ToolBase, ToolKind, ToolRecord};
pub use tools::{HorizontalLine, Rectangle, TrendLine};
