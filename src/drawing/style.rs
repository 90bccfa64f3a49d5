//! Visual style of a drawing tool.

use egui::{Color32, Stroke};
use serde::{Deserialize, Serialize};

use crate::trader::LineStyle;

pub const DEFAULT_STROKE_COLOR: &str = "#2962ff";
pub const DEFAULT_FILL_COLOR: &str = "#2962ff";

/// Opacity multiplier applied to fills on top of `opacity`
const FILL_ALPHA: f32 = 0.15;

/// Style as persisted: colors are `#rrggbb` strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolStyle {
    pub stroke_color: String,
    pub fill_color: String,
    pub opacity: f32,
    pub line_width: f32,
    pub line_style: LineStyle,
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self {
            stroke_color: DEFAULT_STROKE_COLOR.to_string(),
            fill_color: DEFAULT_FILL_COLOR.to_string(),
            opacity: 1.0,
            line_width: 2.0,
            line_style: LineStyle::Solid,
        }
    }
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`
pub fn parse_color(value: &str) -> Option<Color32> {
    Color32::from_hex(value.trim()).ok()
}

impl ToolStyle {
    fn color(value: &str, fallback: &str) -> Color32 {
        parse_color(value)
            .or_else(|| parse_color(fallback))
            .unwrap_or(Color32::WHITE)
    }

    pub fn stroke_color32(&self) -> Color32 {
        Self::color(&self.stroke_color, DEFAULT_STROKE_COLOR).gamma_multiply(self.opacity.clamp(0.0, 1.0))
    }

    pub fn fill_color32(&self) -> Color32 {
        Self::color(&self.fill_color, DEFAULT_FILL_COLOR)
            .gamma_multiply((self.opacity * FILL_ALPHA).clamp(0.0, 1.0))
    }

    pub fn stroke(&self) -> Stroke {
        Stroke::new(self.line_width.clamp(0.5, 12.0), self.stroke_color32())
    }

    /// Apply the fields set in `patch`
    pub fn apply(&mut self, patch: &StylePatch) {
        if let Some(color) = &patch.stroke_color {
            self.stroke_color = color.clone();
        }
        if let Some(color) = &patch.fill_color {
            self.fill_color = color.clone();
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(width) = patch.line_width {
            self.line_width = width.max(0.0);
        }
        if let Some(line_style) = patch.line_style {
            self.line_style = line_style;
        }
    }
}

/// Partial style update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StylePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_style: Option<LineStyle>,
}
