//! Base constants and utility functions for the chart module.

use egui::Color32;

// Chart colors
pub const BACKGROUND_COLOR: Color32 = Color32::from_rgb(19, 23, 34);
pub const WHITE_COLOR: Color32 = Color32::from_rgb(220, 222, 228);
pub const GREY_COLOR: Color32 = Color32::from_rgb(100, 104, 116);
pub const GRID_COLOR: Color32 = Color32::from_rgb(36, 41, 56);
pub const SESSION_COLOR: Color32 = Color32::from_rgb(70, 76, 96);

// Price movement colors
pub const UP_COLOR: Color32 = Color32::from_rgb(38, 166, 154);
pub const DOWN_COLOR: Color32 = Color32::from_rgb(239, 83, 80);
pub const LINE_COLOR: Color32 = Color32::from_rgb(41, 98, 255);

// Cursor color
pub const CURSOR_COLOR: Color32 = Color32::from_rgb(255, 245, 162);

// Event marker color
pub const EVENT_COLOR: Color32 = Color32::from_rgb(255, 183, 77);

/// Colors cycled through indicator lines
pub const INDICATOR_COLORS: [Color32; 6] = [
    Color32::from_rgb(255, 214, 0),
    Color32::from_rgb(171, 71, 188),
    Color32::from_rgb(66, 165, 245),
    Color32::from_rgb(255, 112, 67),
    Color32::from_rgb(102, 187, 106),
    Color32::from_rgb(236, 64, 122),
];

// Chart dimensions
pub const BAR_WIDTH: f32 = 0.35;
pub const PEN_WIDTH: f32 = 1.0;

// Layout constants
pub const AXIS_X_HEIGHT: f32 = 28.0;
pub const AXIS_Y_WIDTH: f32 = 72.0;
pub const INFO_BOX_WIDTH: f32 = 132.0;
pub const INFO_BOX_HEIGHT: f32 = 108.0;

/// Convert a float value to integer with rounding
#[inline]
pub fn to_int(value: f64) -> i64 {
    value.round() as i64
}

/// Format price with appropriate precision
pub fn format_price(price: f64, decimals: usize) -> String {
    format!("{:.prec$}", price, prec = decimals)
}

/// Format volume with appropriate units (K, M, B)
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{:.2}", volume)
    }
}

/// Scale a color's alpha by `factor` in `[0, 1]`
pub fn fade(color: Color32, factor: f32) -> Color32 {
    color.gamma_multiply(factor.clamp(0.0, 1.0))
}
