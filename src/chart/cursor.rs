//! Crosshair snapped to bar centers, with axis tags and an info box.

use egui::{pos2, vec2, Align2, Color32, Pos2, Rect, Stroke};

use super::base::{format_price, GREY_COLOR, INFO_BOX_HEIGHT, INFO_BOX_WIDTH, WHITE_COLOR};
use super::coords::{ChartTransform, ValueScale};
use super::items::{draw_tag, BarWindow, CandleItem, ChartItem, VolumeItem};
use super::layout::ChartLayout;
use super::surface::Surface;
use super::ticks::format_cursor_time;

/// Rough glyph width relative to the font size, for tag sizing
const GLYPH_RATIO: f32 = 0.62;

/// Chart cursor for showing crosshairs and info
#[derive(Debug, Clone, PartialEq)]
pub struct ChartCursor {
    /// Bar under the pointer
    index: usize,
    /// Value under the pointer in the hovered pane
    value: f64,
    screen_pos: Pos2,
    /// Hovered pane: `None` for the price pane, `Some(i)` for panel `i`
    pane: Option<usize>,
    visible: bool,
}

impl Default for ChartCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartCursor {
    pub fn new() -> Self {
        Self {
            index: 0,
            value: 0.0,
            screen_pos: Pos2::ZERO,
            pane: None,
            visible: false,
        }
    }

    pub fn clear(&mut self) {
        self.index = 0;
        self.value = 0.0;
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Snapped bar index, when visible
    pub fn index(&self) -> Option<usize> {
        self.visible.then_some(self.index)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn screen_pos(&self) -> Pos2 {
        self.screen_pos
    }

    pub fn move_left(&mut self) {
        self.index = self.index.saturating_sub(1);
    }

    pub fn move_right(&mut self, total: usize) {
        if self.index + 1 < total {
            self.index += 1;
        }
    }

    pub fn update_position(
        &mut self,
        pos: Pos2,
        layout: &ChartLayout,
        transform: &ChartTransform,
        panel_scales: &[ValueScale],
        total: usize,
    ) {
        self.screen_pos = pos;
        let hovered = layout.pane_at(pos);
        self.visible = hovered.is_some() && total > 0;
        if !self.visible {
            return;
        }
        self.pane = hovered.flatten();

        let bar = transform.bar_at(pos.x).clamp(0, total as i64 - 1);
        self.index = bar as usize;

        self.value = match self.pane {
            None => transform.y_to_price(pos.y),
            Some(i) => panel_scales.get(i).map_or(0.0, |scale| scale.from_y(pos.y)),
        };
    }

    fn tag_width(text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * GLYPH_RATIO + 8.0
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &self,
        surface: &mut dyn Surface,
        layout: &ChartLayout,
        transform: &ChartTransform,
        window: &BarWindow,
        volume: &VolumeItem,
        precision: u32,
        font_size: f32,
    ) {
        if !self.visible {
            return;
        }
        let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(255, 255, 255, 128));
        let plot = layout.plot();
        let tag_height = font_size + 6.0;

        // Vertical line through every pane
        let bar_x = transform.index_to_x(self.index as f64);
        surface.dashed_line(pos2(bar_x, plot.top()), pos2(bar_x, plot.bottom()), stroke, 4.0, 3.0);

        // Horizontal line in the hovered pane
        let pane_rect = match self.pane {
            None => layout.main,
            Some(i) => layout.panels.get(i).copied().unwrap_or(layout.main),
        };
        let y = self.screen_pos.y;
        surface.dashed_line(pos2(pane_rect.left(), y), pos2(pane_rect.right(), y), stroke, 4.0, 3.0);

        // Value tag on the axis
        let label = match self.pane {
            None => format_price(self.value, precision as usize),
            Some(_) => format!("{:.2}", self.value),
        };
        let axis = layout.price_axis;
        draw_tag(
            surface,
            Rect::from_min_size(pos2(axis.left(), y - tag_height * 0.5), vec2(axis.width(), tag_height)),
            label,
            font_size,
        );

        // Time tag on the axis
        if let Some(bar) = window.bar(self.index) {
            let label = format_cursor_time(bar.time);
            let width = Self::tag_width(&label, font_size);
            let time_axis = layout.time_axis;
            draw_tag(
                surface,
                Rect::from_min_size(
                    pos2(bar_x - width * 0.5, time_axis.top() + 2.0),
                    vec2(width, tag_height),
                ),
                label,
                font_size,
            );
        }

        // Info box
        let candle_info = CandleItem::default().info_text(window, self.index, precision);
        if candle_info.is_empty() {
            return;
        }
        let volume_info = volume.info_text(window, self.index, precision);
        let info = format!("{}\n{}", candle_info, volume_info);

        // Opposite side of the cursor
        let main = layout.main;
        let info_x = if self.screen_pos.x < main.center().x {
            main.right() - INFO_BOX_WIDTH - 4.0
        } else {
            main.left() + 4.0
        };
        let info_rect = Rect::from_min_size(
            pos2(info_x, main.top() + 4.0),
            vec2(INFO_BOX_WIDTH, INFO_BOX_HEIGHT),
        );
        surface.rect_filled(info_rect, Color32::from_rgba_unmultiplied(0, 0, 0, 200));
        surface.rect_stroke(info_rect, Stroke::new(1.0, GREY_COLOR));
        surface.text(
            pos2(info_rect.left() + 8.0, info_rect.top() + 8.0),
            Align2::LEFT_TOP,
            info,
            font_size,
            WHITE_COLOR,
        );
    }
}
