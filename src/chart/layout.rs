//! Partition of the chart area into panes and axes.

use egui::{pos2, Rect};

use super::base::{AXIS_X_HEIGHT, AXIS_Y_WIDTH};

/// Height share of one indicator panel
pub const PANEL_RATIO: f32 = 0.18;
/// Smallest height share left to the price pane
pub const MIN_MAIN_RATIO: f32 = 0.5;
/// Share of the price pane used by the volume histogram
pub const VOLUME_RATIO: f32 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    /// Whole area handed to the renderer
    pub full: Rect,
    /// Price pane, candles and overlays
    pub main: Rect,
    /// Lower band of the price pane holding the volume histogram
    pub volume: Rect,
    /// Indicator panels, top to bottom
    pub panels: Vec<Rect>,
    /// Price/value axis to the right of every pane
    pub price_axis: Rect,
    /// Time axis along the bottom
    pub time_axis: Rect,
}

impl ChartLayout {
    pub fn compute(full: Rect, panel_count: usize) -> Self {
        let plot_right = (full.right() - AXIS_Y_WIDTH).max(full.left());
        let plot_bottom = (full.bottom() - AXIS_X_HEIGHT).max(full.top());
        let plot_height = plot_bottom - full.top();

        let panel_ratio = if panel_count == 0 {
            0.0
        } else {
            PANEL_RATIO.min((1.0 - MIN_MAIN_RATIO) / panel_count as f32)
        };
        let panel_height = plot_height * panel_ratio;
        let main_height = plot_height - panel_height * panel_count as f32;

        let main = Rect::from_min_max(full.min, pos2(plot_right, full.top() + main_height));
        let volume = Rect::from_min_max(
            pos2(main.left(), main.bottom() - main.height() * VOLUME_RATIO),
            main.max,
        );

        let panels = (0..panel_count)
            .map(|i| {
                let top = main.bottom() + panel_height * i as f32;
                Rect::from_min_max(pos2(full.left(), top), pos2(plot_right, top + panel_height))
            })
            .collect();

        Self {
            full,
            main,
            volume,
            panels,
            price_axis: Rect::from_min_max(pos2(plot_right, full.top()), pos2(full.right(), plot_bottom)),
            time_axis: Rect::from_min_max(pos2(full.left(), plot_bottom), pos2(plot_right, full.bottom())),
        }
    }

    /// Union of every pane, excluding axes
    pub fn plot(&self) -> Rect {
        Rect::from_min_max(self.main.min, pos2(self.main.right(), self.time_axis.top()))
    }

    /// Pane containing `pos`: `Some(None)` for the price pane, `Some(Some(i))` for panel `i`
    pub fn pane_at(&self, pos: egui::Pos2) -> Option<Option<usize>> {
        if self.main.contains(pos) {
            return Some(None);
        }
        self.panels.iter().position(|rect| rect.contains(pos)).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> Rect {
        Rect::from_min_max(pos2(0.0, 0.0), pos2(1072.0, 728.0))
    }

    #[test]
    fn test_layout_without_panels() {
        let layout = ChartLayout::compute(area(), 0);
        assert_eq!(layout.main.height(), 700.0);
        assert_eq!(layout.main.width(), 1000.0);
        assert_eq!(layout.volume.height(), 140.0);
        assert_eq!(layout.time_axis.height(), AXIS_X_HEIGHT);
        assert!(layout.panels.is_empty());
    }

    #[test]
    fn test_panels_stack_under_main() {
        let layout = ChartLayout::compute(area(), 2);
        assert_eq!(layout.panels.len(), 2);
        assert!((layout.panels[0].height() - 126.0).abs() < 1e-3);
        assert_eq!(layout.panels[0].top(), layout.main.bottom());
        assert!((layout.panels[1].bottom() - layout.time_axis.top()).abs() < 1e-3);
    }

    #[test]
    fn test_main_keeps_half_with_many_panels() {
        let layout = ChartLayout::compute(area(), 5);
        assert!(layout.main.height() >= 350.0 - 1e-3);
    }

    #[test]
    fn test_pane_at() {
        let layout = ChartLayout::compute(area(), 1);
        assert_eq!(layout.pane_at(pos2(10.0, 10.0)), Some(None));
        assert_eq!(layout.pane_at(pos2(10.0, layout.panels[0].center().y)), Some(Some(0)));
        assert_eq!(layout.pane_at(pos2(1050.0, 10.0)), None);
    }
}
