//! Pan/zoom state of the chart.
//!
//! `index` is the fractional bar offset of the left edge and `scale` the bar
//! spacing in pixels. Both chase their targets by exponential easing.

use crate::trader::Settings;

/// Tuning of the viewport behaviour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub bar_spacing: f64,
    pub min_bar_spacing: f64,
    pub max_bar_spacing: f64,
    /// Fraction of the remaining distance covered per frame
    pub easing: f64,
    /// Residual below which eased values snap to their target
    pub snap_epsilon: f64,
    /// Minimum bars of scroll margin past the last bar
    pub min_end_padding: f64,
    /// Scroll margin as a fraction of the visible bar count
    pub end_padding_ratio: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            bar_spacing: 8.0,
            min_bar_spacing: 2.0,
            max_bar_spacing: 60.0,
            easing: 0.25,
            snap_epsilon: 1e-3,
            min_end_padding: 6.0,
            end_padding_ratio: 0.15,
        }
    }
}

impl ViewportConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let default = Self::default();
        Self {
            bar_spacing: settings
                .get_float("chart.bar_spacing")
                .unwrap_or(default.bar_spacing),
            min_bar_spacing: settings
                .get_float("chart.min_bar_spacing")
                .unwrap_or(default.min_bar_spacing),
            max_bar_spacing: settings
                .get_float("chart.max_bar_spacing")
                .unwrap_or(default.max_bar_spacing),
            easing: settings
                .get_float("chart.easing")
                .unwrap_or(default.easing)
                .clamp(0.01, 1.0),
            ..default
        }
    }
}

/// Bars that fit in `width` pixels at `scale`
fn bars_in(width: f64, scale: f64) -> f64 {
    if scale <= 0.0 {
        return 0.0;
    }
    (width / scale).max(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub index: f64,
    pub target_index: f64,
    pub scale: f64,
    pub target_scale: f64,
    /// Pinned to the latest bar
    pub follow: bool,
    /// Whether follow mode may engage for the current timeframe
    pub follow_allowed: bool,
    config: ViewportConfig,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            index: 0.0,
            target_index: 0.0,
            scale: config.bar_spacing,
            target_scale: config.bar_spacing,
            follow: true,
            follow_allowed: true,
            config,
        }
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Number of bars visible at the current scale
    pub fn visible_count(&self, width: f64) -> f64 {
        bars_in(width, self.scale)
    }

    /// Scroll margin past the last bar. Never hides the last bar on a
    /// pane narrower than the minimum margin.
    pub fn end_padding(&self, visible: f64) -> f64 {
        self.config
            .min_end_padding
            .max(self.config.end_padding_ratio * visible)
            .min((visible - 1.0).max(0.0))
    }

    /// Largest allowed left-edge index
    pub fn max_start(&self, total: usize, visible: f64) -> f64 {
        (total as f64 - visible + self.end_padding(visible)).max(0.0)
    }

    fn clamp_scale(&self, scale: f64) -> f64 {
        if !scale.is_finite() {
            return self.config.bar_spacing;
        }
        scale.clamp(self.config.min_bar_spacing, self.config.max_bar_spacing)
    }

    fn clamp_index(&self, index: f64, scale: f64, total: usize, width: f64) -> f64 {
        let max_start = self.max_start(total, bars_in(width, scale));
        if !index.is_finite() {
            return max_start;
        }
        index.clamp(0.0, max_start)
    }

    /// Clamp both current and target values into the scrollable range
    pub fn clamp(&mut self, total: usize, width: f64) {
        self.target_scale = self.clamp_scale(self.target_scale);
        self.scale = self.clamp_scale(self.scale);
        self.target_index = self.clamp_index(self.target_index, self.target_scale, total, width);
        self.index = self.clamp_index(self.index, self.scale, total, width);
    }

    /// Move the target to the latest bar when following
    pub fn apply_follow(&mut self, total: usize, width: f64) {
        if self.follow && self.follow_allowed {
            self.target_index = self.max_start(total, bars_in(width, self.target_scale));
        }
    }

    /// Ease current values toward their targets. Returns true while moving.
    pub fn ease(&mut self) -> bool {
        let easing = self.config.easing;
        let epsilon = self.config.snap_epsilon;

        let mut moving = false;
        for (current, target) in [
            (&mut self.index, self.target_index),
            (&mut self.scale, self.target_scale),
        ] {
            let residual = target - *current;
            if residual.abs() < epsilon {
                *current = target;
            } else {
                *current += residual * easing;
                moving = true;
            }
        }
        moving
    }

    pub fn is_animating(&self) -> bool {
        self.index != self.target_index || self.scale != self.target_scale
    }

    /// Set current and target at once
    pub fn jump_to_end(&mut self, total: usize, width: f64) {
        self.target_scale = self.clamp_scale(self.target_scale);
        self.scale = self.target_scale;
        self.target_index = self.max_start(total, bars_in(width, self.scale));
        self.index = self.target_index;
    }

    /// Drag by `dx` pixels; a drag to the right reveals older bars
    pub fn pan(&mut self, dx: f64, total: usize, width: f64) {
        if self.target_scale <= 0.0 {
            return;
        }
        let target = self.target_index - dx / self.target_scale;
        self.target_index = self.clamp_index(target, self.target_scale, total, width);
        // jump current along so dragging feels direct
        self.index = self.clamp_index(self.index - dx / self.scale, self.scale, total, width);

        let max_start = self.max_start(total, bars_in(width, self.target_scale));
        self.follow = self.follow_allowed && self.target_index >= max_start - 0.5;
    }

    /// Zoom by `factor` keeping the bar under `anchor_x` (pixels from the
    /// pane's left edge) fixed
    pub fn zoom(&mut self, factor: f64, anchor_x: f64, total: usize, width: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor_index = self.target_index + anchor_x / self.target_scale;
        let new_scale = self.clamp_scale(self.target_scale * factor);
        self.target_scale = new_scale;
        self.target_index =
            self.clamp_index(anchor_index - anchor_x / new_scale, new_scale, total, width);
        self.follow = false;
    }

    /// Inclusive range of bar indices touching the visible area
    pub fn visible_range(&self, total: usize, width: f64) -> Option<(usize, usize)> {
        if total == 0 {
            return None;
        }
        let first = self.index.floor().max(0.0) as usize;
        let last = (self.index + self.visible_count(width)).ceil().max(0.0) as usize;
        let last = last.min(total - 1);
        (first <= last).then_some((first, last))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_padding_minimum() {
        let viewport = Viewport::default();
        assert_eq!(viewport.end_padding(10.0), 6.0);
        assert_eq!(viewport.end_padding(100.0), 15.0);
    }

    #[test]
    fn test_narrow_pane_keeps_last_bar_visible() {
        let mut viewport = Viewport::default();
        viewport.scale = 60.0;
        viewport.target_scale = 60.0;
        // 120px at 60px per bar shows two bars, padding is capped at one
        viewport.apply_follow(500, 120.0);
        viewport.index = viewport.target_index;
        assert_eq!(viewport.end_padding(2.0), 1.0);
        assert_eq!(viewport.visible_range(500, 120.0), Some((499, 499)));
        assert_eq!(viewport.end_padding(0.5), 0.0);
    }

    #[test]
    fn test_clamp_holds_for_any_input() {
        let inputs = [
            (-1e9, 0.5),
            (1e9, 500.0),
            (f64::NAN, f64::NAN),
            (42.0, 8.0),
            (f64::INFINITY, 2.0),
        ];
        for total in [0usize, 5, 100, 10_000] {
            for &(index, scale) in &inputs {
                let mut viewport = Viewport::default();
                viewport.index = index;
                viewport.target_index = index;
                viewport.scale = scale;
                viewport.target_scale = scale;
                viewport.clamp(total, 800.0);

                let visible = viewport.visible_count(800.0);
                let max_start = viewport.max_start(total, visible);
                assert!(viewport.index >= 0.0);
                assert!(viewport.index <= max_start);
                assert!(max_start <= (total as f64 - visible + viewport.end_padding(visible)).max(0.0));
            }
        }
    }

    #[test]
    fn test_ease_converges_and_snaps() {
        let mut viewport = Viewport::default();
        viewport.target_index = 100.0;
        let mut frames = 0;
        while viewport.ease() {
            frames += 1;
            assert!(frames < 200, "easing never converged");
        }
        assert_eq!(viewport.index, 100.0);
        assert!(!viewport.is_animating());
    }

    #[test]
    fn test_follow_pins_to_end() {
        let mut viewport = Viewport::default();
        viewport.apply_follow(500, 800.0);
        // 100 visible bars, 15 bars padding
        assert_eq!(viewport.target_index, 415.0);

        viewport.follow_allowed = false;
        viewport.target_index = 0.0;
        viewport.apply_follow(500, 800.0);
        assert_eq!(viewport.target_index, 0.0);
    }

    #[test]
    fn test_pan_disables_and_reengages_follow() {
        let mut viewport = Viewport::default();
        viewport.jump_to_end(500, 800.0);
        viewport.pan(80.0, 500, 800.0);
        assert!(!viewport.follow);
        assert_eq!(viewport.target_index, 405.0);

        viewport.pan(-200.0, 500, 800.0);
        assert!(viewport.follow);
        assert_eq!(viewport.target_index, 415.0);
    }

    #[test]
    fn test_zoom_keeps_anchor_bar() {
        let mut viewport = Viewport::default();
        viewport.jump_to_end(1_000, 800.0);
        viewport.target_index = 300.0;
        let anchor_x = 400.0;
        let before = viewport.target_index + anchor_x / viewport.target_scale;
        viewport.zoom(2.0, anchor_x, 1_000, 800.0);
        let after = viewport.target_index + anchor_x / viewport.target_scale;
        assert!((before - after).abs() < 1e-9);
        assert_eq!(viewport.target_scale, 16.0);
        assert!(!viewport.follow);

        viewport.zoom(1_000.0, anchor_x, 1_000, 800.0);
        assert_eq!(viewport.target_scale, 60.0);
    }

    #[test]
    fn test_visible_range() {
        let mut viewport = Viewport::default();
        assert_eq!(viewport.visible_range(0, 800.0), None);
        viewport.index = 10.5;
        assert_eq!(viewport.visible_range(50, 800.0), Some((10, 49)));
        assert_eq!(viewport.visible_range(500, 800.0), Some((10, 111)));
    }
}
