//! Coordinate conversions between world space (bar index, price) and pixels.
//!
//! One [`ChartTransform`] is built per frame and shared by the draw passes,
//! the crosshair and the drawing tools, so hit-testing always agrees with
//! what is on screen.

use egui::{Pos2, Rect};

use crate::trader::{safe_span, WorldPoint, MIN_SPAN};

/// Fraction of the price span added above and below the visible range
pub const PRICE_PADDING: f64 = 0.08;

/// Linear map of a value range onto a vertical pixel extent (inverted)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub rect: Rect,
    pub min: f64,
    pub max: f64,
}

impl ValueScale {
    pub fn new(rect: Rect, min: f64, max: f64) -> Self {
        Self { rect, min, max }
    }

    /// Range widened by `padding` of its span on both sides. A zero span
    /// is opened up around the value first.
    pub fn padded(rect: Rect, low: f64, high: f64, padding: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let span = high - low;
        let (low, high) = if span < MIN_SPAN {
            let half = (high.abs() * 0.005).max(MIN_SPAN * 1e3);
            (low - half, high + half)
        } else {
            (low, high)
        };
        let pad = (high - low) * padding;
        Self::new(rect, low - pad, high + pad)
    }

    pub fn to_y(&self, value: f64) -> f32 {
        let normalized = (value - self.min) / safe_span(self.max - self.min);
        self.rect.bottom() - (normalized as f32 * self.rect.height())
    }

    pub fn from_y(&self, y: f32) -> f64 {
        let height = self.rect.height().max(1.0);
        let normalized = ((self.rect.bottom() - y) / height) as f64;
        self.min + normalized * (self.max - self.min)
    }
}

/// Transform of the main price pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartTransform {
    /// Price pane in pixels
    pub pane: Rect,
    pub offset_x: f32,
    /// Fractional index at the left edge
    pub start_index: f64,
    pub bar_spacing: f64,
    pub price: ValueScale,
}

impl ChartTransform {
    /// `low`/`high` are the raw visible price extremes; padding is applied here.
    pub fn new(pane: Rect, start_index: f64, bar_spacing: f64, low: f64, high: f64) -> Self {
        Self {
            pane,
            offset_x: pane.left(),
            start_index,
            bar_spacing: bar_spacing.max(MIN_SPAN),
            price: ValueScale::padded(pane, low, high, PRICE_PADDING),
        }
    }

    pub fn min_price(&self) -> f64 {
        self.price.min
    }

    pub fn max_price(&self) -> f64 {
        self.price.max
    }

    /// `x = offset_x + (i - start_index) * bar_spacing`
    pub fn index_to_x(&self, index: f64) -> f32 {
        self.offset_x + ((index - self.start_index) * self.bar_spacing) as f32
    }

    pub fn x_to_index(&self, x: f32) -> f64 {
        self.start_index + (x - self.offset_x) as f64 / self.bar_spacing
    }

    pub fn price_to_y(&self, price: f64) -> f32 {
        self.price.to_y(price)
    }

    pub fn y_to_price(&self, y: f32) -> f64 {
        self.price.from_y(y)
    }

    pub fn world_to_screen(&self, point: WorldPoint) -> Pos2 {
        Pos2::new(self.index_to_x(point.index), self.price_to_y(point.price))
    }

    pub fn screen_to_world(&self, pos: Pos2) -> WorldPoint {
        WorldPoint::new(self.x_to_index(pos.x), self.y_to_price(pos.y))
    }

    /// Pixel delta to world delta
    pub fn screen_delta_to_world(&self, dx: f32, dy: f32) -> (f64, f64) {
        let d_index = dx as f64 / self.bar_spacing;
        let height = self.pane.height().max(1.0) as f64;
        let d_price = -(dy as f64) / height * (self.price.max - self.price.min);
        (d_index, d_price)
    }

    /// Nearest whole bar index under `x`
    pub fn bar_at(&self, x: f32) -> i64 {
        self.x_to_index(x).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn transform() -> ChartTransform {
        let pane = Rect::from_min_max(pos2(10.0, 0.0), pos2(810.0, 500.0));
        ChartTransform::new(pane, 100.0, 8.0, 90.0, 110.0)
    }

    #[test]
    fn test_index_x_round_trip() {
        let t = transform();
        assert_eq!(t.index_to_x(100.0), 10.0);
        assert_eq!(t.index_to_x(110.0), 90.0);
        assert!((t.x_to_index(90.0) - 110.0).abs() < 1e-9);
        assert_eq!(t.bar_at(93.0), 110);
    }

    #[test]
    fn test_price_padding_and_inversion() {
        let t = transform();
        assert!((t.min_price() - 88.4).abs() < 1e-9);
        assert!((t.max_price() - 111.6).abs() < 1e-9);
        assert!(t.price_to_y(110.0) < t.price_to_y(90.0));
        assert_eq!(t.price_to_y(t.max_price()), 0.0);
        assert_eq!(t.price_to_y(t.min_price()), 500.0);
        assert!((t.y_to_price(t.price_to_y(101.25)) - 101.25).abs() < 1e-4);
    }

    #[test]
    fn test_degenerate_range_is_opened() {
        let pane = Rect::from_min_max(pos2(0.0, 0.0), pos2(100.0, 100.0));
        let t = ChartTransform::new(pane, 0.0, 8.0, 50.0, 50.0);
        assert!(t.max_price() > t.min_price());
        let y = t.price_to_y(50.0);
        assert!(y.is_finite());
        assert!((y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_world_screen_round_trip() {
        let t = transform();
        let point = WorldPoint::new(123.5, 104.2);
        let back = t.screen_to_world(t.world_to_screen(point));
        assert!((back.index - point.index).abs() < 1e-3);
        assert!((back.price - point.price).abs() < 1e-3);

        let (d_index, d_price) = t.screen_delta_to_world(16.0, -50.0);
        assert_eq!(d_index, 2.0);
        assert!(d_price > 0.0);
    }
}
