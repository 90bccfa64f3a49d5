//! Chart items for rendering the price series, volume and indicators,
//! plus the free-standing passes for grid, axes, markers and the last price.

use egui::{pos2, Align2, Color32, Pos2, Rect, Stroke};

use super::base::{
    fade, format_price, format_volume, BACKGROUND_COLOR, BAR_WIDTH, CURSOR_COLOR, DOWN_COLOR,
    EVENT_COLOR, GREY_COLOR, GRID_COLOR, INDICATOR_COLORS, LINE_COLOR, PEN_WIDTH, SESSION_COLOR,
    UP_COLOR, WHITE_COLOR,
};
use super::coords::{ChartTransform, ValueScale};
use super::surface::Surface;
use super::ticks::TimeTick;
use crate::indicator::IndicatorOutput;
use crate::trader::{Candle, ChartMode, IndicatorKind, LineStyle, ProjectedEvent};

/// Share of the volume band's height a full bar reaches
const VOLUME_FILL: f32 = 0.9;
const VOLUME_ALPHA: f32 = 0.45;
const AREA_ALPHA: f32 = 0.18;
const BAND_ALPHA: f32 = 0.06;

/// Visible bars of the active series, with the smoothed live candle standing
/// in for the last bar
#[derive(Debug, Clone, Copy)]
pub struct BarWindow<'a> {
    pub candles: &'a [Candle],
    pub first: usize,
    pub last: usize,
    pub live: Option<Candle>,
}

impl<'a> BarWindow<'a> {
    pub fn new(candles: &'a [Candle], first: usize, last: usize, live: Option<Candle>) -> Self {
        Self {
            candles,
            first,
            last: last.min(candles.len().saturating_sub(1)),
            live,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty() || self.first > self.last
    }

    /// Bar at `ix` as it should be displayed
    pub fn bar(&self, ix: usize) -> Option<Candle> {
        let candle = *self.candles.get(ix)?;
        match self.live {
            Some(live) if ix + 1 == self.candles.len() && live.time == candle.time => Some(live),
            _ => Some(candle),
        }
    }

    pub fn bars(&self) -> impl Iterator<Item = (usize, Candle)> + '_ {
        let end = if self.is_empty() { self.first } else { self.last + 1 };
        (self.first..end).filter_map(move |ix| self.bar(ix).map(|bar| (ix, bar)))
    }

    /// Last bar of the whole series, live value applied
    pub fn latest(&self) -> Option<(usize, Candle)> {
        let ix = self.candles.len().checked_sub(1)?;
        self.bar(ix).map(|bar| (ix, bar))
    }
}

/// Everything a draw pass needs besides the surface
#[derive(Debug, Clone, Copy)]
pub struct DrawContext<'a> {
    pub transform: &'a ChartTransform,
    pub window: BarWindow<'a>,
    pub precision: u32,
    pub font_size: f32,
}

impl DrawContext<'_> {
    fn bar_width(&self) -> f32 {
        (self.transform.bar_spacing as f32 * BAR_WIDTH * 2.0).max(1.0)
    }

    fn x(&self, ix: usize) -> f32 {
        self.transform.index_to_x(ix as f64)
    }
}

/// Trait for chart items that can be drawn
pub trait ChartItem {
    /// Value range over the visible window
    fn y_range(&self, window: &BarWindow) -> Option<(f64, f64)>;

    /// Info text for a specific bar index
    fn info_text(&self, window: &BarWindow, ix: usize, precision: u32) -> String;

    fn draw(&self, surface: &mut dyn Surface, ctx: &DrawContext);
}

fn merge_range(range: Option<(f64, f64)>, low: f64, high: f64) -> Option<(f64, f64)> {
    Some(match range {
        Some((lo, hi)) => (lo.min(low), hi.max(high)),
        None => (low, high),
    })
}

/// Union of two optional ranges
pub fn union_range(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((lo, hi)), b) => merge_range(b, lo, hi),
        (None, b) => b,
    }
}

/// Price series painted as candles, a close line or a filled area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleItem {
    pub mode: ChartMode,
    /// Opacity used while cross-fading between modes
    pub alpha: f32,
}

impl Default for CandleItem {
    fn default() -> Self {
        Self::new(ChartMode::Candles)
    }
}

impl CandleItem {
    pub fn new(mode: ChartMode) -> Self {
        Self { mode, alpha: 1.0 }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    fn draw_candles(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        let transform = ctx.transform;
        let half = ctx.bar_width() * 0.5;

        for (ix, bar) in ctx.window.bars() {
            let x = ctx.x(ix);
            let color = fade(if bar.is_up() { UP_COLOR } else { DOWN_COLOR }, self.alpha);
            let stroke = Stroke::new(PEN_WIDTH, color);

            // Wick
            let high_y = transform.price_to_y(bar.high);
            let low_y = transform.price_to_y(bar.low);
            surface.line(pos2(x, high_y), pos2(x, low_y), stroke);

            // Body
            let open_y = transform.price_to_y(bar.open);
            let close_y = transform.price_to_y(bar.close);
            if (open_y - close_y).abs() < 1.0 {
                surface.line(pos2(x - half, open_y), pos2(x + half, open_y), stroke);
            } else {
                let body = Rect::from_min_max(
                    pos2(x - half, open_y.min(close_y)),
                    pos2(x + half, open_y.max(close_y)),
                );
                surface.rect_filled(body, color);
            }
        }
    }

    fn close_points(&self, ctx: &DrawContext) -> Vec<Pos2> {
        ctx.window
            .bars()
            .map(|(ix, bar)| pos2(ctx.x(ix), ctx.transform.price_to_y(bar.close)))
            .collect()
    }

    fn draw_line(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        let points = self.close_points(ctx);
        if points.len() > 1 {
            surface.polyline(points, Stroke::new(PEN_WIDTH * 2.0, fade(LINE_COLOR, self.alpha)));
        }
    }

    fn draw_area(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        let points = self.close_points(ctx);
        let bottom = ctx.transform.pane.bottom();
        let fill = fade(LINE_COLOR, AREA_ALPHA * self.alpha);
        // One quad per segment keeps every polygon convex
        for pair in points.windows(2) {
            surface.polygon(
                vec![pair[0], pair[1], pos2(pair[1].x, bottom), pos2(pair[0].x, bottom)],
                fill,
            );
        }
        self.draw_line(surface, ctx);
    }
}

impl ChartItem for CandleItem {
    fn y_range(&self, window: &BarWindow) -> Option<(f64, f64)> {
        window.bars().fold(None, |range, (_, bar)| match self.mode {
            ChartMode::Candles => merge_range(range, bar.low, bar.high),
            ChartMode::Line | ChartMode::Area => merge_range(range, bar.close, bar.close),
        })
    }

    fn info_text(&self, window: &BarWindow, ix: usize, precision: u32) -> String {
        let Some(bar) = window.bar(ix) else {
            return String::new();
        };
        let Some(dt) = bar.datetime() else {
            return String::new();
        };
        let decimals = precision as usize;
        format!(
            "Date  {}\nTime  {}\nOpen  {}\nHigh  {}\nLow   {}\nClose {}",
            dt.format("%Y-%m-%d"),
            dt.format("%H:%M"),
            format_price(bar.open, decimals),
            format_price(bar.high, decimals),
            format_price(bar.low, decimals),
            format_price(bar.close, decimals),
        )
    }

    fn draw(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        if self.alpha <= 0.0 || ctx.window.is_empty() {
            return;
        }
        match self.mode {
            ChartMode::Candles => self.draw_candles(surface, ctx),
            ChartMode::Line => self.draw_line(surface, ctx),
            ChartMode::Area => self.draw_area(surface, ctx),
        }
    }
}

/// Volume histogram in the lower band of the price pane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeItem {
    pub rect: Rect,
}

impl VolumeItem {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    fn volume_to_y(&self, volume: f64, max_volume: f64) -> f32 {
        if max_volume <= 0.0 {
            return self.rect.bottom();
        }
        let normalized = (volume / max_volume).clamp(0.0, 1.0) as f32;
        self.rect.bottom() - normalized * self.rect.height() * VOLUME_FILL
    }
}

impl ChartItem for VolumeItem {
    fn y_range(&self, window: &BarWindow) -> Option<(f64, f64)> {
        window
            .bars()
            .fold(None, |range, (_, bar)| merge_range(range, 0.0, bar.volume))
    }

    fn info_text(&self, window: &BarWindow, ix: usize, _precision: u32) -> String {
        window
            .bar(ix)
            .map(|bar| format!("Vol   {}", format_volume(bar.volume)))
            .unwrap_or_default()
    }

    fn draw(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        let Some((_, max_volume)) = self.y_range(&ctx.window) else {
            return;
        };
        let half = ctx.bar_width() * 0.5;
        for (ix, bar) in ctx.window.bars() {
            let x = ctx.x(ix);
            let top = self.volume_to_y(bar.volume, max_volume);
            if self.rect.bottom() - top < 0.5 {
                continue;
            }
            let color = fade(if bar.is_up() { UP_COLOR } else { DOWN_COLOR }, VOLUME_ALPHA);
            surface.rect_filled(
                Rect::from_min_max(pos2(x - half, top), pos2(x + half, self.rect.bottom())),
                color,
            );
        }
    }
}

/// Indicator painted either over the price pane or in its own panel
#[derive(Debug, Clone, Copy)]
pub struct IndicatorItem<'a> {
    pub output: IndicatorOutput<'a>,
    /// Offset into the color cycle
    pub color_index: usize,
    /// Value scale of the panel; `None` draws against the price transform
    pub panel: Option<ValueScale>,
}

impl<'a> IndicatorItem<'a> {
    pub fn overlay(output: IndicatorOutput<'a>, color_index: usize) -> Self {
        Self {
            output,
            color_index,
            panel: None,
        }
    }

    pub fn panel(output: IndicatorOutput<'a>, color_index: usize, rect: Rect, window: &BarWindow) -> Self {
        let range = output
            .def
            .value_bounds()
            .or_else(|| output.data.y_range(window.first, window.last))
            .unwrap_or((0.0, 1.0));
        let scale = match output.def.kind() {
            IndicatorKind::Oscillator => ValueScale::new(rect, range.0, range.1),
            _ => ValueScale::padded(rect, range.0, range.1, 0.1),
        };
        Self {
            output,
            color_index,
            panel: Some(scale),
        }
    }

    fn color(&self, line: usize) -> Color32 {
        INDICATOR_COLORS[(self.color_index + line) % INDICATOR_COLORS.len()]
    }

    fn value_to_y(&self, transform: &ChartTransform, value: f64) -> f32 {
        match &self.panel {
            Some(scale) => scale.to_y(value),
            None => transform.price_to_y(value),
        }
    }

    /// Polyline runs of one line, split wherever the value is undefined
    fn line_runs(&self, ctx: &DrawContext, line: usize) -> Vec<Vec<Pos2>> {
        let mut runs = Vec::new();
        let mut run = Vec::new();
        for ix in ctx.window.first..=ctx.window.last {
            match self.output.data.value(line, ix) {
                Some(value) => run.push(pos2(ctx.x(ix), self.value_to_y(ctx.transform, value))),
                None if !run.is_empty() => runs.push(std::mem::take(&mut run)),
                None => {}
            }
        }
        if !run.is_empty() {
            runs.push(run);
        }
        runs
    }

    fn draw_lines(&self, surface: &mut dyn Surface, ctx: &DrawContext, lines: &[usize]) {
        for &line in lines {
            let stroke = Stroke::new(PEN_WIDTH * 1.5, self.color(line));
            for run in self.line_runs(ctx, line) {
                if run.len() > 1 {
                    surface.polyline(run, stroke);
                }
            }
        }
    }

    fn draw_band_fill(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        let fill = fade(self.color(1), BAND_ALPHA);
        for ix in ctx.window.first..ctx.window.last {
            let data = self.output.data;
            let (Some(u0), Some(l0), Some(u1), Some(l1)) = (
                data.value(1, ix),
                data.value(2, ix),
                data.value(1, ix + 1),
                data.value(2, ix + 1),
            ) else {
                continue;
            };
            let (x0, x1) = (ctx.x(ix), ctx.x(ix + 1));
            surface.polygon(
                vec![
                    pos2(x0, ctx.transform.price_to_y(u0)),
                    pos2(x1, ctx.transform.price_to_y(u1)),
                    pos2(x1, ctx.transform.price_to_y(l1)),
                    pos2(x0, ctx.transform.price_to_y(l0)),
                ],
                fill,
            );
        }
    }

    fn draw_level(&self, surface: &mut dyn Surface, scale: &ValueScale, value: f64) {
        let y = scale.to_y(value);
        surface.styled_line(
            pos2(scale.rect.left(), y),
            pos2(scale.rect.right(), y),
            Stroke::new(PEN_WIDTH, GREY_COLOR),
            LineStyle::Dashed,
        );
    }

    fn draw_histogram(&self, surface: &mut dyn Surface, ctx: &DrawContext, scale: &ValueScale) {
        let zero = scale.to_y(0.0);
        let half = ctx.bar_width() * 0.5;
        for ix in ctx.window.first..=ctx.window.last {
            let Some(value) = self.output.data.value(2, ix) else {
                continue;
            };
            let y = scale.to_y(value);
            let color = fade(if value >= 0.0 { UP_COLOR } else { DOWN_COLOR }, 0.7);
            let x = ctx.x(ix);
            surface.rect_filled(
                Rect::from_min_max(pos2(x - half, y.min(zero)), pos2(x + half, y.max(zero))),
                color,
            );
        }
    }

    /// Panel title with the latest visible values
    fn draw_title(&self, surface: &mut dyn Surface, ctx: &DrawContext, rect: Rect) {
        let mut title = self.output.name();
        for line in 0..self.output.def.line_names().len() {
            if let Some(value) = self.output.data.value(line, ctx.window.last) {
                title.push_str(&format!("  {:.2}", value));
            }
        }
        surface.text(
            pos2(rect.left() + 6.0, rect.top() + 4.0),
            Align2::LEFT_TOP,
            title,
            ctx.font_size,
            WHITE_COLOR,
        );
    }

    /// Top and bottom value labels on the axis next to the panel
    fn draw_panel_axis(&self, surface: &mut dyn Surface, ctx: &DrawContext, scale: &ValueScale) {
        let x = scale.rect.right() + 6.0;
        for (value, y) in [
            (scale.max, scale.rect.top() + ctx.font_size),
            (scale.min, scale.rect.bottom() - ctx.font_size),
        ] {
            surface.text(pos2(x, y), Align2::LEFT_CENTER, format!("{:.2}", value), ctx.font_size, GREY_COLOR);
        }
    }
}

impl ChartItem for IndicatorItem<'_> {
    fn y_range(&self, window: &BarWindow) -> Option<(f64, f64)> {
        self.output.data.y_range(window.first, window.last)
    }

    fn info_text(&self, _window: &BarWindow, ix: usize, _precision: u32) -> String {
        let names = self.output.def.line_names();
        let values: Vec<String> = names
            .iter()
            .enumerate()
            .filter_map(|(line, name)| {
                self.output
                    .data
                    .value(line, ix)
                    .map(|value| format!("{} {:.2}", name, value))
            })
            .collect();
        if values.is_empty() {
            return String::new();
        }
        format!("{}  {}", self.output.name(), values.join(" "))
    }

    fn draw(&self, surface: &mut dyn Surface, ctx: &DrawContext) {
        if ctx.window.is_empty() {
            return;
        }
        let kind = self.output.def.kind();
        let Some(scale) = self.panel else {
            if kind == IndicatorKind::Band {
                self.draw_band_fill(surface, ctx);
                self.draw_lines(surface, ctx, &[0, 1, 2]);
            } else {
                self.draw_lines(surface, ctx, &[0]);
            }
            return;
        };

        surface.line(
            scale.rect.left_top(),
            scale.rect.right_top(),
            Stroke::new(PEN_WIDTH, GRID_COLOR),
        );
        match kind {
            IndicatorKind::Oscillator => {
                self.draw_level(surface, &scale, 30.0);
                self.draw_level(surface, &scale, 70.0);
                self.draw_lines(surface, ctx, &[0]);
            }
            IndicatorKind::Macd => {
                self.draw_level(surface, &scale, 0.0);
                self.draw_histogram(surface, ctx, &scale);
                self.draw_lines(surface, ctx, &[0, 1]);
            }
            IndicatorKind::Line | IndicatorKind::Band => {
                self.draw_lines(surface, ctx, &[0]);
            }
        }
        self.draw_title(surface, ctx, scale.rect);
        self.draw_panel_axis(surface, ctx, &scale);
    }
}

/// Horizontal grid at price ticks, vertical grid at time ticks, dashed
/// separators at session starts
pub fn draw_grid(
    surface: &mut dyn Surface,
    transform: &ChartTransform,
    plot: Rect,
    price_ticks: &[f64],
    time_ticks: &[TimeTick],
    sessions: &[usize],
) {
    let stroke = Stroke::new(PEN_WIDTH, GRID_COLOR);
    let pane = transform.pane;
    for &price in price_ticks {
        let y = transform.price_to_y(price);
        surface.line(pos2(pane.left(), y), pos2(pane.right(), y), stroke);
    }
    for tick in time_ticks {
        let x = transform.index_to_x(tick.index as f64);
        surface.line(pos2(x, plot.top()), pos2(x, plot.bottom()), stroke);
    }
    let session = Stroke::new(PEN_WIDTH, SESSION_COLOR);
    for &ix in sessions {
        // between the last bar of the old day and the first of the new one
        let x = transform.index_to_x(ix as f64 - 0.5);
        surface.styled_line(pos2(x, plot.top()), pos2(x, plot.bottom()), session, LineStyle::Dashed);
    }
}

pub fn draw_price_axis(
    surface: &mut dyn Surface,
    axis: Rect,
    transform: &ChartTransform,
    ticks: &[f64],
    precision: u32,
    font_size: f32,
) {
    surface.rect_filled(axis, BACKGROUND_COLOR);
    surface.line(axis.left_top(), axis.left_bottom(), Stroke::new(PEN_WIDTH, GREY_COLOR));
    for &price in ticks {
        let y = transform.price_to_y(price);
        if y < transform.pane.top() || y > transform.pane.bottom() {
            continue;
        }
        surface.line(pos2(axis.left(), y), pos2(axis.left() + 4.0, y), Stroke::new(PEN_WIDTH, GREY_COLOR));
        surface.text(
            pos2(axis.left() + 6.0, y),
            Align2::LEFT_CENTER,
            format_price(price, precision as usize),
            font_size,
            WHITE_COLOR,
        );
    }
}

pub fn draw_time_axis(
    surface: &mut dyn Surface,
    axis: Rect,
    transform: &ChartTransform,
    ticks: &[TimeTick],
    font_size: f32,
) {
    surface.rect_filled(axis, BACKGROUND_COLOR);
    surface.line(axis.left_top(), axis.right_top(), Stroke::new(PEN_WIDTH, GREY_COLOR));
    for tick in ticks {
        let x = transform.index_to_x(tick.index as f64);
        if x < axis.left() || x > axis.right() {
            continue;
        }
        surface.line(pos2(x, axis.top()), pos2(x, axis.top() + 4.0), Stroke::new(PEN_WIDTH, GREY_COLOR));
        let color = if tick.major { WHITE_COLOR } else { GREY_COLOR };
        surface.text(pos2(x, axis.top() + 6.0), Align2::CENTER_TOP, tick.label.clone(), font_size, color);
    }
}

/// Vertical marker line with a badge and title per projected event
pub fn draw_events(
    surface: &mut dyn Surface,
    transform: &ChartTransform,
    events: &[ProjectedEvent],
    font_size: f32,
) {
    let pane = transform.pane;
    let stroke = Stroke::new(PEN_WIDTH, fade(EVENT_COLOR, 0.6));
    for event in events {
        let x = transform.index_to_x(event.index as f64);
        if x < pane.left() || x > pane.right() {
            continue;
        }
        surface.styled_line(pos2(x, pane.top()), pos2(x, pane.bottom()), stroke, LineStyle::Dotted);
        let badge = pos2(x, pane.top() + 10.0);
        surface.circle(badge, 6.0, EVENT_COLOR, Stroke::NONE);
        surface.text(
            pos2(x + 9.0, badge.y),
            Align2::LEFT_CENTER,
            event.marker.title.clone(),
            font_size,
            EVENT_COLOR,
        );
        if !event.marker.subtitle.is_empty() {
            surface.text(
                pos2(x + 9.0, badge.y + font_size + 2.0),
                Align2::LEFT_CENTER,
                event.marker.subtitle.clone(),
                font_size * 0.9,
                GREY_COLOR,
            );
        }
    }
}

/// Dashed line at the latest close with a label on the price axis. `glow`
/// in `[0, 1]` pulses a dot on the live bar.
#[allow(clippy::too_many_arguments)]
pub fn draw_last_price(
    surface: &mut dyn Surface,
    transform: &ChartTransform,
    axis: Rect,
    latest: (usize, Candle),
    precision: u32,
    font_size: f32,
    glow: f32,
) {
    let (ix, bar) = latest;
    let pane = transform.pane;
    let y = transform.price_to_y(bar.close);
    if y < pane.top() || y > pane.bottom() {
        return;
    }
    let color = if bar.is_up() { UP_COLOR } else { DOWN_COLOR };
    surface.styled_line(
        pos2(pane.left(), y),
        pos2(pane.right(), y),
        Stroke::new(PEN_WIDTH, fade(color, 0.8)),
        LineStyle::Dashed,
    );

    let x = transform.index_to_x(ix as f64);
    if x >= pane.left() && x <= pane.right() {
        surface.circle(pos2(x, y), 3.0 + 3.0 * glow, fade(color, 0.25 + 0.35 * glow), Stroke::NONE);
    }

    let label = Rect::from_min_max(
        pos2(axis.left(), y - font_size * 0.8),
        pos2(axis.right(), y + font_size * 0.8),
    );
    surface.rect_filled(label, color);
    surface.text(
        pos2(axis.left() + 6.0, y),
        Align2::LEFT_CENTER,
        format_price(bar.close, precision as usize),
        font_size,
        Color32::WHITE,
    );
}

/// Filled label with dark text, used by the crosshair
pub fn draw_tag(surface: &mut dyn Surface, rect: Rect, text: String, font_size: f32) {
    surface.rect_filled(rect, CURSOR_COLOR);
    surface.text(rect.center(), Align2::CENTER_CENTER, text, font_size, Color32::BLACK);
}
