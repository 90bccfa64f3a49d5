//! Frame-driven chart renderer.
//!
//! All mutable view state lives in one owned [`RenderState`]. The host calls
//! [`ChartRenderer::frame`] whenever a repaint is available and forwards
//! resize, density and pointer input; the renderer asks for the next frame
//! through the [`FrameScheduler`] only while something is still animating.

use egui::{PointerButton, Pos2, Rect, Vec2};
use tracing::debug;

use super::base::BACKGROUND_COLOR;
use super::coords::{ChartTransform, ValueScale};
use super::cursor::ChartCursor;
use super::items::{
    draw_events, draw_grid, draw_last_price, draw_price_axis, draw_time_axis, union_range,
    BarWindow, CandleItem, ChartItem, DrawContext, IndicatorItem, VolumeItem,
};
use super::layout::ChartLayout;
use super::live::LiveCandle;
use super::scheduler::{FrameScheduler, RepaintHost};
use super::surface::Surface;
use super::ticks::{price_tick_span, price_ticks, session_breaks, time_ticks};
use super::viewport::{Viewport, ViewportConfig};
use crate::drawing::DrawingManager;
use crate::event::ChangeEvent;
use crate::store::TimeSeriesStore;
use crate::trader::{ChangeKind, ChartMode, IndicatorCategory, Settings, WorldPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererConfig {
    pub viewport: ViewportConfig,
    pub font_size: f32,
    /// Rate of the live-candle exponential filter, per second
    pub live_smoothing_rate: f64,
    /// Duration of the chart-mode cross-fade in seconds
    pub crossfade_secs: f64,
    /// Zoom factor per wheel notch
    pub zoom_step: f64,
    /// Minimum pixel distance between time labels
    pub min_label_px: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            font_size: 11.0,
            live_smoothing_rate: 10.0,
            crossfade_secs: 0.25,
            zoom_step: 1.1,
            min_label_px: 90.0,
        }
    }
}

impl RendererConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let default = Self::default();
        Self {
            viewport: ViewportConfig::from_settings(settings),
            font_size: settings
                .get_float("chart.font_size")
                .map_or(default.font_size, |size| size as f32),
            live_smoothing_rate: settings
                .get_float("chart.live_smoothing_rate")
                .unwrap_or(default.live_smoothing_rate),
            ..default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    Leave,
    Wheel,
}

/// Pointer input forwarded by the host, in logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: Pos2,
    pub button: Option<PointerButton>,
    /// Pen/touch pressure, 0 when hovering
    pub pressure: f32,
    /// Scroll delta for wheel events
    pub delta: Vec2,
}

impl PointerEvent {
    fn new(kind: PointerKind, pos: Pos2) -> Self {
        Self {
            kind,
            pos,
            button: None,
            pressure: 0.0,
            delta: Vec2::ZERO,
        }
    }

    pub fn down(pos: Pos2) -> Self {
        Self {
            button: Some(PointerButton::Primary),
            pressure: 1.0,
            ..Self::new(PointerKind::Down, pos)
        }
    }

    pub fn moved(pos: Pos2) -> Self {
        Self::new(PointerKind::Move, pos)
    }

    pub fn up(pos: Pos2) -> Self {
        Self {
            button: Some(PointerButton::Primary),
            ..Self::new(PointerKind::Up, pos)
        }
    }

    pub fn leave() -> Self {
        Self::new(PointerKind::Leave, Pos2::ZERO)
    }

    pub fn wheel(pos: Pos2, delta: Vec2) -> Self {
        Self {
            delta,
            ..Self::new(PointerKind::Wheel, pos)
        }
    }

    /// Pressed button or non-zero pressure
    pub fn in_contact(&self) -> bool {
        self.button.is_some() || self.pressure > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Panning { last_x: f32 },
    Drawing,
}

/// Every piece of mutable view state
#[derive(Debug, Clone)]
pub struct RenderState {
    pub viewport: Viewport,
    /// Area handed to the renderer, in host pixels
    pub bounds: Rect,
    /// Density override for high-DPI or embedded hosts
    pub density: f32,
    pub cursor: ChartCursor,
    pub live: LiveCandle,
    pub mode: ChartMode,
    /// Mode being faded out, if a cross-fade is running
    pub previous_mode: Option<ChartMode>,
    /// Cross-fade progress in `[0, 1]`
    pub fade: f64,
    transform: Option<ChartTransform>,
    layout: Option<ChartLayout>,
    panel_scales: Vec<ValueScale>,
    drag: DragState,
    last_frame: Option<f64>,
}

impl RenderState {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            viewport: Viewport::new(config.viewport),
            bounds: Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 500.0)),
            density: 1.0,
            cursor: ChartCursor::new(),
            live: LiveCandle::new(config.live_smoothing_rate),
            mode: ChartMode::Candles,
            previous_mode: None,
            fade: 1.0,
            transform: None,
            layout: None,
            panel_scales: Vec::new(),
            drag: DragState::Idle,
            last_frame: None,
        }
    }

    /// Advance the cross-fade. Returns true while it is still running.
    fn advance_fade(&mut self, dt: f64, duration: f64) -> bool {
        if self.previous_mode.is_none() {
            return false;
        }
        self.fade = if duration > 0.0 { (self.fade + dt / duration).min(1.0) } else { 1.0 };
        if self.fade >= 1.0 {
            self.previous_mode = None;
            return false;
        }
        true
    }
}

pub struct ChartRenderer {
    config: RendererConfig,
    state: RenderState,
    scheduler: FrameScheduler,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl ChartRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            state: RenderState::new(&config),
            config,
            scheduler: FrameScheduler::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RenderState {
        &mut self.state
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    /// Transform used by the last frame
    pub fn transform(&self) -> Option<&ChartTransform> {
        self.state.transform.as_ref()
    }

    pub fn layout(&self) -> Option<&ChartLayout> {
        self.state.layout.as_ref()
    }

    pub fn request_frame(&mut self, host: &mut dyn RepaintHost) -> bool {
        self.scheduler.request_frame(host)
    }

    fn font_size(&self) -> f32 {
        self.config.font_size * self.state.density
    }

    fn full_rect(&self) -> Rect {
        self.state.bounds
    }

    fn plot_width(&self) -> f64 {
        let main = match &self.state.layout {
            Some(layout) => layout.main,
            None => ChartLayout::compute(self.full_rect(), 0).main,
        };
        main.width() as f64
    }

    /// New drawing area; pointer positions are expected in the same space
    pub fn resize(&mut self, bounds: Rect, host: &mut dyn RepaintHost) {
        let bounds = Rect::from_min_size(bounds.min, bounds.size().max(Vec2::ZERO));
        if bounds != self.state.bounds {
            self.state.bounds = bounds;
            self.state.layout = None;
            self.request_frame(host);
        }
    }

    pub fn set_density(&mut self, density: f32, host: &mut dyn RepaintHost) {
        let density = if density.is_finite() { density.clamp(0.5, 4.0) } else { 1.0 };
        if density != self.state.density {
            self.state.density = density;
            self.request_frame(host);
        }
    }

    /// Switch the series style, cross-fading from the current one
    pub fn set_mode(&mut self, mode: ChartMode, host: &mut dyn RepaintHost) {
        if mode == self.state.mode {
            return;
        }
        self.state.previous_mode = Some(self.state.mode);
        self.state.mode = mode;
        self.state.fade = 0.0;
        self.request_frame(host);
    }

    /// Pin back to the latest bar
    pub fn scroll_to_latest(&mut self, total: usize, host: &mut dyn RepaintHost) {
        let width = self.plot_width();
        let viewport = &mut self.state.viewport;
        viewport.follow = viewport.follow_allowed;
        viewport.target_index = viewport.max_start(total, viewport.visible_count(width));
        self.request_frame(host);
    }

    /// React to a store notification. `total` is the active series length
    /// after the change.
    pub fn on_store_change(&mut self, event: &ChangeEvent, total: usize, host: &mut dyn RepaintHost) {
        match event.kind {
            ChangeKind::Reset | ChangeKind::Instrument | ChangeKind::Timeframe => {
                let width = self.plot_width();
                let viewport = &mut self.state.viewport;
                viewport.follow_allowed = event.timeframe.is_short();
                viewport.follow = viewport.follow_allowed;
                viewport.jump_to_end(total, width);
                self.state.live.reset();
                self.state.cursor.clear();
                debug!("Viewport reset for {:?} on {}", event.kind, event.timeframe.value());
            }
            ChangeKind::Append | ChangeKind::Events => {}
        }
        self.request_frame(host);
    }

    /// Route pointer input to the drawing layer first, then pan/zoom and the
    /// crosshair. Returns true when the input was consumed.
    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        total: usize,
        drawings: &mut DrawingManager,
        host: &mut dyn RepaintHost,
    ) -> bool {
        let (Some(transform), Some(layout)) = (self.state.transform, self.state.layout.clone()) else {
            return false;
        };
        let width = layout.main.width() as f64;
        let state = &mut self.state;

        let consumed = match event.kind {
            PointerKind::Down => {
                let primary = event.button.is_none_or(|button| button == PointerButton::Primary);
                if !primary || !event.in_contact() || !layout.plot().contains(event.pos) {
                    false
                } else if drawings.pointer_down(event.pos, &transform) {
                    state.drag = DragState::Drawing;
                    true
                } else {
                    state.drag = DragState::Panning { last_x: event.pos.x };
                    true
                }
            }
            PointerKind::Move => {
                state
                    .cursor
                    .update_position(event.pos, &layout, &transform, &state.panel_scales, total);
                match state.drag {
                    DragState::Panning { last_x } => {
                        state.viewport.pan((event.pos.x - last_x) as f64, total, width);
                        state.drag = DragState::Panning { last_x: event.pos.x };
                    }
                    DragState::Drawing | DragState::Idle => {
                        drawings.pointer_move(event.pos, &transform);
                    }
                }
                true
            }
            PointerKind::Up => {
                if state.drag == DragState::Drawing {
                    drawings.pointer_up(event.pos, &transform);
                }
                let was_dragging = state.drag != DragState::Idle;
                state.drag = DragState::Idle;
                was_dragging
            }
            PointerKind::Leave => {
                if state.drag == DragState::Drawing {
                    drawings.cancel();
                }
                state.drag = DragState::Idle;
                state.cursor.clear();
                true
            }
            PointerKind::Wheel => {
                if event.delta.y == 0.0 || !event.delta.y.is_finite() {
                    false
                } else {
                    let factor = self.config.zoom_step.powf(event.delta.y.signum() as f64);
                    let anchor_x = (event.pos.x - layout.main.left()) as f64;
                    state.viewport.zoom(factor, anchor_x, total, width);
                    true
                }
            }
        };

        if consumed {
            self.request_frame(host);
        }
        consumed
    }

    /// Render one frame at `now` seconds. Returns true while animating, in
    /// which case the next frame has been requested from `host`.
    pub fn frame(
        &mut self,
        now: f64,
        store: &mut TimeSeriesStore,
        drawings: &DrawingManager,
        surface: &mut dyn Surface,
        host: &mut dyn RepaintHost,
    ) -> bool {
        self.scheduler.begin_frame();
        let dt = self.state.last_frame.map_or(0.0, |last| (now - last).max(0.0));
        self.state.last_frame = Some(now);

        let font_size = self.font_size();
        let full = self.full_rect();
        let config = self.config;

        let frame = store.frame();
        let candles = frame.candles;
        let total = candles.len();
        let min_move = frame.min_movement();
        let panel_outputs: Vec<_> = frame
            .indicators
            .iter()
            .filter(|output| output.def.category() == IndicatorCategory::Panel)
            .copied()
            .collect();
        let overlay_outputs: Vec<_> = frame
            .indicators
            .iter()
            .filter(|output| output.def.category() == IndicatorCategory::Overlay)
            .copied()
            .collect();

        let layout = ChartLayout::compute(full, panel_outputs.len());
        let width = layout.main.width() as f64;

        let state = &mut self.state;
        state.viewport.apply_follow(total, width);
        state.viewport.clamp(total, width);
        let easing = state.viewport.ease();

        match candles.last() {
            Some(last) => state.live.set_target(*last, min_move),
            None => state.live.reset(),
        }
        let smoothing = state.live.advance(dt);
        let fading = state.advance_fade(dt, config.crossfade_secs);

        surface.rect_filled(full, BACKGROUND_COLOR);

        let range = state.viewport.visible_range(total, width);
        let (first, last) = range.unwrap_or((0, 0));
        let window = BarWindow::new(candles, first, last, state.live.display());

        // Price range over the series and overlays
        let current = CandleItem::new(state.mode).with_alpha(state.fade as f32);
        let previous = state
            .previous_mode
            .map(|mode| CandleItem::new(mode).with_alpha(1.0 - state.fade as f32));
        let mut price_range = current.y_range(&window);
        if let Some(previous) = &previous {
            price_range = union_range(price_range, previous.y_range(&window));
        }
        let overlays: Vec<IndicatorItem> = overlay_outputs
            .iter()
            .enumerate()
            .map(|(i, output)| IndicatorItem::overlay(*output, i * 2))
            .collect();
        for overlay in &overlays {
            price_range = union_range(price_range, overlay.y_range(&window));
        }
        let (low, high) = price_range.unwrap_or((0.0, 1.0));
        let transform =
            ChartTransform::new(layout.main, state.viewport.index, state.viewport.scale, low, high);

        let ctx = DrawContext {
            transform: &transform,
            window,
            precision: frame.precision,
            font_size,
        };

        // Grid and axes ticks
        let span = price_tick_span(
            transform.min_price(),
            transform.max_price(),
            layout.main.height(),
            font_size,
            frame.precision,
        );
        let y_ticks = price_ticks(transform.min_price(), transform.max_price(), span, min_move);
        let (x_ticks, sessions) = match range {
            Some((first, last)) => {
                let sessions = if frame.timeframe.minutes() < 1440 {
                    session_breaks(candles, first, last)
                } else {
                    Vec::new()
                };
                let ticks = time_ticks(candles, first, last, state.viewport.scale, config.min_label_px);
                (ticks, sessions)
            }
            None => (Vec::new(), Vec::new()),
        };
        draw_grid(surface, &transform, layout.plot(), &y_ticks, &x_ticks, &sessions);

        // Series, volume and overlays
        let volume = VolumeItem::new(layout.volume);
        if range.is_some() {
            volume.draw(surface, &ctx);
            if let Some(previous) = &previous {
                previous.draw(surface, &ctx);
            }
            current.draw(surface, &ctx);
            for overlay in &overlays {
                overlay.draw(surface, &ctx);
            }
            let visible_events: Vec<_> = frame
                .events
                .iter()
                .filter(|event| event.index >= first && event.index <= last)
                .cloned()
                .collect();
            draw_events(surface, &transform, &visible_events, font_size);
        }

        // Indicator panels
        state.panel_scales.clear();
        for (i, (output, rect)) in panel_outputs.iter().zip(&layout.panels).enumerate() {
            let item = IndicatorItem::panel(*output, 2 + i * 3, *rect, &window);
            if let Some(scale) = item.panel {
                state.panel_scales.push(scale);
            }
            if range.is_some() {
                item.draw(surface, &ctx);
            }
        }

        drawings.draw(surface, &transform);

        draw_time_axis(surface, layout.time_axis, &transform, &x_ticks, font_size);
        draw_price_axis(surface, layout.price_axis, &transform, &y_ticks, frame.precision, font_size);
        if let Some(latest) = window.latest() {
            draw_last_price(
                surface,
                &transform,
                layout.price_axis,
                latest,
                frame.precision,
                font_size,
                state.live.glow(),
            );
        }
        state
            .cursor
            .draw(surface, &layout, &transform, &window, &volume, frame.precision, font_size);

        state.transform = Some(transform);
        state.layout = Some(layout);

        let animating = easing || smoothing || fading;
        if animating {
            self.scheduler.request_frame(host);
        }
        animating
    }

    /// World point under a screen position, using the last frame's transform
    pub fn world_at(&self, pos: Pos2) -> Option<WorldPoint> {
        self.state.transform.map(|transform| transform.screen_to_world(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    use crate::chart::scheduler::HeadlessHost;
    use crate::chart::surface::DisplayList;
    use crate::drawing::ToolKind;
    use crate::trader::{Candle, Timeframe};

    fn store_with(count: i64) -> TimeSeriesStore {
        let mut store = TimeSeriesStore::new(Timeframe::Minute1);
        let candles = (0..count)
            .map(|i| {
                let price = 100.0 + (i as f64 * 0.3).sin() * 5.0;
                Candle::new(i * 60_000, price, price + 1.0, price - 1.0, price + 0.25, 100.0)
            })
            .collect();
        store.rebuild_all(candles);
        store
    }

    fn settle(
        renderer: &mut ChartRenderer,
        store: &mut TimeSeriesStore,
        drawings: &DrawingManager,
        host: &mut HeadlessHost,
    ) -> usize {
        let mut now = 0.0;
        let mut frames = 0;
        loop {
            let mut list = DisplayList::new();
            frames += 1;
            now += 1.0 / 60.0;
            if !renderer.frame(now, store, drawings, &mut list, host) || frames > 600 {
                return frames;
            }
        }
    }

    #[test]
    fn test_frame_draws_and_settles() {
        let mut store = store_with(300);
        let drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let event = ChangeEvent::new(ChangeKind::Reset, Timeframe::Minute1, Vec::new());
        renderer.on_store_change(&event, store.active_series().len(), &mut host);
        assert_eq!(host.requests, 1);

        let mut list = DisplayList::new();
        renderer.frame(0.0, &mut store, &drawings, &mut list, &mut host);
        assert!(!list.is_empty());
        assert!(renderer.transform().is_some());
        assert_eq!(renderer.layout().map(|layout| layout.panels.len()), Some(2));

        let frames = settle(&mut renderer, &mut store, &drawings, &mut host);
        assert!(frames < 600);
        assert!(!renderer.scheduler().is_pending());
        assert!(renderer.state().viewport.follow);
    }

    #[test]
    fn test_requests_are_coalesced_while_animating() {
        let mut store = store_with(300);
        let drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();

        renderer.set_mode(ChartMode::Line, &mut host);
        renderer.set_mode(ChartMode::Area, &mut host);
        assert_eq!(host.requests, 1);

        let mut list = DisplayList::new();
        assert!(renderer.frame(0.0, &mut store, &drawings, &mut list, &mut host));
        assert_eq!(host.requests, 2);
        assert_eq!(renderer.state().previous_mode, Some(ChartMode::Line));

        // crossfade finishes after its duration
        renderer.frame(1.0, &mut store, &drawings, &mut list, &mut host);
        assert_eq!(renderer.state().previous_mode, None);
    }

    #[test]
    fn test_drag_pans_and_disables_follow() {
        let mut store = store_with(500);
        let mut drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let total = store.active_series().len();
        let event = ChangeEvent::new(ChangeKind::Reset, Timeframe::Minute1, Vec::new());
        renderer.on_store_change(&event, total, &mut host);
        settle(&mut renderer, &mut store, &drawings, &mut host);
        let before = renderer.state().viewport.target_index;

        assert!(renderer.handle_pointer(PointerEvent::down(pos2(300.0, 200.0)), total, &mut drawings, &mut host));
        renderer.handle_pointer(PointerEvent::moved(pos2(380.0, 200.0)), total, &mut drawings, &mut host);
        renderer.handle_pointer(PointerEvent::up(pos2(380.0, 200.0)), total, &mut drawings, &mut host);

        let viewport = &renderer.state().viewport;
        assert!(!viewport.follow);
        assert!((viewport.target_index - (before - 10.0)).abs() < 1e-9);
    }

    #[test]
    fn test_press_on_axis_does_not_start_drawing() {
        let mut store = store_with(500);
        let mut drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let total = store.active_series().len();
        settle(&mut renderer, &mut store, &drawings, &mut host);
        drawings.set_active_tool(Some(ToolKind::TrendLine));

        let layout = renderer.layout().unwrap().clone();
        for pos in [layout.price_axis.center(), layout.time_axis.center()] {
            assert!(!renderer.handle_pointer(PointerEvent::down(pos), total, &mut drawings, &mut host));
            assert!(!drawings.is_busy());
            assert!(drawings.is_empty());
        }
        assert_eq!(drawings.active_tool(), Some(ToolKind::TrendLine));

        let inside = layout.main.center();
        assert!(renderer.handle_pointer(PointerEvent::down(inside), total, &mut drawings, &mut host));
        assert!(drawings.is_busy());
    }

    #[test]
    fn test_wheel_zooms_and_cursor_tracks() {
        let mut store = store_with(500);
        let mut drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let total = store.active_series().len();
        settle(&mut renderer, &mut store, &drawings, &mut host);

        let wheel = PointerEvent::wheel(pos2(200.0, 100.0), Vec2::new(0.0, 1.0));
        assert!(renderer.handle_pointer(wheel, total, &mut drawings, &mut host));
        assert!((renderer.state().viewport.target_scale - 8.8).abs() < 1e-9);

        renderer.handle_pointer(PointerEvent::moved(pos2(200.0, 100.0)), total, &mut drawings, &mut host);
        assert!(renderer.state().cursor.is_visible());
        renderer.handle_pointer(PointerEvent::leave(), total, &mut drawings, &mut host);
        assert!(!renderer.state().cursor.is_visible());
    }

    #[test]
    fn test_long_timeframe_disables_follow() {
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let event = ChangeEvent::new(ChangeKind::Timeframe, Timeframe::Hour4, Vec::new());
        renderer.on_store_change(&event, 100, &mut host);
        assert!(!renderer.state().viewport.follow);
        assert!(!renderer.state().viewport.follow_allowed);
    }

    #[test]
    fn test_empty_store_renders_without_panicking() {
        let mut store = TimeSeriesStore::new(Timeframe::Minute1);
        let drawings = DrawingManager::new();
        let mut renderer = ChartRenderer::default();
        let mut host = HeadlessHost::new();
        let mut list = DisplayList::new();
        assert!(!renderer.frame(0.0, &mut store, &drawings, &mut list, &mut host));
        assert!(!list.is_empty());
    }
}
