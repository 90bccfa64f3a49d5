//! Chart module: viewport, coordinate transforms and draw passes.
//!
//! This module provides:
//! - `Viewport` - Pan/zoom state with easing, clamping and follow mode
//! - `ChartTransform` - World (bar index, price) to pixel mapping
//! - `price_tick_span` / `time_ticks` - Axis tick generation
//! - `CandleItem`, `VolumeItem`, `IndicatorItem` - Series rendering
//! - `ChartCursor` - Crosshair with info box
//! - `ChartRenderer` - Frame loop driven by a `FrameScheduler`
//!
//! # Example
//!
//! ```ignore
//! use livechart::chart::{ChartRenderer, DisplayList, HeadlessHost};
//!
//! let mut renderer = ChartRenderer::default();
//! let mut list = DisplayList::new();
//! renderer.frame(now, &mut store, &drawings, &mut list, &mut HeadlessHost::new());
//! ```

mod base;
mod coords;
mod cursor;
mod items;
mod layout;
mod live;
mod renderer;
mod scheduler;
mod surface;
mod ticks;
mod viewport;

pub use base::*;
pub use coords::{ChartTransform, ValueScale, PRICE_PADDING};
pub use cursor::ChartCursor;
pub use items::{
    draw_events, draw_grid, draw_last_price, draw_price_axis, draw_tag, draw_time_axis,
    union_range, BarWindow, CandleItem, ChartItem, DrawContext, IndicatorItem, VolumeItem,
};
pub use layout::{ChartLayout, MIN_MAIN_RATIO, PANEL_RATIO, VOLUME_RATIO};
pub use live::{LiveCandle, GLOW_SPEED};
pub use renderer::{ChartRenderer, PointerEvent, PointerKind, RenderState, RendererConfig};
pub use scheduler::{FrameScheduler, HeadlessHost, RepaintHost};
pub use surface::{DisplayList, DrawCommand, Surface};
pub use ticks::{
    format_cursor_time, price_tick_span, price_ticks, session_breaks, time_stride, time_ticks,
    TickSpanCalculator, TimeBucket, TimeTick, MAX_PRICE_TICKS, TICK_DENSITY,
};
pub use viewport::{Viewport, ViewportConfig};
