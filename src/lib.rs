//! Livechart - a real-time candlestick chart engine
//!
//! This crate provides:
//!
//! - Multi-timeframe candle storage derived from one base feed
//! - Incrementally recomputed technical indicators
//! - A seeded market simulator with event-driven impulses
//! - A viewport renderer with easing, live candle smoothing and a crosshair
//! - Drawing tools with hit-testing and JSON persistence
//! - A desktop host (with `gui` feature)
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use livechart::chart::{ChartRenderer, DisplayList, HeadlessHost};
//! use livechart::drawing::DrawingManager;
//! use livechart::simulator::{MarketSimulator, SimulatorConfig};
//! use livechart::store::TimeSeriesStore;
//! use livechart::trader::Timeframe;
//!
//! let mut simulator = MarketSimulator::new(SimulatorConfig::default());
//! let mut store = TimeSeriesStore::new(Timeframe::Minute1);
//! store.rebuild_all(simulator.generate_initial_history(500));
//!
//! let mut renderer = ChartRenderer::default();
//! let drawings = DrawingManager::new();
//! let mut list = DisplayList::new();
//! renderer.frame(0.0, &mut store, &drawings, &mut list, &mut HeadlessHost::new());
//! ```

pub mod chart;
pub mod drawing;
pub mod error;
pub mod event;
pub mod indicator;
pub mod simulator;
pub mod store;
pub mod trader;

// Re-export commonly used types
pub use chart::{ChartRenderer, DisplayList, FrameScheduler, RepaintHost, Surface, Viewport};
pub use drawing::{DrawingManager, DrawingTool, ToolKind, ToolStyle};
pub use error::{ChartError, Result};
pub use event::{ChangeBus, ChangeEvent, Subscription};
pub use indicator::{IndicatorDef, IndicatorEngine};
pub use simulator::{MarketSimulator, SimulatorConfig};
pub use store::TimeSeriesStore;
pub use trader::{Candle, ChangeKind, ChartMode, EventMarker, Timeframe, WorldPoint};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
