//! Trader module - shared vocabulary of the chart engine.
//!
//! - **constant**: Timeframe, ChartMode, ChangeKind and indicator/line enums
//! - **object**: Candle, EventMarker and WorldPoint data structures
//! - **setting**: Global settings management
//! - **utility**: Decimal rounding, precision inference and path helpers
//! - **logger**: Logging utilities

pub mod constant;
pub mod logger;
pub mod object;
pub mod setting;
pub mod utility;

// Re-exports for convenience
pub use constant::{ChangeKind, ChartMode, IndicatorCategory, IndicatorKind, LineStyle, Timeframe};
pub use logger::{init_logger, DEBUG, ERROR, INFO, WARNING};
pub use object::{Candle, EventMarker, ProjectedEvent, WorldPoint};
pub use setting::{SettingValue, Settings, SETTINGS};
pub use utility::{
    get_digits, get_file_path, get_folder_path, infer_precision, min_movement, round_to, safe_span,
    MAX_PRECISION, MIN_SPAN,
};
