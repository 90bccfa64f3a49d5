//! Technical indicators computed incrementally over candle series.

mod definition;
mod engine;

pub use definition::{default_indicators, IndicatorDef, IndicatorState};
pub use engine::{IndicatorCacheEntry, IndicatorEngine, IndicatorOutput};
