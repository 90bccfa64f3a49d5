//! Tuning parameters of the market simulator.

use serde::{Deserialize, Serialize};

use crate::trader::{Settings, Timeframe};

/// 2024-01-01T00:00:00Z
pub const DEFAULT_START_TIME: i64 = 1_704_067_200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulatorConfig {
    pub seed: u64,
    /// Simulated time per candle
    pub base_interval_ms: i64,
    /// Open time of the first generated candle
    pub start_time: i64,
    pub start_price: f64,
    /// Standard deviation of the per-step shock, in price units
    pub volatility: f64,
    pub base_drift: f64,
    /// Sign and strength of the trend, multiplies `base_drift`
    pub trend_bias: f64,
    /// Fraction of the gap to fair value closed per step
    pub mean_reversion_rate: f64,
    pub liquidity_factor: f64,
    /// EMA rate of the fair value
    pub fair_value_rate: f64,
    /// Wick length relative to the shock magnitude
    pub wick_factor: f64,
    pub base_volume: f64,
    /// Relative spread of the volume noise
    pub volume_noise: f64,
    pub price_tick: f64,
    /// Simulated milliseconds per elapsed real millisecond
    pub speed: f64,
    /// Candles generated as backfill before going live
    pub history: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_interval_ms: Timeframe::Minute1.bucket_ms(),
            start_time: DEFAULT_START_TIME,
            start_price: 100.0,
            volatility: 0.12,
            base_drift: 0.002,
            trend_bias: 0.0,
            mean_reversion_rate: 0.05,
            liquidity_factor: 1.0,
            fair_value_rate: 0.08,
            wick_factor: 0.6,
            base_volume: 1_000.0,
            volume_noise: 0.35,
            price_tick: 0.01,
            speed: 1.0,
            history: 600,
        }
    }
}

impl SimulatorConfig {
    /// Read `simulator.*` keys and the base timeframe
    pub fn from_settings(settings: &Settings) -> Self {
        let default = Self::default();
        let base_interval_ms = settings
            .get_string("chart.base_timeframe")
            .and_then(|value| Timeframe::from_value(&value))
            .map_or(default.base_interval_ms, |tf| tf.bucket_ms());

        Self {
            seed: settings
                .get_int("simulator.seed")
                .map_or(default.seed, |seed| seed as u64),
            base_interval_ms,
            start_price: settings
                .get_float("simulator.start_price")
                .unwrap_or(default.start_price),
            volatility: settings
                .get_float("simulator.volatility")
                .unwrap_or(default.volatility),
            speed: settings.get_float("simulator.speed").unwrap_or(default.speed),
            history: settings
                .get_int("simulator.history")
                .map_or(default.history, |h| h.max(0) as usize),
            ..default
        }
    }
}
