//! Technical indicator descriptors.
//!
//! Every indicator window-scans the raw candle sequence on its own, there are
//! no cross-indicator dependencies. `compute` resumes from a start index and
//! trusts every value stored below it.

use serde::{Deserialize, Serialize};

use crate::trader::{Candle, IndicatorCategory, IndicatorKind};

/// Output arrays of one indicator over one series.
///
/// `lines` are the visible series (`None` while the window is not full yet),
/// `scratch` holds running values needed to resume a recursive computation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndicatorState {
    pub lines: Vec<Vec<Option<f64>>>,
    pub scratch: Vec<Vec<Option<f64>>>,
}

impl IndicatorState {
    pub fn new(line_count: usize, scratch_count: usize, len: usize) -> Self {
        Self {
            lines: vec![vec![None; len]; line_count],
            scratch: vec![vec![None; len]; scratch_count],
        }
    }

    /// Number of bars covered
    pub fn len(&self) -> usize {
        self.lines.first().map_or(0, |line| line.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Grow or shrink every array to `len`
    pub fn resize(&mut self, len: usize) {
        for line in &mut self.lines {
            line.resize(len, None);
        }
        for scratch in &mut self.scratch {
            scratch.resize(len, None);
        }
    }

    /// Get values of one line
    pub fn line(&self, line_index: usize) -> &[Option<f64>] {
        self.lines.get(line_index).map_or(&[], |line| line.as_slice())
    }

    /// Get the value for a specific bar index and line
    pub fn value(&self, line_index: usize, bar_index: usize) -> Option<f64> {
        self.lines.get(line_index)?.get(bar_index).copied().flatten()
    }

    /// Min/max over every line within `[min_ix, max_ix]`
    pub fn y_range(&self, min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
        let len = self.len();
        if len == 0 || min_ix > max_ix || min_ix >= len {
            return None;
        }
        let end_ix = max_ix.min(len - 1);

        let mut range: Option<(f64, f64)> = None;
        for line in &self.lines {
            for value in line[min_ix..=end_ix].iter().flatten() {
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(*value), hi.max(*value)),
                    None => (*value, *value),
                });
            }
        }
        range
    }
}

/// Tagged descriptor of a supported indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum IndicatorDef {
    /// Simple moving average of close
    Sma { period: usize },
    /// Exponential moving average of close, seeded with the SMA
    Ema { period: usize },
    /// Bollinger bands: middle, upper, lower
    Bollinger { period: usize, multiplier: f64 },
    /// Relative strength index with Wilder smoothing
    Rsi { period: usize },
    /// MACD line, signal line, histogram
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorDef {
    /// Unique name, used as the cache key
    pub fn name(&self) -> String {
        match self {
            IndicatorDef::Sma { period } => format!("SMA{}", period),
            IndicatorDef::Ema { period } => format!("EMA{}", period),
            IndicatorDef::Bollinger { period, multiplier } => {
                format!("BOLL({},{})", period, multiplier)
            }
            IndicatorDef::Rsi { period } => format!("RSI{}", period),
            IndicatorDef::Macd { fast, slow, signal } => {
                format!("MACD({},{},{})", fast, slow, signal)
            }
        }
    }

    pub fn category(&self) -> IndicatorCategory {
        match self {
            IndicatorDef::Sma { .. } | IndicatorDef::Ema { .. } | IndicatorDef::Bollinger { .. } => {
                IndicatorCategory::Overlay
            }
            IndicatorDef::Rsi { .. } | IndicatorDef::Macd { .. } => IndicatorCategory::Panel,
        }
    }

    pub fn kind(&self) -> IndicatorKind {
        match self {
            IndicatorDef::Sma { .. } | IndicatorDef::Ema { .. } => IndicatorKind::Line,
            IndicatorDef::Bollinger { .. } => IndicatorKind::Band,
            IndicatorDef::Rsi { .. } => IndicatorKind::Oscillator,
            IndicatorDef::Macd { .. } => IndicatorKind::Macd,
        }
    }

    /// Names of the visible lines, in `IndicatorState::lines` order
    pub fn line_names(&self) -> &'static [&'static str] {
        match self {
            IndicatorDef::Sma { .. } | IndicatorDef::Ema { .. } => &["value"],
            IndicatorDef::Bollinger { .. } => &["middle", "upper", "lower"],
            IndicatorDef::Rsi { .. } => &["rsi"],
            IndicatorDef::Macd { .. } => &["macd", "signal", "histogram"],
        }
    }

    /// Fixed value bounds for oscillators
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        match self {
            IndicatorDef::Rsi { .. } => Some((0.0, 100.0)),
            _ => None,
        }
    }

    /// Allocate an empty state sized for a series of `len` bars
    pub fn create_state(&self, len: usize) -> IndicatorState {
        let scratch = match self {
            IndicatorDef::Rsi { .. } | IndicatorDef::Macd { .. } => 2,
            _ => 0,
        };
        IndicatorState::new(self.line_names().len(), scratch, len)
    }

    /// Recompute every index from `start` to the end of `series`.
    pub fn compute(&self, series: &[Candle], state: &mut IndicatorState, start: usize) {
        let len = series.len();
        state.resize(len);
        let start = start.min(len);

        match *self {
            IndicatorDef::Sma { period } => compute_sma(series, state, start, period),
            IndicatorDef::Ema { period } => compute_ema(series, state, start, period),
            IndicatorDef::Bollinger { period, multiplier } => {
                compute_bollinger(series, state, start, period, multiplier)
            }
            IndicatorDef::Rsi { period } => compute_rsi(series, state, start, period),
            IndicatorDef::Macd { fast, slow, signal } => {
                compute_macd(series, state, start, fast, slow, signal)
            }
        }
    }
}

/// Indicators enabled on a fresh chart
pub fn default_indicators() -> Vec<IndicatorDef> {
    vec![
        IndicatorDef::Ema { period: 20 },
        IndicatorDef::Ema { period: 50 },
        IndicatorDef::Bollinger {
            period: 20,
            multiplier: 2.0,
        },
        IndicatorDef::Rsi { period: 14 },
        IndicatorDef::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        },
    ]
}

fn window_mean(series: &[Candle], end: usize, period: usize) -> f64 {
    let start_ix = end + 1 - period;
    let sum: f64 = series[start_ix..=end].iter().map(|c| c.close).sum();
    sum / period as f64
}

fn compute_sma(series: &[Candle], state: &mut IndicatorState, start: usize, period: usize) {
    for i in start..series.len() {
        state.lines[0][i] = if period == 0 || i + 1 < period {
            None
        } else {
            Some(window_mean(series, i, period))
        };
    }
}

/// One EMA step over an arbitrary source. `first` is the first index where
/// the source is defined; the EMA is seeded with the SMA of its first window
/// and otherwise resumes from `prev`. Returns NaN while undefined.
fn ema_step(
    source: &impl Fn(usize) -> f64,
    prev: Option<f64>,
    i: usize,
    first: usize,
    period: usize,
) -> f64 {
    if period == 0 || i < first || i + 1 < first + period {
        return f64::NAN;
    }
    let seed_ix = first + period - 1;
    match prev {
        Some(prev) if i > seed_ix && !prev.is_nan() => {
            let k = 2.0 / (period as f64 + 1.0);
            source(i) * k + prev * (1.0 - k)
        }
        _ => {
            let window_start = i + 1 - period;
            let sum: f64 = (window_start..=i).map(source).sum();
            sum / period as f64
        }
    }
}

fn compute_ema(series: &[Candle], state: &mut IndicatorState, start: usize, period: usize) {
    let close = |i: usize| series[i].close;
    for i in start..series.len() {
        let prev = if i > 0 { state.lines[0][i - 1] } else { None };
        let value = ema_step(&close, prev, i, 0, period);
        state.lines[0][i] = (!value.is_nan()).then_some(value);
    }
}

fn compute_bollinger(
    series: &[Candle],
    state: &mut IndicatorState,
    start: usize,
    period: usize,
    multiplier: f64,
) {
    for i in start..series.len() {
        if period == 0 || i + 1 < period {
            state.lines[0][i] = None;
            state.lines[1][i] = None;
            state.lines[2][i] = None;
            continue;
        }
        let mean = window_mean(series, i, period);
        let variance = series[i + 1 - period..=i]
            .iter()
            .map(|c| (c.close - mean).powi(2))
            .sum::<f64>()
            / period as f64;
        let width = multiplier * variance.sqrt();
        state.lines[0][i] = Some(mean);
        state.lines[1][i] = Some(mean + width);
        state.lines[2][i] = Some(mean - width);
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

fn compute_rsi(series: &[Candle], state: &mut IndicatorState, start: usize, period: usize) {
    let change = |i: usize| series[i].close - series[i - 1].close;

    for i in start..series.len() {
        if period == 0 || i < period {
            state.lines[0][i] = None;
            state.scratch[0][i] = None;
            state.scratch[1][i] = None;
            continue;
        }

        let prev = state.scratch[0][i - 1].zip(state.scratch[1][i - 1]);
        let (avg_gain, avg_loss) = match prev {
            Some((prev_gain, prev_loss)) if i > period => {
                let delta = change(i);
                let n = period as f64;
                (
                    (prev_gain * (n - 1.0) + delta.max(0.0)) / n,
                    (prev_loss * (n - 1.0) + (-delta).max(0.0)) / n,
                )
            }
            _ => {
                let (gain, loss) = (i + 1 - period..=i).fold((0.0, 0.0), |(g, l), j| {
                    let delta = change(j);
                    (g + delta.max(0.0), l + (-delta).max(0.0))
                });
                (gain / period as f64, loss / period as f64)
            }
        };

        state.scratch[0][i] = Some(avg_gain);
        state.scratch[1][i] = Some(avg_loss);
        state.lines[0][i] = Some(rsi_value(avg_gain, avg_loss));
    }
}

fn compute_macd(
    series: &[Candle],
    state: &mut IndicatorState,
    start: usize,
    fast: usize,
    slow: usize,
    signal: usize,
) {
    let close = |i: usize| series[i].close;
    let macd_first = fast.max(slow).saturating_sub(1);

    for i in start..series.len() {
        let prev_fast = if i > 0 { state.scratch[0][i - 1] } else { None };
        let prev_slow = if i > 0 { state.scratch[1][i - 1] } else { None };
        let fast_value = ema_step(&close, prev_fast, i, 0, fast);
        let slow_value = ema_step(&close, prev_slow, i, 0, slow);
        state.scratch[0][i] = (!fast_value.is_nan()).then_some(fast_value);
        state.scratch[1][i] = (!slow_value.is_nan()).then_some(slow_value);

        let macd = match (state.scratch[0][i], state.scratch[1][i]) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        };
        state.lines[0][i] = macd;

        let signal_value = {
            let macd_line = &state.lines[0];
            let source = |j: usize| macd_line[j].unwrap_or(f64::NAN);
            let prev = if i > 0 { state.lines[1][i - 1] } else { None };
            ema_step(&source, prev, i, macd_first, signal)
        };
        state.lines[1][i] = (!signal_value.is_nan()).then_some(signal_value);
        state.lines[2][i] = match (macd, state.lines[1][i]) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 1.0, c - 1.0, c, 10.0))
            .collect()
    }

    fn wave(len: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..len)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.05)
            .collect();
        candles_from_closes(&closes)
    }

    fn full(def: &IndicatorDef, series: &[Candle]) -> IndicatorState {
        let mut state = def.create_state(series.len());
        def.compute(series, &mut state, 0);
        state
    }

    #[test]
    fn test_sma_values() {
        let series = candles_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let state = full(&IndicatorDef::Sma { period: 3 }, &series);
        assert_eq!(state.line(0), &[None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let series = candles_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let state = full(&IndicatorDef::Ema { period: 3 }, &series);
        assert_eq!(state.value(0, 1), None);
        assert_eq!(state.value(0, 2), Some(2.0));
        // k = 0.5
        assert_eq!(state.value(0, 3), Some(3.0));
    }

    #[test]
    fn test_bollinger_collapses_on_flat_series() {
        let series = candles_from_closes(&[10.0; 25]);
        let state = full(&IndicatorDef::Bollinger { period: 20, multiplier: 2.0 }, &series);
        assert_eq!(state.value(0, 24), Some(10.0));
        assert_eq!(state.value(1, 24), Some(10.0));
        assert_eq!(state.value(2, 24), Some(10.0));
        assert_eq!(state.value(0, 18), None);
    }

    #[test]
    fn test_rsi_bounds() {
        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let state = full(&IndicatorDef::Rsi { period: 14 }, &candles_from_closes(&rising));
        assert_eq!(state.value(0, 13), None);
        assert_eq!(state.value(0, 29), Some(100.0));

        let series = wave(200);
        let state = full(&IndicatorDef::Rsi { period: 14 }, &series);
        for value in state.line(0).iter().flatten() {
            assert!((0.0..=100.0).contains(value));
        }
    }

    #[test]
    fn test_macd_zero_on_flat_series() {
        let series = candles_from_closes(&[50.0; 60]);
        let def = IndicatorDef::Macd { fast: 12, slow: 26, signal: 9 };
        let state = full(&def, &series);
        assert_eq!(state.value(0, 24), None);
        assert_eq!(state.value(0, 25), Some(0.0));
        assert_eq!(state.value(1, 32), None);
        assert_eq!(state.value(1, 33), Some(0.0));
        assert_eq!(state.value(2, 59), Some(0.0));
    }

    #[test]
    fn test_resume_matches_full_compute() {
        let series = wave(150);
        for def in default_indicators() {
            let expected = full(&def, &series);

            let mut state = def.create_state(100);
            def.compute(&series[..100], &mut state, 0);
            def.compute(&series, &mut state, 97);
            assert_eq!(state, expected, "{} diverged after resume", def.name());
        }
    }

    #[test]
    fn test_compute_is_idempotent() {
        let series = wave(120);
        for def in default_indicators() {
            let mut state = full(&def, &series);
            let first = state.clone();
            def.compute(&series, &mut state, 0);
            assert_eq!(state, first);
            def.compute(&series, &mut state, 60);
            assert_eq!(state, first);
        }
    }

    #[test]
    fn test_y_range_skips_missing_values() {
        let series = candles_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let state = full(&IndicatorDef::Sma { period: 3 }, &series);
        assert_eq!(state.y_range(0, 4), Some((2.0, 4.0)));
        assert_eq!(state.y_range(0, 1), None);
        assert_eq!(state.y_range(9, 12), None);
    }

    #[test]
    fn test_names_and_categories() {
        assert_eq!(IndicatorDef::Ema { period: 20 }.name(), "EMA20");
        assert_eq!(
            IndicatorDef::Macd { fast: 12, slow: 26, signal: 9 }.category(),
            IndicatorCategory::Panel
        );
        assert_eq!(
            IndicatorDef::Bollinger { period: 20, multiplier: 2.0 }.kind(),
            IndicatorKind::Band
        );
    }
}
