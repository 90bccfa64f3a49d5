//! Axis tick generation.
//!
//! Price ticks come from an iterative "nice span" search over cyclic divider
//! sequences, parameterized by the instrument's decimal base so every tick
//! lands on a multiple of the minimum price movement. Time ticks pick a bar
//! stride from the pixel density and label it by a date bucket chosen from
//! the visible time span.

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::trader::{min_movement, round_to, Candle, MAX_PRECISION};

/// Label height multiplier giving the minimum pixel distance between ticks
pub const TICK_DENSITY: f64 = 2.5;

/// Hard cap on generated price ticks
pub const MAX_PRICE_TICKS: usize = 200;

const EPSILON: f64 = 1e-14;

const INTEGRAL_DIVIDERS: [[f64; 3]; 3] = [[2.0, 2.5, 2.0], [2.0, 2.0, 2.5], [2.5, 2.0, 2.0]];
const FRACTIONAL_DIVIDERS: [f64; 3] = [2.0, 2.5, 2.0];

fn greater_or_equal(a: f64, b: f64) -> bool {
    a - b > -EPSILON
}

fn approx_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

/// Span search for one divider sequence
#[derive(Debug, Clone, Copy)]
pub struct TickSpanCalculator {
    min_movement: f64,
    integral_dividers: [f64; 3],
}

impl TickSpanCalculator {
    pub fn new(precision: u32, integral_dividers: [f64; 3]) -> Self {
        Self {
            min_movement: min_movement(precision),
            integral_dividers,
        }
    }

    /// Largest span reachable by division that still respects `max_tick_span`
    pub fn tick_span(&self, high: f64, low: f64, max_tick_span: f64) -> f64 {
        let min_movement = self.min_movement;
        let range = (high - low).max(min_movement);
        let mut span = 10f64.powf(range.log10().ceil().max(0.0));

        let mut index = 0;
        let mut divider = self.integral_dividers[0];
        loop {
            let above_min_movement =
                greater_or_equal(span, min_movement) && span > min_movement + EPSILON;
            let above_max_span = greater_or_equal(span, max_tick_span * divider);
            let above_one = greater_or_equal(span, 1.0);
            if !(above_min_movement && above_max_span && above_one) {
                break;
            }
            span /= divider;
            index += 1;
            divider = self.integral_dividers[index % self.integral_dividers.len()];
        }

        if span <= min_movement + EPSILON {
            span = min_movement;
        }
        span = span.max(1.0);

        if approx_equal(span, 1.0) && min_movement < 1.0 {
            let mut index = 0;
            let mut divider = FRACTIONAL_DIVIDERS[0];
            loop {
                let larger = greater_or_equal(span, max_tick_span * divider)
                    && span > min_movement + EPSILON;
                if !larger {
                    break;
                }
                span /= divider;
                index += 1;
                divider = FRACTIONAL_DIVIDERS[index % FRACTIONAL_DIVIDERS.len()];
            }
        }
        span
    }
}

/// Tick span for a price range drawn over `pane_height` pixels.
///
/// The result is the smallest span among the divider sequences, snapped up
/// to an integer multiple of the minimum movement.
pub fn price_tick_span(
    low: f64,
    high: f64,
    pane_height: f32,
    font_size: f32,
    precision: u32,
) -> f64 {
    let precision = precision.min(MAX_PRECISION);
    let min_move = min_movement(precision);
    if !(high > low) || pane_height <= 0.0 {
        return min_move;
    }

    let label_px = font_size.max(1.0) as f64 * TICK_DENSITY;
    let max_tick_span = (high - low) * label_px / pane_height as f64;

    let span = INTEGRAL_DIVIDERS
        .iter()
        .map(|dividers| TickSpanCalculator::new(precision, *dividers).tick_span(high, low, max_tick_span))
        .fold(f64::INFINITY, f64::min);

    let steps = (span / min_move - 1e-9).ceil().max(1.0);
    round_to(steps * min_move, min_move)
}

/// Tick values within `[low, high]` on multiples of `span`
pub fn price_ticks(low: f64, high: f64, span: f64, min_move: f64) -> Vec<f64> {
    if !(span > 0.0) || !low.is_finite() || !high.is_finite() || high < low {
        return Vec::new();
    }
    let first = (low / span).ceil() as i64;
    let last = (high / span).floor() as i64;
    if last < first {
        return Vec::new();
    }
    let count = ((last - first) as usize + 1).min(MAX_PRICE_TICKS);
    (0..count)
        .map(|k| round_to((first + k as i64) as f64 * span, min_move))
        .collect()
}

/// Granularity of time labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeBucket {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl TimeBucket {
    /// Bucket for a visible time span in milliseconds
    pub fn for_span(span_ms: i64) -> Self {
        const HOUR: i64 = 3_600_000;
        const DAY: i64 = 24 * HOUR;
        match span_ms {
            s if s < 3 * HOUR => TimeBucket::Minute,
            s if s < 3 * DAY => TimeBucket::Hour,
            s if s < 90 * DAY => TimeBucket::Day,
            s if s < 3 * 365 * DAY => TimeBucket::Month,
            _ => TimeBucket::Year,
        }
    }

    fn format(&self) -> &'static str {
        match self {
            TimeBucket::Minute | TimeBucket::Hour => "%H:%M",
            TimeBucket::Day => "%m-%d",
            TimeBucket::Month => "%Y-%m",
            TimeBucket::Year => "%Y",
        }
    }

    /// Format of a label that crosses into the next larger unit
    fn major_format(&self) -> &'static str {
        match self {
            TimeBucket::Minute | TimeBucket::Hour => "%m-%d",
            TimeBucket::Day => "%Y-%m",
            TimeBucket::Month | TimeBucket::Year => "%Y",
        }
    }

    /// Key that changes when the next larger unit rolls over
    fn major_key(&self, dt: &DateTime<Utc>) -> i64 {
        match self {
            TimeBucket::Minute | TimeBucket::Hour => dt.num_days_from_ce() as i64,
            TimeBucket::Day => dt.year() as i64 * 12 + dt.month0() as i64,
            TimeBucket::Month | TimeBucket::Year => dt.year() as i64,
        }
    }
}

/// A labelled bar on the time axis
#[derive(Debug, Clone, PartialEq)]
pub struct TimeTick {
    pub index: usize,
    pub time: i64,
    pub label: String,
    /// First tick of a new day/month/year
    pub major: bool,
}

const NICE_STRIDES: [usize; 14] = [1, 2, 3, 5, 10, 15, 20, 30, 60, 120, 240, 480, 960, 1920];

/// Bar stride keeping labels at least `min_label_px` apart
pub fn time_stride(bar_spacing: f64, min_label_px: f64) -> usize {
    if bar_spacing <= 0.0 {
        return 1;
    }
    let raw = (min_label_px / bar_spacing).ceil().max(1.0) as usize;
    NICE_STRIDES
        .iter()
        .copied()
        .find(|stride| *stride >= raw)
        .unwrap_or(raw)
}

/// Time ticks for bars `first..=last`. Ticks sit on multiples of the stride
/// so they stay put while panning.
pub fn time_ticks(
    candles: &[Candle],
    first: usize,
    last: usize,
    bar_spacing: f64,
    min_label_px: f64,
) -> Vec<TimeTick> {
    if candles.is_empty() || first > last || first >= candles.len() {
        return Vec::new();
    }
    let last = last.min(candles.len() - 1);
    let span_ms = candles[last].time - candles[first].time;
    let bucket = TimeBucket::for_span(span_ms);
    let stride = time_stride(bar_spacing, min_label_px);

    let mut ticks = Vec::new();
    let mut previous_key: Option<i64> = first
        .checked_sub(stride)
        .and_then(|ix| candles[ix].datetime())
        .map(|dt| bucket.major_key(&dt));

    let start = first.div_ceil(stride) * stride;
    for index in (start..=last).step_by(stride) {
        let candle = &candles[index];
        let Some(dt) = candle.datetime() else {
            continue;
        };
        let key = bucket.major_key(&dt);
        let major = previous_key.is_some_and(|previous| previous != key);
        let format = if major { bucket.major_format() } else { bucket.format() };
        ticks.push(TimeTick {
            index,
            time: candle.time,
            label: dt.format(format).to_string(),
            major,
        });
        previous_key = Some(key);
    }
    ticks
}

/// Indices in `first..=last` whose candle opens a new UTC day
pub fn session_breaks(candles: &[Candle], first: usize, last: usize) -> Vec<usize> {
    if candles.len() < 2 || first > last {
        return Vec::new();
    }
    let last = last.min(candles.len() - 1);
    (first.max(1)..=last)
        .filter(|&ix| {
            let day = |c: &Candle| c.time.div_euclid(86_400_000);
            day(&candles[ix]) != day(&candles[ix - 1])
        })
        .collect()
}

/// Crosshair label for a bar time
pub fn format_cursor_time(time: i64) -> String {
    DateTime::from_timestamp_millis(time)
        .map(|dt| {
            if dt.hour() == 0 && dt.minute() == 0 {
                dt.format("%Y-%m-%d").to_string()
            } else {
                dt.format("%Y-%m-%d %H:%M").to_string()
            }
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ticks_well_formed(low: f64, high: f64, height: f32, precision: u32) {
        let min_move = min_movement(precision);
        let span = price_tick_span(low, high, height, 11.0, precision);
        let multiple = span / min_move;
        assert!(
            (multiple - multiple.round()).abs() < 1e-6,
            "span {} is not a multiple of {}",
            span,
            min_move
        );
        assert!(span >= min_move);

        let ticks = price_ticks(low, high, span, min_move);
        for pair in ticks.windows(2) {
            assert!(pair[1] > pair[0]);
            assert!(((pair[1] - pair[0]) - span).abs() < span * 1e-6);
        }
        for tick in &ticks {
            assert!(*tick >= low - 1e-9 && *tick <= high + 1e-9);
        }
    }

    #[test]
    fn test_price_ticks_monotonic_and_on_min_movement() {
        let cases = [
            (95.0, 105.0, 400.0, 2),
            (0.00012, 0.00019, 300.0, 8),
            (1.0, 1.0004, 500.0, 5),
            (20_000.0, 21_500.0, 600.0, 1),
            (3.0, 4.0, 50.0, 0),
            (100.0, 100.05, 800.0, 2),
        ];
        for (low, high, height, precision) in cases {
            assert_ticks_well_formed(low, high, height, precision);
        }
    }

    #[test]
    fn test_span_respects_label_density() {
        // 10 price units over 400px, labels need 27.5px
        let span = price_tick_span(95.0, 105.0, 400.0, 11.0, 2);
        assert!(span * 400.0 / 10.0 >= 11.0 * TICK_DENSITY - 1e-9);
        assert_eq!(span, 1.0);

        // 2.5 then 2 reaches 4 before 5
        let span = price_tick_span(95.0, 105.0, 100.0, 11.0, 2);
        assert_eq!(span, 4.0);
    }

    #[test]
    fn test_fractional_spans() {
        let span = price_tick_span(100.0, 100.5, 500.0, 11.0, 2);
        assert!((span - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_range() {
        assert_eq!(price_tick_span(5.0, 5.0, 400.0, 11.0, 2), 0.01);
        assert!(price_ticks(5.0, 4.0, 1.0, 0.01).is_empty());
        assert!(price_ticks(0.0, 1.0, 0.0, 0.01).is_empty());
    }

    #[test]
    fn test_time_bucket_for_span() {
        let hour = 3_600_000;
        assert_eq!(TimeBucket::for_span(hour), TimeBucket::Minute);
        assert_eq!(TimeBucket::for_span(10 * hour), TimeBucket::Hour);
        assert_eq!(TimeBucket::for_span(20 * 24 * hour), TimeBucket::Day);
        assert_eq!(TimeBucket::for_span(400 * 24 * hour), TimeBucket::Month);
        assert_eq!(TimeBucket::for_span(2_000 * 24 * hour), TimeBucket::Year);
    }

    #[test]
    fn test_time_stride() {
        assert_eq!(time_stride(8.0, 90.0), 15);
        assert_eq!(time_stride(60.0, 90.0), 2);
        assert_eq!(time_stride(0.0, 90.0), 1);
    }

    #[test]
    fn test_time_ticks_mark_day_rollover() {
        // 1h candles over two days starting at midnight
        let candles: Vec<Candle> = (0..48)
            .map(|i| Candle::flat(i * 3_600_000, 1.0))
            .collect();
        let ticks = time_ticks(&candles, 0, 47, 20.0, 90.0);
        assert!(ticks.iter().all(|t| t.index % 5 == 0));
        let major: Vec<&TimeTick> = ticks.iter().filter(|t| t.major).collect();
        assert_eq!(major.len(), 1);
        assert_eq!(major[0].index, 25);
        assert_eq!(major[0].label, "01-02");
        assert_eq!(ticks[1].label, "05:00");
    }

    #[test]
    fn test_session_breaks() {
        let candles: Vec<Candle> = (0..48)
            .map(|i| Candle::flat(i * 3_600_000, 1.0))
            .collect();
        assert_eq!(session_breaks(&candles, 0, 47), vec![24]);
        assert!(session_breaks(&candles, 0, 10).is_empty());
    }

    #[test]
    fn test_format_cursor_time() {
        assert_eq!(format_cursor_time(0), "1970-01-01");
        assert_eq!(format_cursor_time(90 * 60_000), "1970-01-01 01:30");
    }
}
