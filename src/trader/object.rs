//! Basic data structures used by the chart engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Candlestick bar of a certain trading period.
///
/// `time` is the bucket-aligned open time in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Create a new candle
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Flat candle where every price equals `price`
    pub fn flat(time: i64, price: f64) -> Self {
        Self::new(time, price, price, price, price, 0.0)
    }

    /// Check that every field is usable. Non-finite prices or a negative
    /// volume make the candle malformed.
    pub fn is_valid(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.volume >= 0.0
    }

    /// Return a copy whose high/low bracket open and close.
    pub fn normalized(&self) -> Self {
        let mut candle = *self;
        candle.high = self.high.max(self.open).max(self.close);
        candle.low = self.low.min(self.open).min(self.close);
        candle
    }

    /// Validate and repair in one step, `None` if the candle must be dropped
    pub fn sanitized(&self) -> Option<Self> {
        if self.is_valid() {
            Some(self.normalized())
        } else {
            None
        }
    }

    /// Close above open
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Open time as a UTC datetime
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time)
    }
}

/// News/event marker anchored on the base series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMarker {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub time: i64,
    /// Nearest base-series index, refreshed whenever the base series changes
    pub base_index: usize,
}

impl EventMarker {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
        time: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            time,
            base_index: 0,
        }
    }
}

/// Event marker re-projected onto the active series
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEvent {
    pub marker: EventMarker,
    pub index: usize,
}

/// Position in world coordinates: fractional bar index and price.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub index: f64,
    pub price: f64,
}

impl WorldPoint {
    pub fn new(index: f64, price: f64) -> Self {
        Self { index, price }
    }

    /// Shift by a bar delta and a price delta
    pub fn translated(&self, d_index: f64, d_price: f64) -> Self {
        Self::new(self.index + d_index, self.price + d_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_validity() {
        assert!(Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0).is_valid());
        assert!(!Candle::new(0, f64::NAN, 2.0, 0.5, 1.5, 10.0).is_valid());
        assert!(!Candle::new(0, 1.0, f64::INFINITY, 0.5, 1.5, 10.0).is_valid());
        assert!(!Candle::new(0, 1.0, 2.0, 0.5, 1.5, -1.0).is_valid());
    }

    #[test]
    fn test_candle_normalized_brackets_body() {
        let candle = Candle::new(0, 10.0, 9.0, 11.0, 12.0, 1.0).normalized();
        assert_eq!(candle.high, 12.0);
        assert_eq!(candle.low, 10.0);
        assert!(candle.low <= candle.body_bottom());
        assert!(candle.body_top() <= candle.high);
    }

    #[test]
    fn test_candle_datetime() {
        let candle = Candle::flat(60_000, 1.0);
        let dt = candle.datetime().unwrap();
        assert_eq!(dt.timestamp_millis(), 60_000);
    }
}
