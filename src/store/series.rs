//! Bucket aggregation of base candles into coarser timeframes.

use crate::trader::{Candle, Timeframe};

/// Start of the bucket containing `time`
pub fn bucket_start(time: i64, bucket_ms: i64) -> i64 {
    if bucket_ms <= 0 {
        return time;
    }
    time.div_euclid(bucket_ms) * bucket_ms
}

/// Accumulates base candles falling into one bucket
#[derive(Debug, Clone, Copy)]
struct BucketBuilder {
    candle: Candle,
}

impl BucketBuilder {
    fn new(start_time: i64, first: &Candle) -> Self {
        let mut candle = *first;
        candle.time = start_time;
        Self { candle }
    }

    fn update(&mut self, candle: &Candle) {
        self.candle.high = self.candle.high.max(candle.high);
        self.candle.low = self.candle.low.min(candle.low);
        self.candle.close = candle.close;
        self.candle.volume += candle.volume;
    }

    fn build(self) -> Candle {
        self.candle
    }
}

/// Aggregate a time-ordered base sequence into buckets of `bucket_ms`
pub fn aggregate(base: &[Candle], bucket_ms: i64) -> Vec<Candle> {
    let mut candles = Vec::new();
    let mut builder: Option<BucketBuilder> = None;

    for candle in base {
        let start = bucket_start(candle.time, bucket_ms);
        match builder.as_mut() {
            Some(current) if current.candle.time == start => current.update(candle),
            _ => {
                if let Some(finished) = builder.take() {
                    candles.push(finished.build());
                }
                builder = Some(BucketBuilder::new(start, candle));
            }
        }
    }

    if let Some(finished) = builder {
        candles.push(finished.build());
    }
    candles
}

/// What happened to a derived series when a base candle arrived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Folded into the last bucket
    Merged,
    /// Opened a new bucket
    Opened,
    /// Arrived before the last bucket; the series was rebuilt from base
    Rebuilt,
}

/// Candles of one derived timeframe plus the bookkeeping for live appends
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub timeframe: Timeframe,
    pub bucket_ms: i64,
    pub candles: Vec<Candle>,
    pub last_bucket_time: Option<i64>,
}

impl DerivedSeries {
    /// Build from a complete, time-ordered base sequence
    pub fn build(timeframe: Timeframe, base: &[Candle]) -> Self {
        let mut series = Self {
            timeframe,
            bucket_ms: timeframe.bucket_ms(),
            candles: Vec::new(),
            last_bucket_time: None,
        };
        series.rebuild(base);
        series
    }

    /// Replace every candle by re-aggregating `base`
    pub fn rebuild(&mut self, base: &[Candle]) {
        self.candles = aggregate(base, self.bucket_ms);
        self.last_bucket_time = self.candles.last().map(|c| c.time);
    }

    /// Fold a newly appended base candle in. `base` must already contain it.
    pub fn apply(&mut self, candle: &Candle, base: &[Candle]) -> AppendOutcome {
        let start = bucket_start(candle.time, self.bucket_ms);

        match self.last_bucket_time {
            Some(last) if start == last => {
                if let Some(current) = self.candles.last_mut() {
                    let mut builder = BucketBuilder { candle: *current };
                    builder.update(candle);
                    *current = builder.build();
                }
                AppendOutcome::Merged
            }
            Some(last) if start < last => {
                self.rebuild(base);
                AppendOutcome::Rebuilt
            }
            _ => {
                self.candles.push(BucketBuilder::new(start, candle).build());
                self.last_bucket_time = Some(start);
                AppendOutcome::Opened
            }
        }
    }

    /// Re-aggregate only the last bucket, after the newest base candle was
    /// replaced in place.
    pub fn refresh_tail(&mut self, base: &[Candle]) {
        let Some(last) = self.last_bucket_time else {
            self.rebuild(base);
            return;
        };
        let first_ix = base.partition_point(|c| c.time < last);
        match aggregate(&base[first_ix..], self.bucket_ms).as_slice() {
            [tail] => {
                if let Some(current) = self.candles.last_mut() {
                    *current = *tail;
                }
            }
            _ => self.rebuild(base),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: i64 = 60_000;

    fn minute_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let open = 100.0 + (i as f64 * 0.7).sin() * 4.0;
                let close = open + (i as f64 * 1.3).cos();
                Candle::new(
                    i as i64 * MINUTE,
                    open,
                    open.max(close) + 0.5 + (i % 3) as f64 * 0.1,
                    open.min(close) - 0.5,
                    close,
                    10.0 + i as f64,
                )
            })
            .collect()
    }

    #[test]
    fn test_bucket_start() {
        assert_eq!(bucket_start(0, 5 * MINUTE), 0);
        assert_eq!(bucket_start(7 * MINUTE, 5 * MINUTE), 5 * MINUTE);
        assert_eq!(bucket_start(-1, 5 * MINUTE), -5 * MINUTE);
        assert_eq!(bucket_start(42, 0), 42);
    }

    #[test]
    fn test_aggregation_matches_bucket_ranges() {
        let base = minute_candles(47);
        for timeframe in [Timeframe::Minute5, Timeframe::Minute15, Timeframe::Hour1] {
            let bucket = timeframe.bucket_ms();
            let derived = aggregate(&base, bucket);

            for candle in &derived {
                let members: Vec<&Candle> = base
                    .iter()
                    .filter(|c| c.time >= candle.time && c.time < candle.time + bucket)
                    .collect();
                assert!(!members.is_empty());
                assert_eq!(candle.open, members[0].open);
                assert_eq!(candle.close, members[members.len() - 1].close);
                let high = members.iter().map(|c| c.high).fold(f64::MIN, f64::max);
                let low = members.iter().map(|c| c.low).fold(f64::MAX, f64::min);
                let volume: f64 = members.iter().map(|c| c.volume).sum();
                assert_eq!(candle.high, high);
                assert_eq!(candle.low, low);
                assert!((candle.volume - volume).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_incremental_apply_equals_rebuild() {
        let all = minute_candles(130);
        for timeframe in [Timeframe::Minute5, Timeframe::Minute15, Timeframe::Hour1] {
            let mut base = Vec::new();
            let mut series = DerivedSeries::build(timeframe, &base);
            for candle in &all {
                base.push(*candle);
                series.apply(candle, &base);
            }
            assert_eq!(series, DerivedSeries::build(timeframe, &base));
        }
    }

    #[test]
    fn test_apply_reports_outcome() {
        let base = minute_candles(6);
        let mut series = DerivedSeries::build(Timeframe::Minute5, &base[..5]);
        assert_eq!(series.apply(&base[5], &base), AppendOutcome::Opened);

        let late = Candle::new(2 * MINUTE, 1.0, 1.0, 1.0, 1.0, 1.0);
        let mut merged = base.clone();
        merged.push(Candle::new(7 * MINUTE, 1.0, 1.0, 1.0, 1.0, 1.0));
        assert_eq!(series.apply(&merged[6], &merged), AppendOutcome::Merged);

        let mut reordered = merged.clone();
        reordered.insert(2, late);
        assert_eq!(series.apply(&late, &reordered), AppendOutcome::Rebuilt);
        assert_eq!(series.last_bucket_time, Some(5 * MINUTE));
    }

    #[test]
    fn test_refresh_tail_after_replacing_last_candle() {
        let mut base = minute_candles(12);
        let mut series = DerivedSeries::build(Timeframe::Minute5, &base);
        let last = base.len() - 1;
        base[last].close = 500.0;
        base[last].high = 501.0;
        series.refresh_tail(&base);
        assert_eq!(series, DerivedSeries::build(Timeframe::Minute5, &base));
    }
}
