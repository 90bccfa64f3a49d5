//! Multi-timeframe candle store.
//!
//! Owns the base candle sequence, lazily derives coarser timeframes from it,
//! keeps indicator caches in step with every mutation and notifies
//! subscribers once each mutation has completed.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::lookup::{find_index_for_time, price_range, volume_range};
use super::series::{bucket_start, AppendOutcome, DerivedSeries};
use crate::event::{ChangeBus, ChangeEvent, HandlerId, Subscription};
use crate::indicator::{IndicatorDef, IndicatorEngine, IndicatorOutput};
use crate::trader::{
    get_digits, infer_precision, min_movement, Candle, ChangeKind, EventMarker, ProjectedEvent,
    Settings, Timeframe, MAX_PRECISION,
};

/// Number of trailing bars whose indicator windows an append may touch
const APPEND_DIRTY_TAIL: usize = 3;

/// Everything a renderer reads for one frame
#[derive(Debug, Clone)]
pub struct StoreFrame<'a> {
    pub timeframe: Timeframe,
    pub candles: &'a [Candle],
    pub indicators: Vec<IndicatorOutput<'a>>,
    pub events: Vec<ProjectedEvent>,
    pub precision: u32,
}

impl StoreFrame<'_> {
    pub fn min_movement(&self) -> f64 {
        min_movement(self.precision)
    }
}

fn series_of<'a>(
    base: &'a [Candle],
    derived: &'a HashMap<Timeframe, DerivedSeries>,
    base_timeframe: Timeframe,
    timeframe: Timeframe,
) -> Option<&'a [Candle]> {
    if timeframe == base_timeframe {
        Some(base)
    } else {
        derived.get(&timeframe).map(|s| s.candles.as_slice())
    }
}

/// Store of one instrument's candles across every supported timeframe
pub struct TimeSeriesStore {
    instrument: String,
    base_timeframe: Timeframe,
    active: Timeframe,
    base: Vec<Candle>,
    derived: HashMap<Timeframe, DerivedSeries>,
    precision: u32,
    events: Vec<EventMarker>,
    indicators: IndicatorEngine,
    bus: ChangeBus,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new(Timeframe::Minute1)
    }
}

impl TimeSeriesStore {
    pub fn new(base_timeframe: Timeframe) -> Self {
        Self {
            instrument: String::new(),
            base_timeframe,
            active: base_timeframe,
            base: Vec::new(),
            derived: HashMap::new(),
            precision: 0,
            events: Vec::new(),
            indicators: IndicatorEngine::default(),
            bus: ChangeBus::new(),
        }
    }

    /// Create a store whose base timeframe comes from `chart.base_timeframe`
    pub fn from_settings(settings: &Settings) -> Self {
        let base_timeframe = match settings.get_string("chart.base_timeframe") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("Falling back to 1m base timeframe: {}", e);
                Timeframe::Minute1
            }),
            None => Timeframe::Minute1,
        };
        Self::new(base_timeframe)
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn base_timeframe(&self) -> Timeframe {
        self.base_timeframe
    }

    pub fn active_timeframe(&self) -> Timeframe {
        self.active
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn min_movement(&self) -> f64 {
        min_movement(self.precision)
    }

    pub fn base_series(&self) -> &[Candle] {
        &self.base
    }

    /// Candles of the active timeframe
    pub fn active_series(&self) -> &[Candle] {
        series_of(&self.base, &self.derived, self.base_timeframe, self.active).unwrap_or(&[])
    }

    /// Candles of `timeframe`, `None` if that series has not been built yet
    pub fn series(&self, timeframe: Timeframe) -> Option<&[Candle]> {
        series_of(&self.base, &self.derived, self.base_timeframe, timeframe)
    }

    /// Timeframes the store can derive from its base
    pub fn supported_timeframes(&self) -> Vec<Timeframe> {
        Timeframe::all()
            .into_iter()
            .filter(|tf| *tf >= self.base_timeframe)
            .collect()
    }

    /// Register a change handler. Dropping the returned handle unsubscribes.
    pub fn subscribe<F>(&mut self, handler: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn notify(&mut self, kind: ChangeKind) {
        let event = ChangeEvent::new(kind, self.active, self.events.clone());
        self.bus.emit(&event);
    }

    /// Append one base candle.
    ///
    /// Malformed candles are dropped and `false` is returned. A candle older
    /// than the newest one is inserted at its sorted position and every
    /// derived series is rebuilt.
    pub fn append_base(&mut self, candle: Candle) -> bool {
        let Some(candle) = candle.sanitized() else {
            debug!(time = candle.time, "dropped malformed candle");
            return false;
        };
        self.precision = self
            .precision
            .max(
                [candle.open, candle.high, candle.low, candle.close]
                    .iter()
                    .map(|v| get_digits(*v) as u32)
                    .max()
                    .unwrap_or(0),
            )
            .min(MAX_PRECISION);

        match self.base.last() {
            Some(last) if candle.time < last.time => self.insert_out_of_order(candle),
            Some(last) if candle.time == last.time => self.replace_last(candle),
            _ => self.push_tail(candle),
        }

        self.notify(ChangeKind::Append);
        true
    }

    fn push_tail(&mut self, candle: Candle) {
        self.base.push(candle);
        self.mark_tail_dirty(self.base_timeframe, self.base.len());

        let mut rebuilt = Vec::new();
        for (timeframe, series) in self.derived.iter_mut() {
            if series.apply(&candle, &self.base) == AppendOutcome::Rebuilt {
                rebuilt.push(*timeframe);
            }
        }

        let lengths: Vec<(Timeframe, usize)> =
            self.derived.iter().map(|(tf, s)| (*tf, s.len())).collect();
        for (timeframe, len) in lengths {
            if rebuilt.contains(&timeframe) {
                warn!(timeframe = timeframe.value(), "derived series rebuilt after late bucket");
                self.indicators.invalidate(timeframe);
            } else {
                self.mark_tail_dirty(timeframe, len);
            }
        }
    }

    fn replace_last(&mut self, candle: Candle) {
        if let Some(last) = self.base.last_mut() {
            *last = candle;
        }
        self.mark_tail_dirty(self.base_timeframe, self.base.len());

        for series in self.derived.values_mut() {
            series.refresh_tail(&self.base);
        }
        let lengths: Vec<(Timeframe, usize)> =
            self.derived.iter().map(|(tf, s)| (*tf, s.len())).collect();
        for (timeframe, len) in lengths {
            self.mark_tail_dirty(timeframe, len);
        }
    }

    fn insert_out_of_order(&mut self, candle: Candle) {
        match self.base.binary_search_by_key(&candle.time, |c| c.time) {
            Ok(ix) => self.base[ix] = candle,
            Err(ix) => self.base.insert(ix, candle),
        }
        warn!(
            time = candle.time,
            "out-of-order candle, rebuilding derived series"
        );

        for series in self.derived.values_mut() {
            series.rebuild(&self.base);
        }
        self.indicators.invalidate_all();
        self.refresh_event_indices();
    }

    fn mark_tail_dirty(&mut self, timeframe: Timeframe, len: usize) {
        self.indicators
            .mark_dirty(timeframe, len.saturating_sub(APPEND_DIRTY_TAIL));
    }

    /// Replace the whole history.
    ///
    /// Candles are sorted by time (stable), malformed ones dropped, and for
    /// duplicate timestamps the last one in input order wins.
    pub fn rebuild_all(&mut self, candles: Vec<Candle>) {
        self.load_history(candles);
        self.notify(ChangeKind::Reset);
    }

    fn load_history(&mut self, candles: Vec<Candle>) {
        let received = candles.len();
        let mut sorted: Vec<Candle> = candles.iter().filter_map(Candle::sanitized).collect();
        sorted.sort_by_key(|c| c.time);

        let mut base: Vec<Candle> = Vec::with_capacity(sorted.len());
        for candle in sorted {
            match base.last_mut() {
                Some(last) if last.time == candle.time => *last = candle,
                _ => base.push(candle),
            }
        }

        self.base = base;
        self.derived.clear();
        self.indicators.clear();
        self.precision = infer_precision(&self.base);
        if self.active != self.base_timeframe {
            self.ensure_series(self.active);
        }
        self.refresh_event_indices();

        info!(
            instrument = %self.instrument,
            received,
            loaded = self.base.len(),
            precision = self.precision,
            "history loaded"
        );
    }

    /// Switch to another instrument with a fresh history
    pub fn set_instrument(&mut self, instrument: impl Into<String>, candles: Vec<Candle>) {
        self.instrument = instrument.into();
        self.events.clear();
        self.load_history(candles);
        self.notify(ChangeKind::Instrument);
    }

    fn ensure_series(&mut self, timeframe: Timeframe) {
        if timeframe != self.base_timeframe && !self.derived.contains_key(&timeframe) {
            debug!(timeframe = timeframe.value(), "building derived series");
            self.derived
                .insert(timeframe, DerivedSeries::build(timeframe, &self.base));
        }
    }

    /// Switch the active timeframe. Timeframes finer than the base cannot be
    /// derived and are rejected.
    pub fn set_timeframe(&mut self, timeframe: Timeframe) -> bool {
        if timeframe < self.base_timeframe {
            debug!(
                timeframe = timeframe.value(),
                base = self.base_timeframe.value(),
                "timeframe finer than base rejected"
            );
            return false;
        }

        self.ensure_series(timeframe);
        self.active = timeframe;
        if let Some(series) = series_of(&self.base, &self.derived, self.base_timeframe, timeframe) {
            self.indicators.refresh(timeframe, series, true);
        }
        info!(timeframe = timeframe.value(), "timeframe switched");
        self.notify(ChangeKind::Timeframe);
        true
    }

    /// Indicator outputs for `timeframe`, recomputing the dirty tail first
    pub fn indicators(&mut self, timeframe: Timeframe) -> Vec<IndicatorOutput<'_>> {
        if timeframe < self.base_timeframe {
            return Vec::new();
        }
        self.ensure_series(timeframe);
        if let Some(series) = series_of(&self.base, &self.derived, self.base_timeframe, timeframe) {
            self.indicators.refresh(timeframe, series, false);
        }
        self.indicators.outputs(timeframe)
    }

    pub fn indicator_engine(&self) -> &IndicatorEngine {
        &self.indicators
    }

    pub fn register_indicator(&mut self, def: IndicatorDef) -> bool {
        self.indicators.register(def)
    }

    pub fn unregister_indicator(&mut self, name: &str) -> bool {
        self.indicators.unregister(name)
    }

    /// Read everything needed to render the active timeframe
    pub fn frame(&mut self) -> StoreFrame<'_> {
        let events = self.projected_events();
        let timeframe = self.active;
        let candles = series_of(&self.base, &self.derived, self.base_timeframe, timeframe)
            .unwrap_or(&[]);
        self.indicators.refresh(timeframe, candles, false);

        StoreFrame {
            timeframe,
            candles,
            indicators: self.indicators.outputs(timeframe),
            events,
            precision: self.precision,
        }
    }

    pub fn events(&self) -> &[EventMarker] {
        &self.events
    }

    /// Replace every event marker
    pub fn set_events(&mut self, events: Vec<EventMarker>) {
        self.events = events;
        self.refresh_event_indices();
        self.notify(ChangeKind::Events);
    }

    pub fn add_event(&mut self, mut event: EventMarker) {
        event.base_index = find_index_for_time(event.time, &self.base).unwrap_or(0);
        self.events.push(event);
        self.notify(ChangeKind::Events);
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
        self.notify(ChangeKind::Events);
    }

    fn refresh_event_indices(&mut self) {
        for event in &mut self.events {
            event.base_index = find_index_for_time(event.time, &self.base).unwrap_or(0);
        }
    }

    /// Event markers mapped onto the active series
    pub fn projected_events(&self) -> Vec<ProjectedEvent> {
        let series = self.active_series();
        let bucket = if self.active == self.base_timeframe {
            0
        } else {
            self.active.bucket_ms()
        };

        self.events
            .iter()
            .filter_map(|marker| {
                let index = find_index_for_time(bucket_start(marker.time, bucket), series)?;
                Some(ProjectedEvent {
                    marker: marker.clone(),
                    index,
                })
            })
            .collect()
    }

    /// Index in the active series nearest to `time`
    pub fn find_index_for_time(&self, time: i64) -> Option<usize> {
        find_index_for_time(time, self.active_series())
    }

    /// Low/high of the active series within `[min_ix, max_ix]`
    pub fn price_range(&self, min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
        price_range(self.active_series(), min_ix, max_ix)
    }

    /// Volume range of the active series within `[min_ix, max_ix]`
    pub fn volume_range(&self, min_ix: usize, max_ix: usize) -> Option<(f64, f64)> {
        volume_range(self.active_series(), min_ix, max_ix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const MINUTE: i64 = 60_000;

    fn candle(i: i64, price: f64) -> Candle {
        Candle::new(i * MINUTE, price, price + 1.0, price - 1.0, price + 0.5, 10.0)
    }

    fn history(count: i64) -> Vec<Candle> {
        (0..count).map(|i| candle(i, 100.0 + (i % 7) as f64)).collect()
    }

    #[test]
    fn test_append_keeps_derived_in_sync() {
        let mut store = TimeSeriesStore::new(Timeframe::Minute1);
        assert!(store.set_timeframe(Timeframe::Minute5));
        for c in history(23) {
            assert!(store.append_base(c));
        }
        let expected = DerivedSeries::build(Timeframe::Minute5, store.base_series());
        assert_eq!(store.active_series(), expected.candles.as_slice());
        assert_eq!(store.active_series().len(), 5);
    }

    #[test]
    fn test_malformed_candle_is_dropped() {
        let mut store = TimeSeriesStore::default();
        let mut bad = candle(0, 1.0);
        bad.close = f64::NAN;
        assert!(!store.append_base(bad));
        assert!(store.base_series().is_empty());
    }

    #[test]
    fn test_inverted_candle_is_repaired() {
        let mut store = TimeSeriesStore::default();
        assert!(store.append_base(Candle::new(0, 10.0, 9.0, 11.0, 10.5, 1.0)));
        let stored = store.base_series()[0];
        assert_eq!(stored.high, 10.5);
        assert_eq!(stored.low, 10.0);
    }

    #[test]
    fn test_out_of_order_append_rebuilds() {
        let mut store = TimeSeriesStore::default();
        store.set_timeframe(Timeframe::Minute5);
        let mut candles = history(12);
        let late = candles.remove(3);
        for c in candles {
            store.append_base(c);
        }
        store.append_base(late);

        let times: Vec<i64> = store.base_series().iter().map(|c| c.time).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.base_series().len(), 12);
        let expected = DerivedSeries::build(Timeframe::Minute5, store.base_series());
        assert_eq!(store.active_series(), expected.candles.as_slice());
    }

    #[test]
    fn test_equal_time_replaces_live_bar() {
        let mut store = TimeSeriesStore::default();
        store.set_timeframe(Timeframe::Minute5);
        store.rebuild_all(history(7));
        let mut update = candle(6, 150.0);
        update.volume = 3.0;
        store.append_base(update);

        assert_eq!(store.base_series().len(), 7);
        assert_eq!(store.base_series()[6].close, 150.5);
        let expected = DerivedSeries::build(Timeframe::Minute5, store.base_series());
        assert_eq!(store.active_series(), expected.candles.as_slice());
    }

    #[test]
    fn test_rebuild_all_sorts_and_dedupes() {
        let mut store = TimeSeriesStore::default();
        let mut candles = history(5);
        candles.reverse();
        candles.push(Candle::new(2 * MINUTE, 7.25, 8.0, 7.0, 7.5, 1.0));
        store.rebuild_all(candles);

        let base = store.base_series();
        assert_eq!(base.len(), 5);
        assert!(base.windows(2).all(|w| w[0].time < w[1].time));
        assert_eq!(base[2].open, 7.25);
        assert_eq!(store.precision(), 2);
        assert!((store.min_movement() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_finer_timeframe_rejected() {
        let mut store = TimeSeriesStore::new(Timeframe::Minute5);
        assert!(!store.set_timeframe(Timeframe::Minute1));
        assert_eq!(store.active_timeframe(), Timeframe::Minute5);
        assert!(store.set_timeframe(Timeframe::Hour1));
        assert!(!store.supported_timeframes().contains(&Timeframe::Minute1));
    }

    #[test]
    fn test_event_projection() {
        let mut store = TimeSeriesStore::default();
        let candles = history(100);
        let t50 = candles[50].time;
        store.rebuild_all(candles);
        store.add_event(EventMarker::new("e1", "CPI", "hot print", t50));

        assert_eq!(store.events()[0].base_index, 50);
        assert_eq!(store.projected_events()[0].index, 50);

        store.set_timeframe(Timeframe::Minute15);
        assert_eq!(store.projected_events()[0].index, 3);
    }

    #[test]
    fn test_subscribers_notified_after_mutation() {
        let mut store = TimeSeriesStore::default();
        let seen: Rc<RefCell<Vec<ChangeKind>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let subscription = store.subscribe(move |event| sink.borrow_mut().push(event.kind));

        store.rebuild_all(history(3));
        store.append_base(candle(3, 100.0));
        store.set_timeframe(Timeframe::Minute5);
        store.set_instrument("ETH-USD", history(2));
        store.clear_events();

        assert_eq!(
            *seen.borrow(),
            vec![
                ChangeKind::Reset,
                ChangeKind::Append,
                ChangeKind::Timeframe,
                ChangeKind::Instrument,
                ChangeKind::Events,
            ]
        );

        assert!(store.unsubscribe(subscription.id()));
        store.clear_events();
        assert_eq!(seen.borrow().len(), 5);
    }

    #[test]
    fn test_frame_refreshes_only_dirty_tail() {
        let mut store = TimeSeriesStore::default();
        store.rebuild_all(history(120));
        assert_eq!(store.frame().indicators.len(), 5);

        store.append_base(candle(120, 101.0));
        let engine = store.indicator_engine();
        let entry = engine.entry(Timeframe::Minute1, "EMA20");
        assert_eq!(entry.map(|e| e.dirty_index), Some(118));

        let frame = store.frame();
        assert_eq!(frame.candles.len(), 121);
        let ema = frame.indicators[0].data;
        assert_eq!(ema.len(), 121);
        assert!(ema.value(0, 120).is_some());
    }

    #[test]
    fn test_indicators_for_unbuilt_timeframe() {
        let mut store = TimeSeriesStore::default();
        store.rebuild_all(history(60));
        let outputs = store.indicators(Timeframe::Hour1);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0].data.len(), 1);
        assert!(store.indicators(Timeframe::Minute1).iter().all(|o| o.data.len() == 60));
    }
}
