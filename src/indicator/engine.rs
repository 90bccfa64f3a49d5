//! Incremental indicator cache keyed by timeframe and indicator name.

use std::collections::HashMap;

use tracing::debug;

use super::definition::{default_indicators, IndicatorDef, IndicatorState};
use crate::trader::{Candle, Timeframe};

/// Cached output of one indicator over one timeframe.
///
/// Every value below `dirty_index` matches a fresh full computation over the
/// current series.
#[derive(Debug, Clone)]
pub struct IndicatorCacheEntry {
    pub data: IndicatorState,
    pub dirty_index: usize,
}

/// Borrowed view of one indicator's output
#[derive(Debug, Clone, Copy)]
pub struct IndicatorOutput<'a> {
    pub def: &'a IndicatorDef,
    pub data: &'a IndicatorState,
}

impl IndicatorOutput<'_> {
    pub fn name(&self) -> String {
        self.def.name()
    }
}

/// Registry of indicator definitions plus their per-timeframe caches
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    registry: Vec<IndicatorDef>,
    caches: HashMap<Timeframe, HashMap<String, IndicatorCacheEntry>>,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(default_indicators())
    }
}

impl IndicatorEngine {
    pub fn new(registry: Vec<IndicatorDef>) -> Self {
        let mut engine = Self {
            registry: Vec::new(),
            caches: HashMap::new(),
        };
        for def in registry {
            engine.register(def);
        }
        engine
    }

    /// Add a definition. Returns false if one with the same name exists.
    pub fn register(&mut self, def: IndicatorDef) -> bool {
        let name = def.name();
        if self.registry.iter().any(|d| d.name() == name) {
            return false;
        }
        self.registry.push(def);
        true
    }

    /// Remove a definition and its cached outputs
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.registry.len();
        self.registry.retain(|d| d.name() != name);
        for cache in self.caches.values_mut() {
            cache.remove(name);
        }
        self.registry.len() != before
    }

    pub fn definitions(&self) -> &[IndicatorDef] {
        &self.registry
    }

    /// Lower the dirty index of every cached indicator of `timeframe`
    pub fn mark_dirty(&mut self, timeframe: Timeframe, floor: usize) {
        if let Some(cache) = self.caches.get_mut(&timeframe) {
            for entry in cache.values_mut() {
                entry.dirty_index = entry.dirty_index.min(floor);
            }
        }
    }

    /// Force a full recompute of `timeframe` on the next refresh
    pub fn invalidate(&mut self, timeframe: Timeframe) {
        self.mark_dirty(timeframe, 0);
    }

    /// Force a full recompute of every timeframe
    pub fn invalidate_all(&mut self) {
        for entry in self.caches.values_mut().flat_map(|cache| cache.values_mut()) {
            entry.dirty_index = 0;
        }
    }

    /// Drop every cache
    pub fn clear(&mut self) {
        self.caches.clear();
    }

    /// Bring every registered indicator of `timeframe` up to date with
    /// `series`, recomputing only from each entry's dirty index. Returns the
    /// number of bar values recomputed.
    pub fn refresh(&mut self, timeframe: Timeframe, series: &[Candle], force: bool) -> usize {
        let len = series.len();
        let cache = self.caches.entry(timeframe).or_default();
        let mut recomputed = 0;

        for def in &self.registry {
            let entry = cache.entry(def.name()).or_insert_with(|| IndicatorCacheEntry {
                data: def.create_state(len),
                dirty_index: 0,
            });

            if force {
                entry.dirty_index = 0;
            }
            let cached_len = entry.data.len();
            if cached_len != len {
                entry.dirty_index = entry.dirty_index.min(cached_len).min(len);
            }

            if entry.dirty_index < len || cached_len != len {
                def.compute(series, &mut entry.data, entry.dirty_index);
                recomputed += len - entry.dirty_index;
            }
            entry.dirty_index = len;
        }

        if recomputed > 0 {
            debug!(
                timeframe = timeframe.value(),
                recomputed, "indicators refreshed"
            );
        }
        recomputed
    }

    /// Cached entry for one indicator, without refreshing
    pub fn entry(&self, timeframe: Timeframe, name: &str) -> Option<&IndicatorCacheEntry> {
        self.caches.get(&timeframe)?.get(name)
    }

    /// Cached outputs of `timeframe` in registration order
    pub fn outputs(&self, timeframe: Timeframe) -> Vec<IndicatorOutput<'_>> {
        let Some(cache) = self.caches.get(&timeframe) else {
            return Vec::new();
        };
        self.registry
            .iter()
            .filter_map(|def| {
                cache.get(&def.name()).map(|entry| IndicatorOutput {
                    def,
                    data: &entry.data,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(len: usize) -> Vec<Candle> {
        (0..len)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.21).cos() * 3.0;
                Candle::new(i as i64 * 60_000, c, c + 0.5, c - 0.5, c, 5.0)
            })
            .collect()
    }

    #[test]
    fn test_refresh_twice_is_a_noop() {
        let mut engine = IndicatorEngine::default();
        let data = series(80);
        assert_eq!(engine.refresh(Timeframe::Minute1, &data, false), 80 * 5);
        assert_eq!(engine.refresh(Timeframe::Minute1, &data, false), 0);
    }

    #[test]
    fn test_dirty_floor_limits_recompute() {
        let mut engine = IndicatorEngine::default();
        let mut data = series(80);
        engine.refresh(Timeframe::Minute1, &data, false);

        let last = data.len() - 1;
        data[last].close += 1.0;
        data.push(Candle::flat(80 * 60_000, 101.0));
        engine.mark_dirty(Timeframe::Minute1, last);

        assert_eq!(engine.refresh(Timeframe::Minute1, &data, false), 2 * 5);

        let mut fresh = IndicatorEngine::default();
        fresh.refresh(Timeframe::Minute1, &data, false);
        for def in engine.definitions() {
            let name = def.name();
            assert_eq!(
                engine.entry(Timeframe::Minute1, &name).map(|e| &e.data),
                fresh.entry(Timeframe::Minute1, &name).map(|e| &e.data),
            );
        }
    }

    #[test]
    fn test_growth_without_mark_still_computes_new_bars() {
        let mut engine = IndicatorEngine::new(vec![IndicatorDef::Sma { period: 2 }]);
        let mut data = series(10);
        engine.refresh(Timeframe::Minute5, &data, false);
        data.push(Candle::flat(10 * 60_000, 99.0));
        assert_eq!(engine.refresh(Timeframe::Minute5, &data, false), 1);
        let entry = engine.entry(Timeframe::Minute5, "SMA2").unwrap();
        assert_eq!(entry.dirty_index, 11);
        assert!(entry.data.value(0, 10).is_some());
    }

    #[test]
    fn test_force_recomputes_everything() {
        let mut engine = IndicatorEngine::new(vec![IndicatorDef::Ema { period: 3 }]);
        let data = series(20);
        engine.refresh(Timeframe::Hour1, &data, false);
        assert_eq!(engine.refresh(Timeframe::Hour1, &data, true), 20);
    }

    #[test]
    fn test_register_rejects_duplicates_and_unregister_drops_cache() {
        let mut engine = IndicatorEngine::default();
        assert!(!engine.register(IndicatorDef::Ema { period: 20 }));
        assert!(engine.register(IndicatorDef::Sma { period: 5 }));

        engine.refresh(Timeframe::Minute1, &series(10), false);
        assert!(engine.entry(Timeframe::Minute1, "SMA5").is_some());
        assert!(engine.unregister("SMA5"));
        assert!(engine.entry(Timeframe::Minute1, "SMA5").is_none());
        assert!(!engine.unregister("SMA5"));
    }

    #[test]
    fn test_outputs_follow_registration_order() {
        let mut engine = IndicatorEngine::default();
        assert!(engine.outputs(Timeframe::Day1).is_empty());
        engine.refresh(Timeframe::Day1, &series(30), false);
        let names: Vec<String> = engine.outputs(Timeframe::Day1).iter().map(|o| o.name()).collect();
        assert_eq!(names, ["EMA20", "EMA50", "BOLL(20,2)", "RSI14", "MACD(12,26,9)"]);
    }
}
