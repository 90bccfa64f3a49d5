//! Fixed-step stochastic market.
//!
//! Real elapsed time, scaled by the speed multiplier, fills an accumulator;
//! every full base interval in it produces exactly one candle. Scheduled
//! events turn into decaying impulses once the simulated clock reaches them.

use tracing::{debug, info};

use super::config::SimulatorConfig;
use super::event::{combine_impulses, Impulse, ScheduledEvent};
use super::sampler::GaussianSampler;
use crate::store::TimeSeriesStore;
use crate::trader::{round_to, Candle, EventMarker};

/// Upper bound on candles produced by one tick after a long stall
pub const MAX_STEPS_PER_TICK: usize = 1_000;

/// Mutable price state carried from one step to the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorState {
    pub last_price: f64,
    pub fair_value: f64,
    /// Open time of the last produced candle
    pub last_time: i64,
}

pub struct MarketSimulator {
    config: SimulatorConfig,
    sampler: GaussianSampler,
    state: SimulatorState,
    queue: Vec<ScheduledEvent>,
    impulses: Vec<Impulse>,
    pending_markers: Vec<EventMarker>,
    accumulator_ms: f64,
    running: bool,
}

impl Default for MarketSimulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl MarketSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            sampler: GaussianSampler::new(config.seed),
            state: Self::initial_state(&config),
            queue: Vec::new(),
            impulses: Vec::new(),
            pending_markers: Vec::new(),
            accumulator_ms: 0.0,
            running: false,
            config,
        }
    }

    fn initial_state(config: &SimulatorConfig) -> SimulatorState {
        SimulatorState {
            last_price: config.start_price,
            fair_value: config.start_price,
            last_time: config.start_time - config.base_interval_ms,
        }
    }

    /// Return to the seeded initial state. The event queue is kept.
    pub fn reset(&mut self) {
        self.sampler = GaussianSampler::new(self.config.seed);
        self.state = Self::initial_state(&self.config);
        self.impulses.clear();
        self.pending_markers.clear();
        self.accumulator_ms = 0.0;
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn start(&mut self) {
        if !self.running {
            info!(speed = self.config.speed, "simulator started");
        }
        self.running = true;
    }

    /// Stop producing candles. Checked once per tick.
    pub fn stop(&mut self) {
        if self.running {
            info!("simulator stopped");
        }
        self.running = false;
        self.accumulator_ms = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> f64 {
        self.config.speed
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.config.speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    }

    /// Queue an event, keeping the queue ordered by time
    pub fn schedule_event(&mut self, event: ScheduledEvent) {
        let ix = self.queue.partition_point(|e| e.time <= event.time);
        self.queue.insert(ix, event);
    }

    pub fn scheduled_events(&self) -> &[ScheduledEvent] {
        &self.queue
    }

    pub fn active_impulses(&self) -> &[Impulse] {
        &self.impulses
    }

    /// Markers of events activated since the last drain
    pub fn drain_markers(&mut self) -> Vec<EventMarker> {
        std::mem::take(&mut self.pending_markers)
    }

    fn activate_due_events(&mut self, now: i64) {
        let due = self.queue.partition_point(|e| e.time <= now);
        for event in self.queue.drain(..due) {
            info!(id = %event.id, title = %event.title, time = event.time, "market event activated");
            self.pending_markers.push(event.to_marker());
            let started_at = event.time;
            self.impulses.push(Impulse::new(event, started_at));
        }
    }

    /// Produce the next candle
    pub fn step(&mut self) -> Candle {
        let time = self.state.last_time + self.config.base_interval_ms;
        self.activate_due_events(time);
        let boost = combine_impulses(&mut self.impulses, time);

        let config = &self.config;
        let tick = config.price_tick;
        let open = self.state.last_price;

        let shock = self.sampler.next_gaussian()
            * config.volatility
            * config.liquidity_factor
            * (1.0 + boost.volatility);
        let drift = config.trend_bias * config.base_drift + boost.drift;
        let mean_reversion = (self.state.fair_value - open) * config.mean_reversion_rate;
        let close = (open + shock + drift + mean_reversion).max(tick);

        let wick = shock.abs() * config.wick_factor;
        let high = open.max(close) + wick * self.sampler.uniform();
        let low = (open.min(close) - wick * self.sampler.uniform()).max(tick);

        let noise = 1.0 + config.volume_noise * self.sampler.next_gaussian();
        let volume = config.base_volume * (noise.max(0.1) + boost.volume);

        let candle = Candle::new(
            time,
            open,
            round_to(high, tick),
            round_to(low, tick),
            round_to(close, tick),
            volume.round(),
        )
        .normalized();

        self.state.fair_value += (candle.close - self.state.fair_value) * config.fair_value_rate;
        self.state.last_price = candle.close;
        self.state.last_time = time;
        candle
    }

    /// Advance by `elapsed_ms` of real time. Returns every candle produced,
    /// none while stopped.
    pub fn tick(&mut self, elapsed_ms: f64) -> Vec<Candle> {
        if !self.running || !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return Vec::new();
        }

        let interval = self.config.base_interval_ms as f64;
        if interval <= 0.0 {
            return Vec::new();
        }
        self.accumulator_ms += elapsed_ms * self.config.speed;

        let mut candles = Vec::new();
        while self.accumulator_ms >= interval {
            if candles.len() >= MAX_STEPS_PER_TICK {
                debug!(
                    skipped_ms = self.accumulator_ms,
                    "simulator backlog dropped"
                );
                self.accumulator_ms = 0.0;
                break;
            }
            self.accumulator_ms -= interval;
            candles.push(self.step());
        }
        candles
    }

    /// Tick and push the result into `store`, including markers for events
    /// that fired. Returns the number of candles appended.
    pub fn tick_into(&mut self, elapsed_ms: f64, store: &mut TimeSeriesStore) -> usize {
        let candles = self.tick(elapsed_ms);
        let appended = candles
            .into_iter()
            .filter(|candle| store.append_base(*candle))
            .count();
        for marker in self.drain_markers() {
            store.add_event(marker);
        }
        appended
    }

    /// Run `count` steps without touching any store, for a bulk load
    pub fn generate_initial_history(&mut self, count: usize) -> Vec<Candle> {
        let candles: Vec<Candle> = (0..count).map(|_| self.step()).collect();
        debug!(count, "initial history generated");
        candles
    }
}
