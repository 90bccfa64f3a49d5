//! Scheduled market events and their decaying impulses.

use serde::{Deserialize, Serialize};

use crate::trader::EventMarker;

/// Impulses whose weight falls below this are dropped
pub const IMPULSE_PRUNE_WEIGHT: f64 = 0.01;

/// A market event waiting in the simulator's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledEvent {
    pub id: String,
    pub time: i64,
    pub title: String,
    pub subtitle: String,
    /// Added to the per-step drift at full weight
    pub drift: f64,
    /// Relative volatility boost at full weight
    pub volatility: f64,
    /// Relative volume boost at full weight
    pub volume: f64,
    /// Time constant of the exponential decay
    pub decay_ms: f64,
}

impl ScheduledEvent {
    pub fn new(
        id: impl Into<String>,
        time: i64,
        title: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            time,
            title: title.into(),
            subtitle: subtitle.into(),
            drift: 0.0,
            volatility: 0.0,
            volume: 0.0,
            decay_ms: 10.0 * 60_000.0,
        }
    }

    pub fn with_drift(mut self, drift: f64) -> Self {
        self.drift = drift;
        self
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_decay_ms(mut self, decay_ms: f64) -> Self {
        self.decay_ms = decay_ms;
        self
    }

    /// Chart marker shown once the event fires
    pub fn to_marker(&self) -> EventMarker {
        EventMarker::new(&self.id, &self.title, &self.subtitle, self.time)
    }
}

/// Summed contribution of every active impulse at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImpulseBoost {
    pub drift: f64,
    pub volatility: f64,
    pub volume: f64,
}

/// An activated event
#[derive(Debug, Clone, PartialEq)]
pub struct Impulse {
    pub event: ScheduledEvent,
    pub started_at: i64,
}

impl Impulse {
    pub fn new(event: ScheduledEvent, started_at: i64) -> Self {
        Self { event, started_at }
    }

    /// `exp(-elapsed / decay)`, full weight before the start
    pub fn weight(&self, now: i64) -> f64 {
        let elapsed = (now - self.started_at).max(0) as f64;
        if self.event.decay_ms <= 0.0 {
            return if elapsed == 0.0 { 1.0 } else { 0.0 };
        }
        (-elapsed / self.event.decay_ms).exp()
    }
}

/// Superpose every impulse at `now` and drop the faded ones
pub fn combine_impulses(impulses: &mut Vec<Impulse>, now: i64) -> ImpulseBoost {
    let mut boost = ImpulseBoost::default();
    impulses.retain(|impulse| {
        let weight = impulse.weight(now);
        if weight < IMPULSE_PRUNE_WEIGHT {
            return false;
        }
        boost.drift += impulse.event.drift * weight;
        boost.volatility += impulse.event.volatility * weight;
        boost.volume += impulse.event.volume * weight;
        true
    });
    boost
}
