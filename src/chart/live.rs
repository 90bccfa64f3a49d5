//! Smoothed presentation of the most recent bar.
//!
//! The data layer replaces the last candle in discrete jumps. The chart eases
//! the displayed OHLC toward those targets with `factor = 1 - exp(-dt * rate)`
//! so motion stays continuous between updates.

use std::f64::consts::TAU;

use crate::trader::Candle;

/// Radians per second of the glow cycle
pub const GLOW_SPEED: f64 = 2.4;

/// Largest frame delta fed to the filter, in seconds
const MAX_STEP: f64 = 0.25;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveCandle {
    rate: f64,
    target: Option<Candle>,
    display: Option<Candle>,
    /// Residual below which a field snaps onto its target
    epsilon: f64,
    glow_phase: f64,
}

impl Default for LiveCandle {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl LiveCandle {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.max(0.0),
            target: None,
            display: None,
            epsilon: 1e-9,
            glow_phase: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.target = None;
        self.display = None;
    }

    /// Point the filter at the latest candle. A new bar time restarts the
    /// display from the bar's open.
    pub fn set_target(&mut self, candle: Candle, min_movement: f64) {
        self.epsilon = (min_movement * 0.05).max(1e-12);
        match self.display {
            Some(display) if display.time == candle.time => {}
            _ => self.display = Some(Candle::flat(candle.time, candle.open)),
        }
        self.target = Some(candle);
    }

    /// Advance the filter by `dt` seconds. Returns true while unconverged.
    pub fn advance(&mut self, dt: f64) -> bool {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_STEP) } else { 0.0 };
        self.glow_phase = (self.glow_phase + dt * GLOW_SPEED) % TAU;

        let (Some(target), Some(display)) = (self.target, self.display.as_mut()) else {
            return false;
        };

        let factor = if self.rate > 0.0 { 1.0 - (-dt * self.rate).exp() } else { 1.0 };
        let epsilon = self.epsilon;
        let mut moving = false;
        for (current, goal) in [
            (&mut display.open, target.open),
            (&mut display.high, target.high),
            (&mut display.low, target.low),
            (&mut display.close, target.close),
            (&mut display.volume, target.volume),
        ] {
            let residual = goal - *current;
            if residual.abs() <= epsilon {
                *current = goal;
            } else {
                *current += residual * factor;
                moving = true;
            }
        }
        *display = display.normalized();
        moving
    }

    pub fn is_animating(&self) -> bool {
        match (self.target, self.display) {
            (Some(target), Some(display)) => target != display,
            _ => false,
        }
    }

    /// Candle to draw in place of the last bar
    pub fn display(&self) -> Option<Candle> {
        self.display
    }

    pub fn target(&self) -> Option<Candle> {
        self.target
    }

    /// Glow intensity in `[0, 1]`
    pub fn glow(&self) -> f32 {
        (0.5 + 0.5 * self.glow_phase.sin()) as f32
    }
}
