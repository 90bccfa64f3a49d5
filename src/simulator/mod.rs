//! Synthetic market feed.
//!
//! A seeded stochastic process with event-driven impulses, producing base
//! candles for the time-series store.

mod config;
mod event;
mod market;
mod sampler;

pub use config::{SimulatorConfig, DEFAULT_START_TIME};
pub use event::{combine_impulses, Impulse, ImpulseBoost, ScheduledEvent, IMPULSE_PRUNE_WEIGHT};
pub use market::{MarketSimulator, SimulatorState, MAX_STEPS_PER_TICK};
pub use sampler::GaussianSampler;
