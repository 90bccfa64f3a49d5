//! Seeded normal sampler.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Standard normal samples from a Box-Muller transform over a seeded RNG.
/// Each transform yields two samples; the second is kept for the next call.
#[derive(Debug, Clone)]
pub struct GaussianSampler {
    rng: StdRng,
    spare: Option<f64>,
}

impl GaussianSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Uniform sample in `[0, 1)`
    pub fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Standard normal sample
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(spare) = self.spare.take() {
            return spare;
        }

        // u1 in (0, 1] keeps ln finite
        let u1 = 1.0 - self.rng.random::<f64>();
        let u2 = self.rng.random::<f64>();
        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = std::f64::consts::TAU * u2;

        self.spare = Some(radius * theta.sin());
        radius * theta.cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_samples() {
        let mut a = GaussianSampler::new(7);
        let mut b = GaussianSampler::new(7);
        for _ in 0..100 {
            assert_eq!(a.next_gaussian().to_bits(), b.next_gaussian().to_bits());
        }
    }

    #[test]
    fn test_moments_are_roughly_standard() {
        let mut sampler = GaussianSampler::new(42);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| sampler.next_gaussian()).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((variance - 1.0).abs() < 0.05, "variance {}", variance);
        assert!(samples.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_uniform_range() {
        let mut sampler = GaussianSampler::new(1);
        for _ in 0..1000 {
            let u = sampler.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }
}
