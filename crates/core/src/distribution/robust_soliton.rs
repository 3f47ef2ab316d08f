//! Distribution Robust Soliton
//!
//! Soliton idéal plus un terme de pointe paramétré par (K, delta) qui
//! concentre de la masse près du degré N/K, normalisé ensuite.

use crate::distribution::{cumulative, draw_degree, normalize};
use crate::error::{FountainError, Result};

#[derive(Debug, Clone)]
pub struct RobustSolitonDistribution {
    number_of_chunks: usize,
    spike: usize,
    delta: f64,
    cumulative: Vec<f64>,
}

impl RobustSolitonDistribution {
    /// `spike` borne la position du pic (degré N/spike), `delta` est la
    /// probabilité d'échec visée du décodage par propagation.
    pub fn new(number_of_chunks: usize, spike: usize, delta: f64) -> Result<Self> {
        if number_of_chunks < 2 {
            return Err(FountainError::InvalidDistribution(format!(
                "Robust Soliton exige N >= 2, reçu {}",
                number_of_chunks
            )));
        }
        if spike == 0 || delta <= 0.0 || delta > 1.0 {
            return Err(FountainError::InvalidDistribution(format!(
                "paramètres Robust Soliton invalides (K={}, delta={})",
                spike, delta
            )));
        }
        Ok(Self {
            number_of_chunks,
            spike,
            delta,
            cumulative: cumulative(&normalize(&Self::pre_compute(
                number_of_chunks,
                spike,
                delta,
            ))),
        })
    }

    fn ideal(n: usize) -> Vec<f64> {
        let mut dist = vec![1.0 / n as f64];
        for d in 2..n {
            dist.push(1.0 / (d as f64 * (d as f64 - 1.0)));
        }
        dist
    }

    fn robust(n: usize, k: usize, delta: f64) -> Vec<f64> {
        let r = n as f64 / k as f64;
        let mut dist: Vec<f64> = (1..k).map(|d| 1.0 / (d as f64 * k as f64)).collect();
        dist.push((r / delta).ln() / k as f64);
        dist.resize(n.saturating_sub(1), 0.0);
        dist
    }

    fn pre_compute(n: usize, k: usize, delta: f64) -> Vec<f64> {
        // somme terme à terme, tronquée à la plus courte des deux tables
        Self::ideal(n)
            .iter()
            .zip(Self::robust(n, k, delta))
            .map(|(a, b)| a + b)
            .collect()
    }

    pub fn sample(&self, seed: u64) -> usize {
        draw_degree(&self.cumulative, seed)
    }

    pub fn size(&self) -> usize {
        self.number_of_chunks
    }

    pub fn spike(&self) -> usize {
        self.spike
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn update_number_of_chunks(&mut self, number_of_chunks: usize) {
        self.number_of_chunks = number_of_chunks;
        self.cumulative = cumulative(&normalize(&Self::pre_compute(
            number_of_chunks,
            self.spike,
            self.delta,
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(RobustSolitonDistribution::new(1, 4, 0.5).is_err());
        assert!(RobustSolitonDistribution::new(10, 0, 0.5).is_err());
        assert!(RobustSolitonDistribution::new(10, 4, 0.0).is_err());
        assert!(RobustSolitonDistribution::new(10, 4, 1.5).is_err());
    }

    #[test]
    fn test_degree_within_bounds() {
        let dist = RobustSolitonDistribution::new(32, 8, 0.5).unwrap();
        for seed in 0..500u64 {
            let d = dist.sample(seed);
            assert!(d >= 1 && d < 32);
        }
    }

    #[test]
    fn test_spike_raises_low_degree_mass() {
        // Le terme de pointe doit produire plus de degrés 1 que le soliton
        // idéal seul sur le même support.
        let robust = RobustSolitonDistribution::new(64, 16, 0.1).unwrap();
        let ideal = crate::distribution::IdealSolitonDistribution::new(64).unwrap();
        let count = |f: &dyn Fn(u64) -> usize| (0..2000u64).filter(|s| f(*s) == 1).count();
        let robust_ones = count(&|s| robust.sample(s));
        let ideal_ones = count(&|s| ideal.sample(s));
        assert!(robust_ones > ideal_ones);
    }
}
