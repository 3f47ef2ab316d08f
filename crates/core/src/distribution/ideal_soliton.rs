//! Distribution Ideal Soliton
//!
//! P(1) = 1/N, P(d) = 1/(d(d-1)) pour d >= 2. Forme théorique de Luby,
//! fragile en pratique (un seul paquet de degré 1 attendu en moyenne).

use crate::distribution::{cumulative, draw_degree, normalize};
use crate::error::{FountainError, Result};

#[derive(Debug, Clone)]
pub struct IdealSolitonDistribution {
    number_of_chunks: usize,
    cumulative: Vec<f64>,
}

impl IdealSolitonDistribution {
    pub fn new(number_of_chunks: usize) -> Result<Self> {
        if number_of_chunks < 2 {
            return Err(FountainError::InvalidDistribution(format!(
                "Ideal Soliton exige N >= 2, reçu {}",
                number_of_chunks
            )));
        }
        Ok(Self {
            number_of_chunks,
            cumulative: cumulative(&normalize(&Self::pre_compute(number_of_chunks))),
        })
    }

    /// Table sur les degrés 1..N-1
    fn pre_compute(n: usize) -> Vec<f64> {
        let mut dist = Vec::with_capacity(n - 1);
        dist.push(1.0 / n as f64);
        for d in 2..n {
            dist.push(1.0 / (d as f64 * (d as f64 - 1.0)));
        }
        dist
    }

    pub fn sample(&self, seed: u64) -> usize {
        draw_degree(&self.cumulative, seed)
    }

    pub fn size(&self) -> usize {
        self.number_of_chunks
    }

    pub fn update_number_of_chunks(&mut self, number_of_chunks: usize) {
        self.number_of_chunks = number_of_chunks;
        self.cumulative = cumulative(&normalize(&Self::pre_compute(number_of_chunks)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_too_small() {
        assert!(IdealSolitonDistribution::new(0).is_err());
        assert!(IdealSolitonDistribution::new(1).is_err());
    }

    #[test]
    fn test_degree_within_bounds() {
        let dist = IdealSolitonDistribution::new(20).unwrap();
        for seed in 0..500u64 {
            let d = dist.sample(seed);
            assert!(d >= 1 && d < 20);
        }
    }

    #[test]
    fn test_sample_reproducible() {
        let dist = IdealSolitonDistribution::new(20).unwrap();
        let other = IdealSolitonDistribution::new(20).unwrap();
        for seed in 0..50u64 {
            assert_eq!(dist.sample(seed), other.sample(seed));
        }
    }

    #[test]
    fn test_update_number_of_chunks() {
        let mut dist = IdealSolitonDistribution::new(10).unwrap();
        dist.update_number_of_chunks(11);
        assert_eq!(dist.size(), 11);
        for seed in 0..100u64 {
            assert!(dist.sample(seed) < 11);
        }
    }
}
