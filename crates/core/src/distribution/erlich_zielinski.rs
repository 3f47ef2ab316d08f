//! Distribution Robust Soliton paramétrée à la Erlich-Zielinski
//!
//! Variante (c, delta) du Robust Soliton utilisée par DNA Fountain
//! (Science 2017) : la pointe est placée à round(K/s) avec
//! s = c * sqrt(K) * ln²(K/delta).

use crate::distribution::{cumulative, draw_degree, normalize};
use crate::error::{FountainError, Result};

#[derive(Debug, Clone)]
pub struct ErlichZielinskiDistribution {
    number_of_chunks: usize,
    c: f64,
    delta: f64,
    cumulative: Vec<f64>,
}

impl ErlichZielinskiDistribution {
    pub fn new(number_of_chunks: usize, c: f64, delta: f64) -> Result<Self> {
        if number_of_chunks < 2 {
            return Err(FountainError::InvalidDistribution(format!(
                "Erlich-Zielinski exige K >= 2, reçu {}",
                number_of_chunks
            )));
        }
        if c <= 0.0 || delta <= 0.0 || delta >= 1.0 {
            return Err(FountainError::InvalidDistribution(format!(
                "paramètres Erlich-Zielinski invalides (c={}, delta={})",
                c, delta
            )));
        }
        Ok(Self {
            number_of_chunks,
            c,
            delta,
            cumulative: cumulative(&normalize(&Self::pre_compute(number_of_chunks, c, delta))),
        })
    }

    /// Paramètres recommandés par le papier : c = 0.025, delta = 0.001
    pub fn with_paper_parameters(number_of_chunks: usize) -> Result<Self> {
        Self::new(number_of_chunks, 0.025, 0.001)
    }

    fn ideal(n: usize) -> Vec<f64> {
        let mut dist = vec![1.0 / n as f64];
        for d in 2..n {
            dist.push(1.0 / (d as f64 * (d as f64 - 1.0)));
        }
        dist
    }

    fn robust(k: usize, c: f64, delta: f64) -> Vec<f64> {
        let kf = k as f64;
        let s = c * kf.sqrt() * (kf / delta).ln().powi(2);
        let lim = (kf / s).round() as usize;
        let mut dist: Vec<f64> = (1..lim.max(1)).map(|d| s / (kf * d as f64)).collect();
        dist.push(s * (s / delta).ln() / kf);
        dist.resize(k.saturating_sub(1), 0.0);
        dist
    }

    fn pre_compute(k: usize, c: f64, delta: f64) -> Vec<f64> {
        Self::ideal(k)
            .iter()
            .zip(Self::robust(k, c, delta))
            .map(|(a, b)| a + b)
            .collect()
    }

    pub fn sample(&self, seed: u64) -> usize {
        draw_degree(&self.cumulative, seed)
    }

    pub fn size(&self) -> usize {
        self.number_of_chunks
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn update_number_of_chunks(&mut self, number_of_chunks: usize) {
        self.number_of_chunks = number_of_chunks;
        self.cumulative = cumulative(&normalize(&Self::pre_compute(
            number_of_chunks,
            self.c,
            self.delta,
        )));
    }
}
