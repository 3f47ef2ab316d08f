//! Distribution de degré Raptor (table empirique fixe)
//!
//! Table cumulative de la RFC 5053 : un tirage v dans [0, 2^20) est
//! projeté sur un degré de {1, 2, 3, 4, 10, 11, 40}. Pas de formule
//! fermée, la table EST la spécification.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{FountainError, Result};

/// Bornes cumulées de la table (sur 2^20)
const F: [u32; 8] = [0, 10_241, 491_582, 712_794, 831_695, 948_446, 1_032_189, 1_048_576];
/// Degrés associés à chaque intervalle
const D: [usize; 8] = [0, 1, 2, 3, 4, 10, 11, 40];

/// Degré maximal que la table peut produire
pub const MAX_DEGREE: usize = 40;

#[derive(Debug, Clone)]
pub struct RaptorDistribution {
    number_of_chunks: usize,
}

impl RaptorDistribution {
    pub fn new(number_of_chunks: usize) -> Result<Self> {
        if number_of_chunks == 0 {
            return Err(FountainError::InvalidDistribution(
                "Raptor exige N >= 1".to_string(),
            ));
        }
        Ok(Self { number_of_chunks })
    }

    /// Projette un tirage v de [0, 2^20) sur son degré
    pub fn deg(v: u32) -> usize {
        debug_assert!(v < F[7]);
        for j in 1..F.len() {
            if v < F[j] {
                return D[j];
            }
        }
        D[7]
    }

    pub fn sample(&self, seed: u64) -> usize {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let v = rng.gen_range(0..F[7]);
        Self::deg(v)
    }

    pub fn size(&self) -> usize {
        self.number_of_chunks
    }

    pub fn update_number_of_chunks(&mut self, number_of_chunks: usize) {
        self.number_of_chunks = number_of_chunks;
    }
}
