//! Distributions de degré pour les codes fontaine
//!
//! Chaque distribution précalcule sa table de probabilités à la
//! construction et échantillonne avec un générateur local construit
//! à partir de la seule graine fournie : un même couple
//! (paramètres, graine) produit le même degré sur l'encodeur et le
//! décodeur, quel que soit le processus.

pub mod erlich_zielinski;
pub mod ideal_soliton;
pub mod online;
pub mod raptor;
pub mod robust_soliton;

pub use erlich_zielinski::ErlichZielinskiDistribution;
pub use ideal_soliton::IdealSolitonDistribution;
pub use online::OnlineDistribution;
pub use raptor::RaptorDistribution;
pub use robust_soliton::RobustSolitonDistribution;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Distribution de degré, choisie à la construction de l'encodeur
#[derive(Debug, Clone)]
pub enum Distribution {
    IdealSoliton(IdealSolitonDistribution),
    RobustSoliton(RobustSolitonDistribution),
    ErlichZielinski(ErlichZielinskiDistribution),
    Raptor(RaptorDistribution),
    Online(OnlineDistribution),
}

impl Distribution {
    /// Tire un degré à partir d'une graine
    pub fn sample(&self, seed: u64) -> usize {
        match self {
            Distribution::IdealSoliton(d) => d.sample(seed),
            Distribution::RobustSoliton(d) => d.sample(seed),
            Distribution::ErlichZielinski(d) => d.sample(seed),
            Distribution::Raptor(d) => d.sample(seed),
            Distribution::Online(d) => d.sample(seed),
        }
    }

    /// Taille de la population couverte par la table
    pub fn size(&self) -> usize {
        match self {
            Distribution::IdealSoliton(d) => d.size(),
            Distribution::RobustSoliton(d) => d.size(),
            Distribution::ErlichZielinski(d) => d.size(),
            Distribution::Raptor(d) => d.size(),
            Distribution::Online(d) => d.size(),
        }
    }

    /// Recalcule la table pour un nouveau nombre de chunks
    ///
    /// Nécessaire quand l'insertion du chunk d'en-tête décale N après la
    /// construction de la distribution. Sans effet pour Raptor (table
    /// empirique fixe) et Online (taille dérivée d'epsilon seul).
    pub fn update_number_of_chunks(&mut self, number_of_chunks: usize) {
        match self {
            Distribution::IdealSoliton(d) => d.update_number_of_chunks(number_of_chunks),
            Distribution::RobustSoliton(d) => d.update_number_of_chunks(number_of_chunks),
            Distribution::ErlichZielinski(d) => d.update_number_of_chunks(number_of_chunks),
            Distribution::Raptor(d) => d.update_number_of_chunks(number_of_chunks),
            Distribution::Online(_) => {}
        }
    }

    /// Identifiant de configuration, utilisé dans les journaux
    pub fn config_string(&self) -> String {
        match self {
            Distribution::IdealSoliton(_) => "LT_IdealSoliton".to_string(),
            Distribution::RobustSoliton(d) => {
                format!("LT_RobustSoliton_K={}_delta={}", d.spike(), d.delta())
            }
            Distribution::ErlichZielinski(d) => format!(
                "LT_ErlichZielinskiRobustSoliton_K={}_delta={}_c={}",
                d.size(),
                d.delta(),
                d.c()
            ),
            Distribution::Raptor(_) => "RU10_Raptor".to_string(),
            Distribution::Online(d) => format!("Online_eps={}", d.epsilon()),
        }
    }
}

/// Normalise une table de probabilités (somme = 1)
pub(crate) fn normalize(dist: &[f64]) -> Vec<f64> {
    let total: f64 = dist.iter().sum();
    dist.iter().map(|p| p / total).collect()
}

/// Table cumulative à partir d'une table normalisée
pub(crate) fn cumulative(probs: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    probs
        .iter()
        .map(|p| {
            acc += p;
            acc
        })
        .collect()
}

/// Tire un degré (1-indexé) depuis la table cumulative avec un générateur
/// frais construit de la graine. Jamais d'état partagé entre appels.
pub(crate) fn draw_degree(cumulative: &[f64], seed: u64) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let u: f64 = rng.gen();
    for (i, bound) in cumulative.iter().enumerate() {
        if u < *bound {
            return i + 1;
        }
    }
    cumulative.len()
}
