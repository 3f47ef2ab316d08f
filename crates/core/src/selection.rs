//! Sélection déterministe des chunks
//!
//! Tout tirage part d'un générateur local construit de la seule graine
//! fournie : l'encodeur et le décodeur doivent reproduire exactement les
//! mêmes ensembles d'indices sans rien se transmettre d'autre que la
//! graine. Aucun générateur global, aucun état partagé entre appels.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use fontaine_utils::{build_gray_sequence, center_binomial, smallest_prime_ge};

use crate::distribution::RaptorDistribution;
use crate::error::{FountainError, Result};

/// Tire `degree` indices distincts de 0..population par rejet
///
/// Même algorithme des deux côtés du fil : tirage uniforme, rejet des
/// doublons jusqu'à obtention du degré demandé.
pub fn choose_chunk_indices(
    population: usize,
    degree: usize,
    seed: u64,
) -> Result<BTreeSet<usize>> {
    if degree > population {
        return Err(FountainError::DegreeOutOfRange { degree, population });
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut chosen = BTreeSet::new();
    while chosen.len() < degree {
        let mut candidate = rng.gen_range(0..population);
        while chosen.contains(&candidate) {
            candidate = rng.gen_range(0..population);
        }
        chosen.insert(candidate);
    }
    Ok(chosen)
}

/// Paramètres des symboles intermédiaires RU10 pour K chunks source
///
/// Retourne (L, S, H) : L = K + S + H est la taille du tableau étendu
/// que le tirage des paquets échantillonne réellement. S est le plus
/// petit premier >= ceil(0.01 K) + X où X est le plus petit entier tel
/// que X(X-1) >= 2K ; H part de floor(log4(S + K)) et croît jusqu'à ce
/// que C(H, ceil(H/2)) >= K + S.
pub fn intermediate_symbols(k: usize) -> (usize, usize, usize) {
    let mut x = (2.0 * k as f64).sqrt().floor() as usize;
    if x < 1 {
        x = 1;
    }
    while x * (x - 1) < 2 * k {
        x += 1;
    }
    let s = smallest_prime_ge(((0.01 * k as f64).ceil() as usize + x) as u64) as usize;
    let mut h = (((s + k) as f64).ln() / 4f64.ln()).floor() as u64;
    while center_binomial(h) < (k + s) as u64 {
        h += 1;
    }
    let h = h as usize;
    (k + s + h, s, h)
}

/// Triplet (degré, a, b) dérivé de la graine d'un paquet RU10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ru10Triple {
    pub degree: usize,
    pub a: u64,
    pub b: u64,
}

fn r_int31(rng: &mut ChaCha8Rng) -> u64 {
    rng.gen_range(0..0x7FFF_FFFFu32) as u64
}

/// Génère le triplet RU10 d'une graine (générateur local, jamais partagé)
pub fn ru10_triple(number_of_chunks: usize, seed: u64) -> Ru10Triple {
    let (l, _, _) = intermediate_symbols(number_of_chunks);
    let lprime = smallest_prime_ge(l as u64);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let v = (r_int31(&mut rng) % 1_048_576) as u32;
    let a = 1 + r_int31(&mut rng) % (lprime - 1);
    let b = r_int31(&mut rng) % lprime;
    Ru10Triple {
        degree: RaptorDistribution::deg(v),
        a,
        b,
    }
}

/// Indices du tableau étendu (chunks ‖ LDPC ‖ demi-blocs) pour un paquet
/// RU10 de graine donnée. Identique sur l'encodeur et le décodeur.
pub fn choose_ru10_indices(number_of_chunks: usize, seed: u64) -> BTreeSet<usize> {
    let (l, _, _) = intermediate_symbols(number_of_chunks);
    let lprime = smallest_prime_ge(l as u64);
    let Ru10Triple { degree, a, mut b } = ru10_triple(number_of_chunks, seed);
    let degree = degree.min(l);

    let mut indices = BTreeSet::new();
    while b >= l as u64 {
        b = (b + a) % lprime;
    }
    indices.insert(b as usize);
    for _ in 1..degree {
        b = (b + a) % lprime;
        while b >= l as u64 {
            b = (b + a) % lprime;
        }
        indices.insert(b as usize);
    }
    indices
}

/// Compositions des blocs LDPC et demi-blocs RU10
///
/// Retourne, dans l'ordre de construction, l'appartenance de chaque bloc :
/// d'abord les S blocs LDPC (indices de chunks), puis les H demi-blocs
/// (indices dans chunks ‖ LDPC). Chaque chunk i est versé trois fois dans
/// les blocs LDPC (b = i mod S puis deux sauts de a = 1 + ((i div S) mod
/// (S-1))) ; les demi-blocs suivent la séquence de Gray de longueur K+S
/// dont les codes ont exactement ceil(H/2) bits à 1.
pub fn ru10_block_compositions(number_of_chunks: usize) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let k = number_of_chunks;
    let (_, s, h) = intermediate_symbols(k);

    let mut ldpc: Vec<Vec<usize>> = vec![Vec::new(); s];
    for i in 0..k {
        let a = 1 + ((i / s) % (s - 1));
        let mut b = i % s;
        ldpc[b].push(i);
        b = (b + a) % s;
        ldpc[b].push(i);
        b = (b + a) % s;
        ldpc[b].push(i);
    }

    let hprime = h.div_ceil(2) as u32;
    let gray = build_gray_sequence(k + s, hprime);
    let mut half: Vec<Vec<usize>> = vec![Vec::new(); h];
    for (j, composition) in half.iter_mut().enumerate() {
        for (i, code) in gray.iter().enumerate() {
            if (code >> j) & 1 == 1 {
                composition.push(i);
            }
        }
    }
    (ldpc, half)
}

/// Nombre de blocs auxiliaires du code Online
pub fn online_aux_count(number_of_chunks: usize, quality: u32, epsilon: f64) -> usize {
    (0.55 * quality as f64 * epsilon * number_of_chunks as f64).ceil() as usize
}

/// Appartenance des blocs auxiliaires Online, dérivée de N seul
///
/// Générateur semé par le nombre de chunks : chaque chunk est versé dans
/// `quality` blocs auxiliaires tirés uniformément (doublons possibles,
/// l'appartenance est un ensemble).
pub fn online_aux_membership(
    number_of_chunks: usize,
    quality: u32,
    aux_count: usize,
) -> Vec<BTreeSet<usize>> {
    let mut membership = vec![BTreeSet::new(); aux_count];
    if aux_count == 0 {
        return membership;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(number_of_chunks as u64);
    for chunk in 0..number_of_chunks {
        for _ in 0..quality {
            let aux = rng.gen_range(0..aux_count);
            membership[aux].insert(chunk);
        }
    }
    membership
}
