//! Reed-Solomon en domaine ADN : symboles 2 bits de GF(4)
//!
//! Chaque base du médium (A/C/G/T) porte un symbole de GF(4)
//! (polynôme primitif x² + x + 1), si bien qu'une mutation d'une base
//! est exactement une erreur d'un symbole. La longueur de mot est donc
//! 2² - 1 = 3 symboles : les octets du payload sont éclatés en symboles
//! 2 bits puis codés par blocs de (3 - repair_symbols) symboles de
//! données. La forme empaquetée stocke un symbole par octet (valeurs
//! 0..=3), prête pour le transcodage base-par-base.

use crate::error::{FountainError, Result};

/// Longueur de mot : 2^2 - 1 symboles
const BLOCK_SIZE: usize = 3;

/// Table exponentielle de GF(4), période 3 (alpha = 2)
const EXP: [u8; 3] = [1, 2, 3];
/// Table logarithmique (log[0] est invalide)
const LOG: [u8; 4] = [0xFF, 0, 1, 2];

fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    EXP[((LOG[a as usize] + LOG[b as usize]) % 3) as usize]
}

fn gf_div(a: u8, b: u8) -> u8 {
    debug_assert!(b != 0);
    if a == 0 {
        return 0;
    }
    EXP[((LOG[a as usize] + 3 - LOG[b as usize]) % 3) as usize]
}

/// Évalue un polynôme (coefficient dominant en tête) en x
fn poly_eval(poly: &[u8], x: u8) -> u8 {
    poly.iter().fold(0, |acc, c| gf_mul(acc, x) ^ c)
}

pub struct DnaReedSolomon {
    repair_symbols: usize,
    /// Polynôme générateur, coefficient dominant en tête
    generator: Vec<u8>,
}

impl DnaReedSolomon {
    pub fn new(repair_symbols: usize) -> Result<Self> {
        if repair_symbols == 0 || repair_symbols >= BLOCK_SIZE {
            return Err(FountainError::Correction(format!(
                "Reed-Solomon ADN: repair_symbols doit être dans 1..{}, reçu {}",
                BLOCK_SIZE, repair_symbols
            )));
        }
        // g(x) = produit des (x - alpha^j) pour j = 0..repair_symbols-1
        let mut generator = vec![1u8];
        for j in 0..repair_symbols {
            let root = EXP[j % 3];
            let mut next = vec![0u8; generator.len() + 1];
            for (i, c) in generator.iter().enumerate() {
                next[i] ^= *c;
                next[i + 1] ^= gf_mul(*c, root);
            }
            generator = next;
        }
        Ok(Self {
            repair_symbols,
            generator,
        })
    }

    fn data_per_block(&self) -> usize {
        BLOCK_SIZE - self.repair_symbols
    }

    /// Éclate les octets en symboles 2 bits, poids forts en premier
    fn bytes_to_symbols(payload: &[u8]) -> Vec<u8> {
        let mut symbols = Vec::with_capacity(payload.len() * 4);
        for byte in payload {
            symbols.push(byte >> 6);
            symbols.push((byte >> 4) & 0b11);
            symbols.push((byte >> 2) & 0b11);
            symbols.push(byte & 0b11);
        }
        symbols
    }

    fn symbols_to_bytes(symbols: &[u8]) -> Result<Vec<u8>> {
        if symbols.len() % 4 != 0 {
            return Err(FountainError::CorruptPacket(format!(
                "nombre de symboles non multiple de 4: {}",
                symbols.len()
            )));
        }
        Ok(symbols
            .chunks(4)
            .map(|q| (q[0] << 6) | (q[1] << 4) | (q[2] << 2) | q[3])
            .collect())
    }

    /// Encode le payload ; retourne un symbole de GF(4) par octet
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let symbols = Self::bytes_to_symbols(payload);
        let mut out = Vec::with_capacity(symbols.len() / self.data_per_block() * BLOCK_SIZE);
        for data in symbols.chunks(self.data_per_block()) {
            // division polynomiale : data * x^repair mod g
            let mut block = data.to_vec();
            block.resize(data.len() + self.repair_symbols, 0);
            for i in 0..data.len() {
                let coef = block[i];
                if coef != 0 {
                    for (j, g) in self.generator.iter().enumerate().skip(1) {
                        block[i + j] ^= gf_mul(*g, coef);
                    }
                }
            }
            block[..data.len()].copy_from_slice(data);
            out.extend_from_slice(&block);
        }
        Ok(out)
    }

    /// Décode une suite de symboles ; corrige une erreur de symbole par
    /// bloc quand repair_symbols = 2, détecte seulement quand = 1.
    pub fn decode(&self, packed: &[u8]) -> Result<Vec<u8>> {
        if packed.is_empty() || packed.len() % BLOCK_SIZE != 0 {
            return Err(FountainError::CorruptPacket(format!(
                "longueur de flux Reed-Solomon ADN invalide: {}",
                packed.len()
            )));
        }
        if let Some(bad) = packed.iter().find(|s| **s > 3) {
            return Err(FountainError::CorruptPacket(format!(
                "symbole hors de GF(4): {}",
                bad
            )));
        }
        let mut data_symbols = Vec::with_capacity(packed.len() / BLOCK_SIZE * self.data_per_block());
        for chunk in packed.chunks(BLOCK_SIZE) {
            let mut block = chunk.to_vec();
            self.correct_block(&mut block)?;
            data_symbols.extend_from_slice(&block[..self.data_per_block()]);
        }
        Self::symbols_to_bytes(&data_symbols)
    }

    fn correct_block(&self, block: &mut [u8]) -> Result<()> {
        let syndromes: Vec<u8> = (0..self.repair_symbols)
            .map(|j| poly_eval(block, EXP[j % 3]))
            .collect();
        if syndromes.iter().all(|s| *s == 0) {
            return Ok(());
        }
        if self.repair_symbols < 2 {
            // un seul symbole de parité : détection sans localisation
            return Err(FountainError::CorruptPacket(
                "Reed-Solomon ADN: syndrome non nul, bloc irréparable".to_string(),
            ));
        }
        // erreur simple e en position p (exposant depuis la droite) :
        // s0 = e, s1 = e * alpha^p
        let e = syndromes[0];
        if e == 0 {
            return Err(FountainError::CorruptPacket(
                "Reed-Solomon ADN: syndromes incohérents, plus d'une erreur".to_string(),
            ));
        }
        let p = LOG[gf_div(syndromes[1], e) as usize] as usize;
        if p >= block.len() {
            return Err(FountainError::CorruptPacket(
                "Reed-Solomon ADN: position d'erreur hors du bloc".to_string(),
            ));
        }
        let idx = block.len() - 1 - p;
        block[idx] ^= e;
        Ok(())
    }
}
