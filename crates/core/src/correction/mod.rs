//! Codecs de correction/détection d'erreurs par paquet
//!
//! Stratégie choisie à la construction de l'encodeur/décodeur : aucun
//! code, CRC-32 (détection seule), Reed-Solomon en domaine octet, ou
//! Reed-Solomon en domaine ADN (symboles 2 bits de GF(4)).
//! L'échec d'un `decode` signale un paquet corrompu, jamais une panique.

pub mod crc32;
pub mod dna_reed_solomon;

pub use crc32::Crc32;
pub use dna_reed_solomon::DnaReedSolomon;

use serde::{Deserialize, Serialize};

use crate::error::{FountainError, Result};

/// Taille d'un bloc Reed-Solomon en domaine octet (GF(2^8))
const RS_BLOCK_SIZE: usize = 255;

/// Stratégie de correction d'erreurs appliquée au paquet empaqueté
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ErrorCorrection {
    /// Aucun code : le payload passe tel quel
    #[default]
    Nocode,
    /// CRC-32 en queue de paquet : détection sans réparation
    Crc32,
    /// Reed-Solomon sur octets : corrige jusqu'à repair_symbols/2 erreurs
    /// par bloc de 255 octets
    ReedSolomon { repair_symbols: usize },
    /// Reed-Solomon sur symboles 2 bits (une base ADN = un symbole)
    DnaReedSolomon { repair_symbols: usize },
}

impl ErrorCorrection {
    /// Enveloppe le payload avec le code choisi
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>> {
        match self {
            ErrorCorrection::Nocode => Ok(payload.to_vec()),
            ErrorCorrection::Crc32 => Ok(Crc32::default().append(payload)),
            ErrorCorrection::ReedSolomon { repair_symbols } => {
                rs_byte_encode(payload, *repair_symbols)
            }
            ErrorCorrection::DnaReedSolomon { repair_symbols } => {
                DnaReedSolomon::new(*repair_symbols)?.encode(payload)
            }
        }
    }

    /// Vérifie/répare et retire le code ; un échec est un paquet corrompu
    pub fn decode(&self, packed: &[u8]) -> Result<Vec<u8>> {
        match self {
            ErrorCorrection::Nocode => Ok(packed.to_vec()),
            ErrorCorrection::Crc32 => Crc32::default().strip(packed),
            ErrorCorrection::ReedSolomon { repair_symbols } => {
                rs_byte_decode(packed, *repair_symbols)
            }
            ErrorCorrection::DnaReedSolomon { repair_symbols } => {
                DnaReedSolomon::new(*repair_symbols)?.decode(packed)
            }
        }
    }

    /// Vrai si la forme empaquetée est une suite de symboles 2 bits
    /// (un symbole par octet) destinée au transcodage base-par-base.
    pub fn is_dna_domain(&self) -> bool {
        matches!(self, ErrorCorrection::DnaReedSolomon { .. })
    }

    /// Nom court pour les journaux et configurations
    pub fn config_name(&self) -> &'static str {
        match self {
            ErrorCorrection::Nocode => "nocode",
            ErrorCorrection::Crc32 => "crc32",
            ErrorCorrection::ReedSolomon { .. } => "reedsolomon",
            ErrorCorrection::DnaReedSolomon { .. } => "dna_reedsolomon",
        }
    }
}

/// Encode par blocs de (255 - repair_symbols) octets de données
fn rs_byte_encode(payload: &[u8], repair_symbols: usize) -> Result<Vec<u8>> {
    if repair_symbols == 0 || repair_symbols >= RS_BLOCK_SIZE {
        return Err(FountainError::Correction(format!(
            "nombre de symboles de réparation invalide: {}",
            repair_symbols
        )));
    }
    let encoder = reed_solomon::Encoder::new(repair_symbols);
    let data_block = RS_BLOCK_SIZE - repair_symbols;
    let mut out = Vec::with_capacity(payload.len() + repair_symbols);
    for block in payload.chunks(data_block) {
        out.extend_from_slice(&encoder.encode(block));
    }
    Ok(out)
}

/// Décode par blocs de 255 octets (le dernier peut être plus court)
fn rs_byte_decode(packed: &[u8], repair_symbols: usize) -> Result<Vec<u8>> {
    if repair_symbols == 0 || repair_symbols >= RS_BLOCK_SIZE {
        return Err(FountainError::Correction(format!(
            "nombre de symboles de réparation invalide: {}",
            repair_symbols
        )));
    }
    if packed.len() <= repair_symbols {
        return Err(FountainError::CorruptPacket(
            "paquet trop court pour le code Reed-Solomon".to_string(),
        ));
    }
    let decoder = reed_solomon::Decoder::new(repair_symbols);
    let mut out = Vec::with_capacity(packed.len());
    for block in packed.chunks(RS_BLOCK_SIZE) {
        match decoder.correct(block, None) {
            Ok(recovered) => out.extend_from_slice(recovered.data()),
            Err(_) => {
                return Err(FountainError::CorruptPacket(format!(
                    "Reed-Solomon: correction impossible pour un bloc de {} octets",
                    block.len()
                )))
            }
        }
    }
    Ok(out)
}
