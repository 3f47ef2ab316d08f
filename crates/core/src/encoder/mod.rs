//! Encodeurs fontaine
//!
//! Machinerie commune aux trois familles : découpage du fichier en
//! chunks de taille fixe, chunk d'en-tête optionnel, bourrage à zéro du
//! dernier chunk, génération de graines, filtrage par l'oracle de
//! chute, boucle d'encodage jusqu'au surcoût configuré ou jusqu'au
//! verdict d'un pseudo-décodeur.

pub mod lt;
pub mod online;
pub mod ru10;

pub use lt::LtEncoder;
pub use online::OnlineEncoder;
pub use ru10::Ru10Encoder;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::compression::CompressionType;
use crate::correction::ErrorCorrection;
use crate::error::{FountainError, Result};
use crate::header_chunk::HeaderChunk;
use crate::packet::{Packet, WireFormat};

/// Oracle externe de probabilité de chute
///
/// Note la forme ADN d'un paquet ; la physique des mutations est
/// entièrement déléguée à l'implémentation. Le score est conservé sur le
/// paquet (`error_prob`) mais n'affecte jamais la justesse du décodage.
pub trait DropOracle {
    fn score(&self, dna: &str) -> f32;
}

/// Configuration d'un encodeur
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Nombre de chunks visé ; 0 pour le dériver de chunk_size
    pub number_of_chunks: usize,
    /// Taille de chunk en octets ; 0 pour la dériver de number_of_chunks
    pub chunk_size: usize,
    /// Insérer le chunk d'en-tête (nom + longueur du dernier chunk)
    pub insert_header: bool,
    /// Surcoût de redondance au-delà de N (0.20 = 20 % de paquets en plus)
    pub overhead: f64,
    /// Largeurs des champs du format de fil
    pub wire: WireFormat,
    /// Code de correction appliqué à chaque paquet
    pub error_correction: ErrorCorrection,
    /// Compression du fichier avant découpage
    pub compression: CompressionType,
    /// Graines séquentielles (0, 1, 2, ...) plutôt qu'aléatoires
    pub sequential_seeds: bool,
    /// Seuil de l'oracle de chute : score au-dessus => paquet rejeté
    pub drop_upper_bound: f32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            number_of_chunks: 0,
            chunk_size: 32,
            insert_header: true,
            overhead: 0.20,
            wire: WireFormat::default(),
            error_correction: ErrorCorrection::Nocode,
            compression: CompressionType::None,
            sequential_seeds: true,
            drop_upper_bound: 1.0,
        }
    }
}

impl EncoderConfig {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Chunks préparés à partir d'un fichier
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunks {
    pub chunks: Vec<Vec<u8>>,
    pub chunk_size: usize,
    pub number_of_chunks: usize,
}

/// Découpe les données, bourre le dernier chunk de zéros et insère
/// l'éventuel chunk d'en-tête en position 0.
pub(crate) fn prepare_chunks(
    file_name: &str,
    data: &[u8],
    config: &EncoderConfig,
) -> Result<PreparedChunks> {
    if data.is_empty() {
        return Err(FountainError::Encoding(
            "rien à encoder: fichier vide".to_string(),
        ));
    }
    let header_chunks = usize::from(config.insert_header);
    let chunk_size = if config.chunk_size != 0 {
        config.chunk_size
    } else {
        if config.number_of_chunks <= header_chunks {
            return Err(FountainError::Encoding(format!(
                "number_of_chunks {} trop petit",
                config.number_of_chunks
            )));
        }
        // l'arrondi peut donner moins de chunks que demandé : le compte
        // réel après découpage fait foi
        data.len().div_ceil(config.number_of_chunks - header_chunks)
    };

    let mut chunks: Vec<Vec<u8>> = data.chunks(chunk_size).map(<[u8]>::to_vec).collect();
    let last_chunk_len = chunks.last().map(Vec::len).unwrap_or(0);
    if let Some(last) = chunks.last_mut() {
        last.resize(chunk_size, 0x00);
    }
    if config.insert_header {
        let header = HeaderChunk::encode(
            file_name,
            last_chunk_len,
            chunk_size,
            config.wire.last_chunk_len,
        )?;
        chunks.insert(0, header);
    }
    let number_of_chunks = chunks.len();
    Ok(PreparedChunks {
        chunks,
        chunk_size,
        number_of_chunks,
    })
}

/// XOR d'une liste de chunks de même taille
pub(crate) fn xor_fold<'a, I>(chunks: I, chunk_size: usize) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut acc = vec![0u8; chunk_size];
    for chunk in chunks {
        for (dst, src) in acc.iter_mut().zip(chunk) {
            *dst ^= src;
        }
    }
    acc
}

/// Générateur de graines de paquets
///
/// En mode séquentiel : 0, 1, 2, ... (reproductible). Sinon tirage
/// frais borné par la largeur du champ id, comme un nouveau générateur
/// par appel.
#[derive(Debug, Clone)]
pub(crate) struct SeedGenerator {
    sequential: bool,
    next: u64,
    max: u64,
}

impl SeedGenerator {
    pub fn new(sequential: bool, id_field_max: u64) -> Self {
        Self {
            sequential,
            next: 0,
            max: id_field_max.min(u32::MAX as u64),
        }
    }

    pub fn next_seed(&mut self) -> Result<u32> {
        if self.sequential {
            if self.next > self.max {
                return Err(FountainError::Encoding(
                    "graines séquentielles épuisées pour la largeur du champ id".to_string(),
                ));
            }
            let seed = self.next;
            self.next += 1;
            Ok(seed as u32)
        } else {
            Ok(rand::thread_rng().gen_range(0..=self.max) as u32)
        }
    }
}

/// Applique l'oracle : note le paquet, décide de la chute
pub(crate) fn should_drop(
    oracle: &dyn DropOracle,
    packet: &mut Packet,
    wire: &WireFormat,
    correction: &ErrorCorrection,
    upper_bound: f32,
) -> Result<bool> {
    let dna = packet.to_dna(wire, correction)?;
    let score = oracle.score(&dna);
    packet.error_prob = Some(score);
    Ok(score > upper_bound)
}
