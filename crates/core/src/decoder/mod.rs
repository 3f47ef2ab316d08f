//! Décodeurs fontaine
//!
//! Machinerie commune aux trois familles : état du solveur (élimination
//! de Gauss ou propagation de croyances), boucle de décodage itérative
//! qui saute les paquets corrompus, et réassemblage final avec prise en
//! compte du chunk d'en-tête. Un décodeur peut aussi servir de
//! pseudo-décodeur à un encodeur, pour arrêter la génération dès que le
//! fichier est reconstructible.

pub mod belief;
pub mod gepp;
pub mod lt;
pub mod online;
pub mod ru10;

pub use belief::{BeliefReducer, Equation};
pub use gepp::Gepp;
pub use lt::LtDecoder;
pub use online::OnlineDecoder;
pub use ru10::Ru10Decoder;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compression::{decompress, CompressionType};
use crate::container::RawRecord;
use crate::correction::ErrorCorrection;
use crate::error::{FountainError, Result};
use crate::header_chunk::HeaderChunk;
use crate::packet::{Packet, WireFormat};

/// Configuration d'un décodeur
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Largeurs des champs du format de fil (doit refléter l'encodeur)
    pub wire: WireFormat,
    /// Code de correction attendu sur chaque paquet
    pub error_correction: ErrorCorrection,
    /// Le chunk 0 est un chunk d'en-tête
    pub use_header_chunk: bool,
    /// Nombre de chunks fourni hors bande (le champ disparaît du fil)
    pub static_number_of_chunks: Option<usize>,
    /// Décompression après réassemblage
    pub compression: CompressionType,
    /// Attendre la fin du flux avant de résoudre, plutôt que de tenter
    /// une résolution à chaque paquet une fois le rang suffisant
    pub read_all_before_solve: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            wire: WireFormat::default(),
            error_correction: ErrorCorrection::Nocode,
            use_header_chunk: true,
            static_number_of_chunks: None,
            compression: CompressionType::None,
            read_all_before_solve: false,
        }
    }
}

impl DecoderConfig {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Stratégie de résolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SolverKind {
    /// Élimination de Gauss avec pivot partiel (solveur exact)
    #[default]
    Gauss,
    /// Propagation de croyances (peeling)
    Belief,
}

/// État du solveur, construit au premier paquet (N connu)
pub enum Solver {
    Gauss(Gepp),
    Belief(BeliefReducer),
}

impl Solver {
    pub fn new(kind: SolverKind, number_of_chunks: usize) -> Self {
        match kind {
            SolverKind::Gauss => Solver::Gauss(Gepp::new(number_of_chunks)),
            SolverKind::Belief => Solver::Belief(BeliefReducer::new(number_of_chunks)),
        }
    }

    /// Insère une équation réduite aux chunks réels
    ///
    /// En mode Gauss avec `eager`, tente une résolution dès que le rang
    /// le permet. Retourne vrai si tout est résolu.
    pub fn insert_row(&mut self, row: Vec<bool>, payload: Vec<u8>, eager: bool) -> Result<bool> {
        match self {
            Solver::Gauss(gepp) => {
                gepp.add_row(row, payload)?;
                if eager && gepp.is_potentially_solvable() {
                    return gepp.solve(false);
                }
                Ok(false)
            }
            Solver::Belief(reducer) => {
                let used = row
                    .iter()
                    .enumerate()
                    .filter(|(_, set)| **set)
                    .map(|(i, _)| i)
                    .collect();
                reducer.insert(Equation::new(used, payload))
            }
        }
    }

    pub fn solve(&mut self, partial: bool) -> Result<bool> {
        match self {
            Solver::Gauss(gepp) => gepp.solve(partial),
            Solver::Belief(reducer) => Ok(reducer.is_decoded()),
        }
    }

    pub fn is_decoded(&self) -> bool {
        match self {
            Solver::Gauss(gepp) => gepp.is_potentially_solvable() && gepp.is_solved(),
            Solver::Belief(reducer) => reducer.is_decoded(),
        }
    }

    pub fn solved_count(&self) -> usize {
        match self {
            Solver::Gauss(gepp) => gepp.solved_count(),
            Solver::Belief(reducer) => reducer.solved_count(),
        }
    }

    /// Contenu du chunk résolu, s'il l'est
    pub fn chunk(&self, index: usize) -> Option<&[u8]> {
        match self {
            Solver::Gauss(gepp) => gepp.result_mapping()[index].map(|row| gepp.row_data(row)),
            Solver::Belief(reducer) => reducer.decoded().get(&index).map(Vec::as_slice),
        }
    }
}

/// Compteurs de la boucle de décodage
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeStats {
    pub correct: usize,
    pub corrupt: usize,
}

/// Interface commune des décodeurs par famille
///
/// Sert aussi de pseudo-décodeur côté encodeur : `input_new_packet` +
/// `is_decoded` suffisent à signaler que le fichier est reconstructible.
pub trait PacketDecoder {
    /// Analyse un paquet brut (corruption => `CorruptPacket`)
    fn parse_raw_packet(&mut self, raw: &[u8]) -> Result<Packet>;
    /// Ingère un paquet ; vrai si le fichier est résolu
    fn input_new_packet(&mut self, packet: Packet) -> Result<bool>;
    fn is_decoded(&self) -> bool;
    fn solve(&mut self, partial: bool) -> Result<bool>;
    fn stats(&self) -> DecodeStats;
    fn stats_mut(&mut self) -> &mut DecodeStats;
}

/// Boucle de décodage sur des enregistrements bruts
///
/// Itérative et bornée par la fin du flux : un paquet corrompu est
/// compté puis sauté, jamais fatal en cours de flux ; une incohérence
/// de configuration abandonne la session.
pub(crate) fn drive_decode<D: PacketDecoder>(
    decoder: &mut D,
    records: Vec<RawRecord>,
) -> Result<bool> {
    for record in records {
        match record {
            RawRecord::Corrupt(name) => {
                warn!("enregistrement corrompu sauté: {}", name);
                decoder.stats_mut().corrupt += 1;
            }
            RawRecord::Binary { data, error_prob } => match decoder.parse_raw_packet(&data) {
                Ok(mut packet) => {
                    packet.error_prob = error_prob;
                    decoder.stats_mut().correct += 1;
                    if decoder.input_new_packet(packet)? {
                        break;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    debug!("paquet corrompu sauté: {}", e);
                    decoder.stats_mut().corrupt += 1;
                }
                Err(e) => return Err(e),
            },
        }
    }
    let stats = decoder.stats();
    info!(
        "paquets décodés: {}, corrompus: {}",
        stats.correct, stats.corrupt
    );
    if !decoder.is_decoded() {
        decoder.solve(false)?;
    }
    Ok(decoder.is_decoded())
}

/// Fichier reconstruit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedFile {
    /// Nom d'origine, si un chunk d'en-tête le portait
    pub file_name: Option<String>,
    pub data: Vec<u8>,
    /// Vrai si des chunks manquants ont été remplacés par des zéros
    pub dirty: bool,
    /// Indices des chunks manquants
    pub missing_chunks: Vec<usize>,
}

/// Réassemble le fichier depuis le solveur
///
/// Sans `partial`, un rang insuffisant est signalé par
/// `InsufficientData` (l'appelant peut fournir plus de paquets). Avec
/// `partial`, les colonnes non résolues sortent en zéros et le fichier
/// est marqué sale.
pub(crate) fn reconstruct_from_solver(
    solver: &mut Solver,
    number_of_chunks: usize,
    config: &DecoderConfig,
    partial: bool,
) -> Result<ReconstructedFile> {
    if !solver.is_decoded() {
        if partial {
            solver.solve(true)?;
        } else {
            solver.solve(false)?;
        }
    }
    if !solver.is_decoded() && !partial {
        return Err(FountainError::InsufficientData {
            need: number_of_chunks,
            have: solver.solved_count(),
        });
    }

    let chunk_size = (0..number_of_chunks)
        .find_map(|i| solver.chunk(i))
        .map(<[u8]>::len)
        .ok_or(FountainError::InsufficientData {
            need: number_of_chunks,
            have: 0,
        })?;

    let header = if config.use_header_chunk {
        match solver.chunk(0) {
            Some(data) => Some(HeaderChunk::decode(data, config.wire.last_chunk_len)?),
            None => None,
        }
    } else {
        None
    };

    let first_data_chunk = usize::from(config.use_header_chunk);
    let mut data = Vec::with_capacity((number_of_chunks - first_data_chunk) * chunk_size);
    let mut missing = Vec::new();
    for index in first_data_chunk..number_of_chunks {
        match solver.chunk(index) {
            Some(chunk) => {
                let is_last = index == number_of_chunks - 1;
                match (&header, is_last) {
                    (Some(h), true) if h.last_chunk_length <= chunk.len() => {
                        data.extend_from_slice(&chunk[..h.last_chunk_length])
                    }
                    _ => data.extend_from_slice(chunk),
                }
            }
            None => {
                data.extend(std::iter::repeat(0u8).take(chunk_size));
                missing.push(index);
            }
        }
    }

    let dirty = !missing.is_empty();
    // un fichier incomplet ne peut pas être décompressé de façon fiable
    let data = if dirty {
        data
    } else {
        decompress(&data, config.compression)?
    };
    if dirty {
        warn!(
            "reconstruction partielle: {} chunk(s) manquant(s), remplacés par des zéros",
            missing.len()
        );
    }
    Ok(ReconstructedFile {
        file_name: header.map(|h| h.file_name),
        data,
        dirty,
        missing_chunks: missing,
    })
}
