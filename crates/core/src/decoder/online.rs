//! Décodeur Online
//!
//! La couche de blocs auxiliaires est reconstruite du seul N (graine du
//! tirage d'appartenance), la distribution du seul epsilon lu sur le
//! fil. L'élimination de Gauss est la seule stratégie exacte pour cette
//! famille ; la propagation de croyances reste disponible comme
//! réducteur.

use std::collections::BTreeSet;
use std::path::Path;

use crate::container::{self, RawRecord};
use crate::decoder::{
    drive_decode, reconstruct_from_solver, DecodeStats, DecoderConfig, PacketDecoder,
    ReconstructedFile, Solver, SolverKind,
};
use crate::distribution::OnlineDistribution;
use crate::error::{FountainError, Result};
use crate::packet::{Packet, PacketFamily};
use crate::selection::{choose_chunk_indices, online_aux_count, online_aux_membership};

pub struct OnlineDecoder {
    config: DecoderConfig,
    solver_kind: SolverKind,
    solver: Option<Solver>,
    dist: Option<OnlineDistribution>,
    /// Appartenance des blocs auxiliaires sur 0..n
    aux_membership: Option<Vec<BTreeSet<usize>>>,
    number_of_chunks: Option<usize>,
    quality: Option<u32>,
    epsilon: Option<f64>,
    stats: DecodeStats,
    pseudo: bool,
}

impl OnlineDecoder {
    /// Décodeur exact (élimination de Gauss)
    pub fn new(config: DecoderConfig) -> Self {
        Self::with_solver(config, SolverKind::Gauss)
    }

    /// Décodeur par propagation de croyances
    pub fn new_bp(config: DecoderConfig) -> Self {
        Self::with_solver(config, SolverKind::Belief)
    }

    fn with_solver(config: DecoderConfig, solver_kind: SolverKind) -> Self {
        let number_of_chunks = config.static_number_of_chunks;
        Self {
            config,
            solver_kind,
            solver: None,
            dist: None,
            aux_membership: None,
            number_of_chunks,
            quality: None,
            epsilon: None,
            stats: DecodeStats::default(),
            pseudo: false,
        }
    }

    /// Paramètres fournis hors bande quand le fil ne les porte pas
    /// (quality et epsilon absents de l'en-tête)
    pub fn with_parameters(mut self, quality: u32, epsilon: f64) -> Self {
        self.quality = Some(quality);
        self.epsilon = Some(epsilon);
        self
    }

    /// Pseudo-décodeur pour la boucle d'encodage
    pub fn pseudo(number_of_chunks: usize, quality: u32, epsilon: f64) -> Self {
        let config = DecoderConfig {
            static_number_of_chunks: Some(number_of_chunks),
            use_header_chunk: false,
            ..Default::default()
        };
        let mut decoder = Self::with_solver(config, SolverKind::Gauss).with_parameters(quality, epsilon);
        decoder.pseudo = true;
        decoder
    }

    /// Arrondi à 6 décimales : epsilon voyage en f32 sur le fil, la
    /// distribution se construit sur f64
    fn normalize_epsilon(epsilon: f64) -> f64 {
        (epsilon * 1e6).round() / 1e6
    }

    fn ensure_state(&mut self, number_of_chunks: usize, quality: u32, epsilon: f64) -> Result<()> {
        if let Some(known) = self.number_of_chunks {
            if known != number_of_chunks {
                return Err(FountainError::InconsistentState(format!(
                    "nombre de chunks incohérent: {} puis {}",
                    known, number_of_chunks
                )));
            }
        }
        let epsilon = Self::normalize_epsilon(epsilon);
        if let (Some(q), Some(e)) = (self.quality, self.epsilon) {
            if q != quality || (e - epsilon).abs() > 1e-9 {
                return Err(FountainError::InconsistentState(format!(
                    "paramètres Online incohérents: ({}, {}) puis ({}, {})",
                    q, e, quality, epsilon
                )));
            }
        }
        self.number_of_chunks = Some(number_of_chunks);
        self.quality = Some(quality);
        self.epsilon = Some(epsilon);
        if self.dist.is_none() {
            self.dist = Some(OnlineDistribution::new(epsilon)?);
        }
        if self.aux_membership.is_none() {
            let aux_count = online_aux_count(number_of_chunks, quality, epsilon);
            self.aux_membership = Some(online_aux_membership(
                number_of_chunks,
                quality,
                aux_count,
            ));
            self.solver = Some(Solver::new(self.solver_kind, number_of_chunks));
        }
        Ok(())
    }

    /// Projection d'un paquet sur les chunks réels : XOR de
    /// l'appartenance de chaque bloc auxiliaire référencé
    fn reduce_to_real(&self, packet: &Packet) -> Result<Vec<bool>> {
        let n = packet.total_chunks;
        let membership = self
            .aux_membership
            .as_ref()
            .expect("blocs auxiliaires construits par ensure_state");
        let extended = n + membership.len();
        let mut row = vec![false; n];
        for index in &packet.used_chunks {
            if *index < n {
                row[*index] ^= true;
            } else if *index < extended {
                for chunk in &membership[*index - n] {
                    row[*chunk] ^= true;
                }
            } else {
                return Err(FountainError::InconsistentState(format!(
                    "indice {} hors de chunks + blocs auxiliaires ({})",
                    index, extended
                )));
            }
        }
        Ok(row)
    }

    pub fn decode_stream<R: std::io::Read>(&mut self, reader: &mut R) -> Result<bool> {
        let records = container::read_records_from_stream(reader, self.config.wire.packet_len)?;
        self.decode_records(records)
    }

    pub fn decode_folder(&mut self, dir: &Path, file_ending: &str, as_dna: bool) -> Result<bool> {
        let records = container::read_records_from_folder(
            dir,
            file_ending,
            as_dna,
            &self.config.error_correction,
        )?;
        self.decode_records(records)
    }

    pub fn decode_zip(&mut self, path: &Path, as_dna: bool) -> Result<bool> {
        let records =
            container::read_records_from_zip(path, as_dna, &self.config.error_correction)?;
        self.decode_records(records)
    }

    pub fn decode_fasta(&mut self, path: &Path) -> Result<bool> {
        let records = container::read_records_from_fasta(path, &self.config.error_correction)?;
        self.decode_records(records)
    }

    pub fn decode_records(&mut self, records: Vec<RawRecord>) -> Result<bool> {
        drive_decode(self, records)
    }

    pub fn solved_count(&self) -> usize {
        self.solver.as_ref().map_or(0, Solver::solved_count)
    }

    pub fn number_of_chunks(&self) -> Option<usize> {
        self.number_of_chunks
    }

    pub fn reconstruct(&mut self, partial: bool) -> Result<ReconstructedFile> {
        let number_of_chunks = self.number_of_chunks.ok_or(FountainError::Decoding(
            "aucun paquet valide reçu".to_string(),
        ))?;
        let solver = self.solver.as_mut().ok_or(FountainError::Decoding(
            "aucun paquet valide reçu".to_string(),
        ))?;
        reconstruct_from_solver(solver, number_of_chunks, &self.config, partial)
    }
}

impl PacketDecoder for OnlineDecoder {
    fn parse_raw_packet(&mut self, raw: &[u8]) -> Result<Packet> {
        let payload = self.config.error_correction.decode(raw)?;
        let mut offset = 0usize;
        let number_of_chunks = match self.config.static_number_of_chunks {
            Some(n) => n,
            None => self
                .config
                .wire
                .number_of_chunks
                .unpack(&payload, &mut offset)? as usize,
        };
        let quality = match self.config.wire.quality.size() {
            0 => self.quality.ok_or_else(|| {
                FountainError::InconsistentState(
                    "quality absent du fil et non fourni hors bande".to_string(),
                )
            })?,
            _ => self.config.wire.quality.unpack(&payload, &mut offset)? as u32,
        };
        let epsilon = if self.config.wire.carries_epsilon {
            if payload.len() < offset + 4 {
                return Err(FountainError::CorruptPacket(
                    "en-tête tronqué: epsilon manquant".to_string(),
                ));
            }
            let bits: [u8; 4] = payload[offset..offset + 4].try_into().expect("4 octets");
            offset += 4;
            f32::from_le_bytes(bits) as f64
        } else {
            self.epsilon.ok_or_else(|| {
                FountainError::InconsistentState(
                    "epsilon absent du fil et non fourni hors bande".to_string(),
                )
            })?
        };
        let id = self.config.wire.id.unpack(&payload, &mut offset)? as u32;
        let data = payload[offset..].to_vec();

        self.ensure_state(number_of_chunks, quality, epsilon)?;
        let dist = self.dist.as_ref().expect("distribution construite");
        let degree = dist.sample(id as u64);
        let aux_count = self.aux_membership.as_ref().expect("état construit").len();
        let used_chunks = choose_chunk_indices(number_of_chunks + aux_count, degree, id as u64)
            .map_err(|e| FountainError::InconsistentState(e.to_string()))?;
        Ok(Packet::new(
            id,
            number_of_chunks,
            used_chunks,
            data,
            PacketFamily::Online {
                quality,
                epsilon: epsilon as f32,
            },
        ))
    }

    fn input_new_packet(&mut self, packet: Packet) -> Result<bool> {
        let PacketFamily::Online { quality, epsilon } = packet.family else {
            return Err(FountainError::InconsistentState(
                "paquet non Online soumis au décodeur Online".to_string(),
            ));
        };
        self.ensure_state(packet.total_chunks, quality, epsilon as f64)?;
        let row = self.reduce_to_real(&packet)?;
        let payload = if self.pseudo { Vec::new() } else { packet.payload };
        let eager = !self.config.read_all_before_solve;
        self.solver
            .as_mut()
            .expect("solveur construit par ensure_state")
            .insert_row(row, payload, eager)
    }

    fn is_decoded(&self) -> bool {
        self.solver.as_ref().is_some_and(Solver::is_decoded)
    }

    fn solve(&mut self, partial: bool) -> Result<bool> {
        match self.solver.as_mut() {
            Some(solver) => solver.solve(partial),
            None => Ok(false),
        }
    }

    fn stats(&self) -> DecodeStats {
        self.stats
    }

    fn stats_mut(&mut self) -> &mut DecodeStats {
        &mut self.stats
    }
}
