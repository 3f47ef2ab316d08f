//! Décodeur LT
//!
//! Les chunks utilisés par un paquet sont re-dérivés de la graine (mode
//! implicite) ou du degré explicite porté par l'en-tête. Solveur exact
//! par élimination de Gauss, ou propagation de croyances pure.

use std::path::Path;

use crate::container::{self, RawRecord};
use crate::decoder::{
    drive_decode, reconstruct_from_solver, DecodeStats, DecoderConfig, PacketDecoder,
    ReconstructedFile, Solver, SolverKind,
};
use crate::distribution::Distribution;
use crate::error::{FountainError, Result};
use crate::packet::{Field, Packet, PacketFamily};
use crate::selection::choose_chunk_indices;

pub struct LtDecoder {
    config: DecoderConfig,
    dist: Distribution,
    solver_kind: SolverKind,
    solver: Option<Solver>,
    number_of_chunks: Option<usize>,
    stats: DecodeStats,
    /// Pseudo-décodage : seule la structure compte, pas les payloads
    pseudo: bool,
}

impl LtDecoder {
    /// Décodeur exact (élimination de Gauss)
    pub fn new(dist: Distribution, config: DecoderConfig) -> Self {
        Self::with_solver(dist, config, SolverKind::Gauss)
    }

    /// Décodeur par propagation de croyances pure
    pub fn new_bp(dist: Distribution, config: DecoderConfig) -> Self {
        Self::with_solver(dist, config, SolverKind::Belief)
    }

    fn with_solver(dist: Distribution, config: DecoderConfig, solver_kind: SolverKind) -> Self {
        let number_of_chunks = config.static_number_of_chunks;
        Self {
            config,
            dist,
            solver_kind,
            solver: None,
            number_of_chunks,
            stats: DecodeStats::default(),
            pseudo: false,
        }
    }

    /// Pseudo-décodeur pour la boucle d'encodage : signale la
    /// reconstructibilité sans payer le XOR des payloads
    pub fn pseudo(number_of_chunks: usize, dist: Distribution) -> Self {
        let config = DecoderConfig {
            static_number_of_chunks: Some(number_of_chunks),
            use_header_chunk: false,
            ..Default::default()
        };
        let mut decoder = Self::with_solver(dist, config, SolverKind::Belief);
        decoder.pseudo = true;
        decoder
    }

    fn ensure_solver(&mut self, number_of_chunks: usize) -> Result<()> {
        if let Some(known) = self.number_of_chunks {
            if known != number_of_chunks {
                return Err(FountainError::InconsistentState(format!(
                    "nombre de chunks incohérent: {} puis {}",
                    known, number_of_chunks
                )));
            }
        }
        self.number_of_chunks = Some(number_of_chunks);
        if self.solver.is_none() {
            self.solver = Some(Solver::new(self.solver_kind, number_of_chunks));
            if self.dist.size() != number_of_chunks {
                self.dist.update_number_of_chunks(number_of_chunks);
            }
        }
        Ok(())
    }

    /// Décode un flux binaire à enregistrements préfixés
    pub fn decode_stream<R: std::io::Read>(&mut self, reader: &mut R) -> Result<bool> {
        let records = container::read_records_from_stream(reader, self.config.wire.packet_len)?;
        self.decode_records(records)
    }

    /// Décode un répertoire plat de paquets
    pub fn decode_folder(&mut self, dir: &Path, file_ending: &str, as_dna: bool) -> Result<bool> {
        let records = container::read_records_from_folder(
            dir,
            file_ending,
            as_dna,
            &self.config.error_correction,
        )?;
        self.decode_records(records)
    }

    /// Décode une archive zip
    pub fn decode_zip(&mut self, path: &Path, as_dna: bool) -> Result<bool> {
        let records =
            container::read_records_from_zip(path, as_dna, &self.config.error_correction)?;
        self.decode_records(records)
    }

    /// Décode des enregistrements texte appariés
    pub fn decode_fasta(&mut self, path: &Path) -> Result<bool> {
        let records = container::read_records_from_fasta(path, &self.config.error_correction)?;
        self.decode_records(records)
    }

    /// Boucle de décodage sur des enregistrements déjà lus
    pub fn decode_records(&mut self, records: Vec<RawRecord>) -> Result<bool> {
        drive_decode(self, records)
    }

    pub fn solved_count(&self) -> usize {
        self.solver.as_ref().map_or(0, Solver::solved_count)
    }

    pub fn number_of_chunks(&self) -> Option<usize> {
        self.number_of_chunks
    }

    /// Réassemble le fichier (zéros + marquage sale en mode partiel)
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

impl PacketDecoder for LtDecoder {
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
        let explicit_degree = match self.config.wire.degree {
            Field::None => None,
            field => Some(field.unpack(&payload, &mut offset)? as usize),
        };
        let id = self.config.wire.id.unpack(&payload, &mut offset)? as u32;
        let data = payload[offset..].to_vec();

        self.ensure_solver(number_of_chunks)?;
        let degree = match explicit_degree {
            Some(d) => {
                // un degré annoncé au-delà de N est une incompatibilité de
                // configuration, jamais une simple corruption
                if d > number_of_chunks {
                    return Err(FountainError::InconsistentState(format!(
                        "degré annoncé {} > {} chunks",
                        d, number_of_chunks
                    )));
                }
                d
            }
            None => self.dist.sample(id as u64),
        };
        let used_chunks = choose_chunk_indices(number_of_chunks, degree, id as u64)
            .map_err(|e| FountainError::InconsistentState(e.to_string()))?;
        Ok(Packet::new(
            id,
            number_of_chunks,
            used_chunks,
            data,
            PacketFamily::Lt,
        ))
    }

    fn input_new_packet(&mut self, packet: Packet) -> Result<bool> {
        self.ensure_solver(packet.total_chunks)?;
        let number_of_chunks = packet.total_chunks;
        if packet.degree() > number_of_chunks {
            return Err(FountainError::InconsistentState(format!(
                "degré {} > {} chunks",
                packet.degree(),
                number_of_chunks
            )));
        }
        let row = packet.used_as_bool_array(number_of_chunks);
        let payload = if self.pseudo { Vec::new() } else { packet.payload };
        let eager = !self.config.read_all_before_solve;
        self.solver
            .as_mut()
            .expect("solveur construit par ensure_solver")
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
