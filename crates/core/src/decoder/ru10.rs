//! Décodeur RU10 (Raptor)
//!
//! Les blocs LDPC et demi-blocs ne sont jamais transmis : ils sont
//! reconstruits du seul N lu sur le premier paquet, par le même
//! algorithme déterministe que l'encodeur. Chaque paquet est ensuite
//! ramené à sa projection sur les chunks réels en retirant les couches
//! dans l'ordre inverse de construction (demi-blocs d'abord, puis
//! LDPC) : le payload, XOR de symboles qui sont eux-mêmes des XOR de
//! chunks, est déjà correct pour l'ensemble projeté.

use std::path::Path;

use crate::container::{self, RawRecord};
use crate::decoder::{
    drive_decode, reconstruct_from_solver, DecodeStats, DecoderConfig, PacketDecoder,
    ReconstructedFile, Solver, SolverKind,
};
use crate::error::{FountainError, Result};
use crate::packet::{Packet, PacketFamily};
use crate::selection::{choose_ru10_indices, intermediate_symbols, ru10_block_compositions};

/// Appartenances des blocs auxiliaires reconstruits
struct AuxBlocks {
    s: usize,
    h: usize,
    /// bloc LDPC -> appartenance sur 0..n
    ldpc: Vec<Vec<bool>>,
    /// demi-bloc -> appartenance sur 0..n+s (chunks ‖ LDPC)
    half: Vec<Vec<bool>>,
}

impl AuxBlocks {
    fn build(number_of_chunks: usize) -> Self {
        let (_, s, h) = intermediate_symbols(number_of_chunks);
        let (ldpc_comps, half_comps) = ru10_block_compositions(number_of_chunks);
        let ldpc = ldpc_comps
            .iter()
            .map(|comp| {
                let mut row = vec![false; number_of_chunks];
                for i in comp {
                    row[*i] = true;
                }
                row
            })
            .collect();
        let half = half_comps
            .iter()
            .map(|comp| {
                let mut row = vec![false; number_of_chunks + s];
                for i in comp {
                    row[*i] = true;
                }
                row
            })
            .collect();
        Self { s, h, ldpc, half }
    }
}

pub struct Ru10Decoder {
    config: DecoderConfig,
    solver_kind: SolverKind,
    solver: Option<Solver>,
    aux: Option<AuxBlocks>,
    number_of_chunks: Option<usize>,
    stats: DecodeStats,
    pseudo: bool,
}

impl Ru10Decoder {
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
            aux: None,
            number_of_chunks,
            stats: DecodeStats::default(),
            pseudo: false,
        }
    }

    /// Pseudo-décodeur pour la boucle d'encodage
    pub fn pseudo(number_of_chunks: usize) -> Self {
        let config = DecoderConfig {
            static_number_of_chunks: Some(number_of_chunks),
            use_header_chunk: false,
            ..Default::default()
        };
        let mut decoder = Self::with_solver(config, SolverKind::Gauss);
        decoder.pseudo = true;
        decoder
    }

    /// Reconstruit paresseusement les blocs auxiliaires au premier paquet
    fn ensure_aux(&mut self, number_of_chunks: usize) -> Result<()> {
        if let Some(known) = self.number_of_chunks {
            if known != number_of_chunks {
                return Err(FountainError::InconsistentState(format!(
                    "nombre de chunks incohérent: {} puis {}",
                    known, number_of_chunks
                )));
            }
        }
        self.number_of_chunks = Some(number_of_chunks);
        if self.aux.is_none() {
            self.aux = Some(AuxBlocks::build(number_of_chunks));
            self.solver = Some(Solver::new(self.solver_kind, number_of_chunks));
        }
        Ok(())
    }

    /// Projection d'un paquet sur les chunks réels : retire la couche
    /// des demi-blocs puis la couche LDPC, par XOR des appartenances
    fn reduce_to_real(&self, packet: &Packet) -> Result<Vec<bool>> {
        let n = packet.total_chunks;
        let aux = self
            .aux
            .as_ref()
            .expect("blocs auxiliaires construits par ensure_aux");
        let extended = n + aux.s + aux.h;
        if packet.used_chunks.iter().any(|i| *i >= extended) {
            return Err(FountainError::InconsistentState(format!(
                "indice de symbole hors du tableau étendu ({} symboles)",
                extended
            )));
        }

        // couche demi-blocs : projection sur chunks ‖ LDPC
        let mut over_ldpc = vec![false; n + aux.s];
        for index in &packet.used_chunks {
            if *index < n + aux.s {
                over_ldpc[*index] ^= true;
            } else {
                for (dst, src) in over_ldpc.iter_mut().zip(&aux.half[*index - n - aux.s]) {
                    *dst ^= *src;
                }
            }
        }
        // couche LDPC : projection sur les chunks réels
        let mut row = vec![false; n];
        row.copy_from_slice(&over_ldpc[..n]);
        for (ldpc_index, membership) in aux.ldpc.iter().enumerate() {
            if over_ldpc[n + ldpc_index] {
                for (dst, src) in row.iter_mut().zip(membership) {
                    *dst ^= *src;
                }
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

    /// Nombre de blocs LDPC reconstruits
    pub fn ldpc_block_count(&self) -> Option<usize> {
        self.aux.as_ref().map(|aux| aux.s)
    }

    /// Nombre de demi-blocs reconstruits
    pub fn half_block_count(&self) -> Option<usize> {
        self.aux.as_ref().map(|aux| aux.h)
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

impl PacketDecoder for Ru10Decoder {
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
        if number_of_chunks == 0 {
            return Err(FountainError::CorruptPacket(
                "nombre de chunks nul dans l'en-tête".to_string(),
            ));
        }
        let id = self.config.wire.id.unpack(&payload, &mut offset)? as u32;
        let data = payload[offset..].to_vec();

        self.ensure_aux(number_of_chunks)?;
        let used_chunks = choose_ru10_indices(number_of_chunks, id as u64);
        Ok(Packet::new(
            id,
            number_of_chunks,
            used_chunks,
            data,
            PacketFamily::Ru10,
        ))
    }

    fn input_new_packet(&mut self, packet: Packet) -> Result<bool> {
        self.ensure_aux(packet.total_chunks)?;
        let row = self.reduce_to_real(&packet)?;
        let payload = if self.pseudo { Vec::new() } else { packet.payload };
        let eager = !self.config.read_all_before_solve;
        self.solver
            .as_mut()
            .expect("solveur construit par ensure_aux")
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::intermediate_symbols;

    #[test]
    fn test_aux_blocks_deterministic() {
        // l'encodeur et un décodeur indépendant doivent reconstruire les
        // mêmes (S, H) et les mêmes appartenances depuis N seul
        let n = 24;
        let a = AuxBlocks::build(n);
        let b = AuxBlocks::build(n);
        let (_, s, h) = intermediate_symbols(n);
        assert_eq!(a.s, s);
        assert_eq!(a.h, h);
        assert_eq!(a.ldpc, b.ldpc);
        assert_eq!(a.half, b.half);
    }

    #[test]
    fn test_reduce_pure_chunk_packet() {
        // un paquet ne référençant que des chunks réels se projette sur
        // lui-même
        let n = 12;
        let mut decoder = Ru10Decoder::pseudo(n);
        decoder.ensure_aux(n).unwrap();
        let packet = Packet::new(
            1,
            n,
            [0usize, 3, 7].into_iter().collect(),
            Vec::new(),
            PacketFamily::Ru10,
        );
        let row = decoder.reduce_to_real(&packet).unwrap();
        let expected: Vec<bool> = (0..n).map(|i| [0, 3, 7].contains(&i)).collect();
        assert_eq!(row, expected);
    }

    #[test]
    fn test_reduce_ldpc_packet_projects_membership() {
        // un paquet réduit à un seul bloc LDPC doit se projeter sur
        // l'appartenance de ce bloc
        let n = 12;
        let mut decoder = Ru10Decoder::pseudo(n);
        decoder.ensure_aux(n).unwrap();
        let packet = Packet::new(
            2,
            n,
            [n].into_iter().collect(),
            Vec::new(),
            PacketFamily::Ru10,
        );
        let row = decoder.reduce_to_real(&packet).unwrap();
        let aux = decoder.aux.as_ref().unwrap();
        assert_eq!(row, aux.ldpc[0]);
    }

    #[test]
    fn test_reduce_out_of_range_symbol_is_inconsistent() {
        let n = 12;
        let mut decoder = Ru10Decoder::pseudo(n);
        decoder.ensure_aux(n).unwrap();
        let (l, _, _) = intermediate_symbols(n);
        let packet = Packet::new(
            3,
            n,
            [l + 5].into_iter().collect(),
            Vec::new(),
            PacketFamily::Ru10,
        );
        let err = decoder.reduce_to_real(&packet).unwrap_err();
        assert!(matches!(err, FountainError::InconsistentState(_)));
    }
}
