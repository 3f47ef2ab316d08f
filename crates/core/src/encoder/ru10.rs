//! Encodeur RU10 (Raptor)
//!
//! Les chunks source sont prolongés par S blocs LDPC puis H demi-blocs,
//! matérialisés dans l'ordre de construction (chaque bloc ne dépend que
//! de symboles déjà construits). Le tirage des paquets échantillonne ce
//! tableau étendu, mais seuls N et la graine voyagent : le décodeur
//! re-dérive S et H de N.

use std::path::Path;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::info;

use crate::compression::compress;
use crate::container;
use crate::decoder::PacketDecoder;
use crate::encoder::{
    prepare_chunks, should_drop, xor_fold, DropOracle, EncoderConfig, SeedGenerator,
};
use crate::error::{FountainError, Result};
use crate::packet::{Packet, PacketFamily};
use crate::selection::{choose_ru10_indices, intermediate_symbols, ru10_block_compositions};

pub struct Ru10Encoder {
    config: EncoderConfig,
    /// Tableau étendu : chunks ‖ blocs LDPC ‖ demi-blocs
    extended: Vec<Vec<u8>>,
    chunk_size: usize,
    number_of_chunks: usize,
    ldpc_blocks: usize,
    half_blocks: usize,
    packets: Vec<Packet>,
    seeds: SeedGenerator,
    rule_drops: usize,
}

impl Ru10Encoder {
    pub fn new(file_name: &str, data: &[u8], config: EncoderConfig) -> Result<Self> {
        let data = compress(data, config.compression)?;
        let prepared = prepare_chunks(file_name, &data, &config)?;
        let number_of_chunks = prepared.number_of_chunks;
        let (_, s, h) = intermediate_symbols(number_of_chunks);

        // matérialisation dans l'ordre : LDPC (sur les chunks), puis
        // demi-blocs (sur chunks ‖ LDPC)
        let mut extended = prepared.chunks;
        let (ldpc_comps, half_comps) = ru10_block_compositions(number_of_chunks);
        for composition in &ldpc_comps {
            let block = xor_fold(
                composition.iter().map(|i| extended[*i].as_slice()),
                prepared.chunk_size,
            );
            extended.push(block);
        }
        for composition in &half_comps {
            let block = xor_fold(
                composition.iter().map(|i| extended[*i].as_slice()),
                prepared.chunk_size,
            );
            extended.push(block);
        }
        debug_assert_eq!(extended.len(), number_of_chunks + s + h);

        let seeds = SeedGenerator::new(config.sequential_seeds, config.wire.id.max_value());
        Ok(Self {
            config,
            extended,
            chunk_size: prepared.chunk_size,
            number_of_chunks,
            ldpc_blocks: s,
            half_blocks: h,
            packets: Vec::new(),
            seeds,
            rule_drops: 0,
        })
    }

    /// Construit le paquet de graine donnée sur le tableau étendu
    pub fn packet_from_seed(&self, seed: u32) -> Result<Packet> {
        let used_chunks = choose_ru10_indices(self.number_of_chunks, seed as u64);
        let payload = xor_fold(
            used_chunks.iter().map(|i| self.extended[*i].as_slice()),
            self.chunk_size,
        );
        Ok(Packet::new(
            seed,
            self.number_of_chunks,
            used_chunks,
            payload,
            PacketFamily::Ru10,
        ))
    }

    pub fn create_new_packet(&mut self, seed: Option<u32>) -> Result<Packet> {
        let seed = match seed {
            Some(seed) => seed,
            None => self.seeds.next_seed()?,
        };
        self.packet_from_seed(seed)
    }

    fn next_accepted_packet(&mut self, oracle: Option<&dyn DropOracle>) -> Result<Packet> {
        loop {
            let mut packet = self.create_new_packet(None)?;
            if let Some(oracle) = oracle {
                if should_drop(
                    oracle,
                    &mut packet,
                    &self.config.wire,
                    &self.config.error_correction,
                    self.config.drop_upper_bound,
                )? {
                    self.rule_drops += 1;
                    continue;
                }
            }
            return Ok(packet);
        }
    }

    /// Génère des paquets jusqu'au surcoût configuré
    pub fn encode_to_packets(&mut self, oracle: Option<&dyn DropOracle>) -> Result<usize> {
        let target = ((self.number_of_chunks as f64) * (1.0 + self.config.overhead)).ceil()
            as usize;
        let target = target.max(self.number_of_chunks);
        while self.packets.len() < target {
            let packet = self.next_accepted_packet(oracle)?;
            self.packets.push(packet);
        }
        info!(
            "encodage RU10: {} paquets pour {} chunks (+{} LDPC, +{} demi-blocs)",
            self.packets.len(),
            self.number_of_chunks,
            self.ldpc_blocks,
            self.half_blocks
        );
        Ok(self.packets.len())
    }

    /// Génère des paquets jusqu'au verdict du pseudo-décodeur
    pub fn encode_until_decodable(
        &mut self,
        pseudo: &mut dyn PacketDecoder,
        oracle: Option<&dyn DropOracle>,
    ) -> Result<usize> {
        let safety_limit = (self.number_of_chunks * 50).max(1000);
        while !pseudo.is_decoded() {
            if self.packets.len() > safety_limit {
                return Err(FountainError::Encoding(format!(
                    "pseudo-décodeur sans verdict après {} paquets",
                    safety_limit
                )));
            }
            let packet = self.next_accepted_packet(oracle)?;
            pseudo.input_new_packet(packet.clone())?;
            self.packets.push(packet);
        }
        Ok(self.packets.len())
    }

    /// Génération parallèle, un paquet par graine
    pub fn create_packets_parallel(&self, seeds: &[u32]) -> Result<Vec<Packet>> {
        seeds
            .par_iter()
            .map(|seed| self.packet_from_seed(*seed))
            .collect()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn number_of_chunks(&self) -> usize {
        self.number_of_chunks
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn ldpc_block_count(&self) -> usize {
        self.ldpc_blocks
    }

    /// Symbole du tableau étendu (chunk, bloc LDPC ou demi-bloc)
    pub fn extended_symbol(&self, index: usize) -> &[u8] {
        &self.extended[index]
    }

    pub fn half_block_count(&self) -> usize {
        self.half_blocks
    }

    pub fn rule_drops(&self) -> usize {
        self.rule_drops
    }

    pub fn save_to_folder(&self, dir: &Path, as_dna: bool) -> Result<()> {
        let ending = if as_dna { ".RU10_DNA" } else { ".RU10" };
        container::write_packets_to_folder(
            dir,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
            as_dna,
            ending,
        )
    }

    pub fn save_to_zip(&self, path: &Path, as_dna: bool) -> Result<()> {
        let ending = if as_dna { ".RU10_DNA" } else { ".RU10" };
        container::write_packets_to_zip(
            path,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
            as_dna,
            ending,
        )
    }

    pub fn save_to_fasta(&self, path: &Path) -> Result<()> {
        container::write_packets_to_fasta(
            path,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
        )
    }

    pub fn save_to_stream<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        container::write_packets_to_stream(
            writer,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
        )
    }
}
