//! Encodeur Online (Maymounkov)
//!
//! Une seule couche de blocs auxiliaires, au nombre de
//! ceil(0.55 * quality * epsilon * N), chacun XOR des chunks que le
//! tirage semé par N y a versés. Les paquets échantillonnent
//! chunks ∪ auxiliaires ; quality et epsilon voyagent dans l'en-tête.

use std::path::Path;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::info;

use crate::compression::compress;
use crate::container;
use crate::decoder::PacketDecoder;
use crate::distribution::OnlineDistribution;
use crate::encoder::{
    prepare_chunks, should_drop, xor_fold, DropOracle, EncoderConfig, SeedGenerator,
};
use crate::error::{FountainError, Result};
use crate::packet::{Packet, PacketFamily};
use crate::selection::{choose_chunk_indices, online_aux_count, online_aux_membership};

pub struct OnlineEncoder {
    config: EncoderConfig,
    dist: OnlineDistribution,
    quality: u32,
    epsilon: f64,
    /// chunks ‖ blocs auxiliaires
    extended: Vec<Vec<u8>>,
    chunk_size: usize,
    number_of_chunks: usize,
    aux_count: usize,
    packets: Vec<Packet>,
    seeds: SeedGenerator,
    rule_drops: usize,
}

impl OnlineEncoder {
    pub fn new(
        file_name: &str,
        data: &[u8],
        quality: u32,
        epsilon: f64,
        config: EncoderConfig,
    ) -> Result<Self> {
        if quality == 0 {
            return Err(FountainError::Encoding(
                "quality doit être au moins 1".to_string(),
            ));
        }
        let dist = OnlineDistribution::new(epsilon)?;
        let data = compress(data, config.compression)?;
        let prepared = prepare_chunks(file_name, &data, &config)?;
        let number_of_chunks = prepared.number_of_chunks;
        if number_of_chunks < dist.size() {
            return Err(FountainError::Encoding(format!(
                "epsilon {} trop petit pour {} chunks (support de {})",
                epsilon,
                number_of_chunks,
                dist.size()
            )));
        }

        let aux_count = online_aux_count(number_of_chunks, quality, epsilon);
        let membership = online_aux_membership(number_of_chunks, quality, aux_count);
        let mut extended = prepared.chunks;
        for aux in &membership {
            let block = xor_fold(
                aux.iter().map(|i| extended[*i].as_slice()),
                prepared.chunk_size,
            );
            extended.push(block);
        }

        let seeds = SeedGenerator::new(config.sequential_seeds, config.wire.id.max_value());
        Ok(Self {
            config,
            dist,
            quality,
            epsilon,
            extended,
            chunk_size: prepared.chunk_size,
            number_of_chunks,
            aux_count,
            packets: Vec::new(),
            seeds,
            rule_drops: 0,
        })
    }

    /// Construit le check block de graine donnée
    pub fn packet_from_seed(&self, seed: u32) -> Result<Packet> {
        let degree = self.dist.sample(seed as u64);
        let used_chunks =
            choose_chunk_indices(self.number_of_chunks + self.aux_count, degree, seed as u64)?;
        let payload = xor_fold(
            used_chunks.iter().map(|i| self.extended[*i].as_slice()),
            self.chunk_size,
        );
        Ok(Packet::new(
            seed,
            self.number_of_chunks,
            used_chunks,
            payload,
            PacketFamily::Online {
                quality: self.quality,
                epsilon: self.epsilon as f32,
            },
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

    /// Borne inférieure théorique du nombre de paquets nécessaires
    pub fn estimated_packets_needed(&self) -> usize {
        ((1.0 + self.epsilon) * (self.number_of_chunks + self.aux_count) as f64).ceil() as usize
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
            "encodage Online: {} paquets pour {} chunks (+{} blocs auxiliaires)",
            self.packets.len(),
            self.number_of_chunks,
            self.aux_count
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

    pub fn aux_block_count(&self) -> usize {
        self.aux_count
    }

    pub fn rule_drops(&self) -> usize {
        self.rule_drops
    }

    pub fn save_to_folder(&self, dir: &Path, as_dna: bool) -> Result<()> {
        let ending = if as_dna { ".ONLINE_DNA" } else { ".ONLINE" };
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
        let ending = if as_dna { ".ONLINE_DNA" } else { ".ONLINE" };
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
