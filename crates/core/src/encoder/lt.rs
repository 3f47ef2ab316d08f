//! Encodeur LT
//!
//! Tirage du degré dans la distribution configurée, sélection des
//! chunks par la graine du paquet, repli XOR. La graine transmise
//! suffit au décodeur pour re-dériver l'ensemble exact.

use std::path::Path;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::info;

use crate::compression::compress;
use crate::container;
use crate::decoder::PacketDecoder;
use crate::distribution::Distribution;
use crate::encoder::{
    prepare_chunks, should_drop, xor_fold, DropOracle, EncoderConfig, SeedGenerator,
};
use crate::error::{FountainError, Result};
use crate::packet::{Packet, PacketFamily};
use crate::selection::choose_chunk_indices;

pub struct LtEncoder {
    config: EncoderConfig,
    dist: Distribution,
    chunks: Vec<Vec<u8>>,
    chunk_size: usize,
    number_of_chunks: usize,
    packets: Vec<Packet>,
    seeds: SeedGenerator,
    rule_drops: usize,
}

impl LtEncoder {
    /// Prépare l'encodeur : compression éventuelle, découpage en
    /// chunks, chunk d'en-tête, mise à jour de la distribution sur le
    /// N final.
    pub fn new(
        file_name: &str,
        data: &[u8],
        mut dist: Distribution,
        config: EncoderConfig,
    ) -> Result<Self> {
        let data = compress(data, config.compression)?;
        let prepared = prepare_chunks(file_name, &data, &config)?;
        dist.update_number_of_chunks(prepared.number_of_chunks);
        let seeds = SeedGenerator::new(config.sequential_seeds, config.wire.id.max_value());
        Ok(Self {
            config,
            dist,
            chunks: prepared.chunks,
            chunk_size: prepared.chunk_size,
            number_of_chunks: prepared.number_of_chunks,
            packets: Vec::new(),
            seeds,
            rule_drops: 0,
        })
    }

    /// Construit le paquet de graine donnée (pur : mêmes entrées, même
    /// paquet)
    pub fn packet_from_seed(&self, seed: u32) -> Result<Packet> {
        let degree = self.dist.sample(seed as u64);
        let used_chunks = choose_chunk_indices(self.number_of_chunks, degree, seed as u64)?;
        let payload = xor_fold(
            used_chunks.iter().map(|i| self.chunks[*i].as_slice()),
            self.chunk_size,
        );
        Ok(Packet::new(
            seed,
            self.number_of_chunks,
            used_chunks,
            payload,
            PacketFamily::Lt,
        ))
    }

    /// Crée un paquet avec une graine imposée ou la prochaine du
    /// générateur
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
    ///
    /// Un paquet accepté n'est jamais repris ; les doublons éventuels
    /// sont l'affaire du décodeur.
    pub fn encode_to_packets(&mut self, oracle: Option<&dyn DropOracle>) -> Result<usize> {
        let target = ((self.number_of_chunks as f64) * (1.0 + self.config.overhead)).ceil()
            as usize;
        let target = target.max(self.number_of_chunks);
        while self.packets.len() < target {
            let packet = self.next_accepted_packet(oracle)?;
            self.packets.push(packet);
        }
        info!(
            "encodage LT: {} paquets pour {} chunks ({} rejets de l'oracle)",
            self.packets.len(),
            self.number_of_chunks,
            self.rule_drops
        );
        Ok(self.packets.len())
    }

    /// Génère des paquets jusqu'à ce que le pseudo-décodeur signale que
    /// le fichier est reconstructible
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

    /// Génération massivement parallèle : un paquet par graine, chaque
    /// tâche possède son propre générateur dérivé de sa graine
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

    /// Paquets rejetés par l'oracle de chute
    pub fn rule_drops(&self) -> usize {
        self.rule_drops
    }

    /// Sauvegarde un paquet par fichier (`.LT` ou `.LT_DNA`)
    pub fn save_to_folder(&self, dir: &Path, as_dna: bool) -> Result<()> {
        let ending = if as_dna { ".LT_DNA" } else { ".LT" };
        container::write_packets_to_folder(
            dir,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
            as_dna,
            ending,
        )
    }

    /// Sauvegarde dans une archive zip
    pub fn save_to_zip(&self, path: &Path, as_dna: bool) -> Result<()> {
        let ending = if as_dna { ".LT_DNA" } else { ".LT" };
        container::write_packets_to_zip(
            path,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
            as_dna,
            ending,
        )
    }

    /// Sauvegarde en enregistrements texte appariés
    pub fn save_to_fasta(&self, path: &Path) -> Result<()> {
        container::write_packets_to_fasta(
            path,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
        )
    }

    /// Sauvegarde en flux binaire à enregistrements préfixés
    pub fn save_to_stream<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
        container::write_packets_to_stream(
            writer,
            &self.packets,
            &self.config.wire,
            &self.config.error_correction,
        )
    }
}
