//! Paquet fontaine et format de fil
//!
//! Un paquet transporte un identifiant (qui sert aussi de graine au
//! tirage des chunks), le nombre total de chunks, et le payload replié
//! par XOR. Les largeurs des champs d'en-tête sont configurables champ
//! par champ ; les entiers non triviaux passent par un masque XOR fixe
//! avant sérialisation — artefact historique reproduit bit à bit, sans
//! aucune prétention cryptographique.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use fontaine_utils::{bytes_to_dna, quads_to_dna};

use crate::correction::ErrorCorrection;
use crate::error::{FountainError, Result};

/// Masque XOR historique pour les champs 16 bits
const MASK_U16: u16 = 0b1111_1001_1100_0011;
/// Masque XOR historique pour les champs 32 bits
const MASK_U32: u32 = 0b1111_1001_1100_0011_0110_1111_1001_1100;
/// Masque XOR historique pour les champs 64 bits
const MASK_U64: u64 = 0xF9C3_6F9C_F9C3_6F9C;

/// Largeur d'un champ d'en-tête ; `None` supprime entièrement le champ
/// (sa valeur est alors supposée connue des deux côtés).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Field {
    None,
    U8,
    U16,
    #[default]
    U32,
    U64,
}

impl Field {
    /// Taille sérialisée en octets
    pub fn size(&self) -> usize {
        match self {
            Field::None => 0,
            Field::U8 => 1,
            Field::U16 => 2,
            Field::U32 => 4,
            Field::U64 => 8,
        }
    }

    /// Applique le masque XOR historique (involutif, U8 non masqué)
    pub fn mask(&self, value: u64) -> u64 {
        match self {
            Field::None | Field::U8 => value,
            Field::U16 => value ^ MASK_U16 as u64,
            Field::U32 => value ^ MASK_U32 as u64,
            Field::U64 => value ^ MASK_U64,
        }
    }

    /// Valeur maximale représentable (bornes des graines aléatoires)
    pub fn max_value(&self) -> u64 {
        match self {
            Field::None => 0,
            Field::U8 => u8::MAX as u64,
            Field::U16 => u16::MAX as u64,
            Field::U32 => u32::MAX as u64,
            Field::U64 => u64::MAX,
        }
    }

    /// Sérialise la valeur masquée en little-endian
    pub fn pack(&self, value: u64, out: &mut Vec<u8>) -> Result<()> {
        if *self != Field::None && value > self.max_value() {
            return Err(FountainError::Encoding(format!(
                "valeur {} trop grande pour un champ de {} octets",
                value,
                self.size()
            )));
        }
        let masked = self.mask(value);
        match self {
            Field::None => {}
            Field::U8 => out.push(masked as u8),
            Field::U16 => out.extend_from_slice(&(masked as u16).to_le_bytes()),
            Field::U32 => out.extend_from_slice(&(masked as u32).to_le_bytes()),
            Field::U64 => out.extend_from_slice(&masked.to_le_bytes()),
        }
        Ok(())
    }

    /// Lit et démasque une valeur ; un en-tête tronqué est un paquet
    /// corrompu, pas une panique.
    pub fn unpack(&self, input: &[u8], offset: &mut usize) -> Result<u64> {
        let size = self.size();
        if input.len() < *offset + size {
            return Err(FountainError::CorruptPacket(format!(
                "en-tête tronqué: {} octets disponibles, {} requis",
                input.len() - *offset,
                size
            )));
        }
        let bytes = &input[*offset..*offset + size];
        *offset += size;
        let raw = match self {
            Field::None => 0,
            Field::U8 => bytes[0] as u64,
            Field::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u64,
            Field::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64,
            Field::U64 => u64::from_le_bytes(bytes.try_into().expect("taille vérifiée")),
        };
        Ok(self.mask(raw))
    }
}

/// Largeurs des champs d'en-tête, configurables par déploiement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFormat {
    /// Préfixe de longueur pour les flux mono-fichier
    pub packet_len: Field,
    /// Nombre total de chunks ; `None` en mode statique
    pub number_of_chunks: Field,
    /// Degré explicite (LT en mode non implicite seulement)
    pub degree: Field,
    /// Identifiant du paquet (graine)
    pub id: Field,
    /// Qualité (Online seulement)
    pub quality: Field,
    /// Epsilon f32 présent dans l'en-tête (Online seulement)
    pub carries_epsilon: bool,
    /// Longueur du dernier chunk dans le chunk d'en-tête
    pub last_chunk_len: Field,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self::lt_default()
    }
}

impl WireFormat {
    /// Défauts LT : tout en 32 bits, degré implicite
    pub fn lt_default() -> Self {
        Self {
            packet_len: Field::U32,
            number_of_chunks: Field::U32,
            degree: Field::None,
            id: Field::U32,
            quality: Field::None,
            carries_epsilon: false,
            last_chunk_len: Field::U32,
        }
    }

    /// Défauts RU10 : [number_of_chunks][id]
    pub fn ru10_default() -> Self {
        Self {
            packet_len: Field::U32,
            number_of_chunks: Field::U32,
            degree: Field::None,
            id: Field::U32,
            quality: Field::None,
            carries_epsilon: false,
            last_chunk_len: Field::U32,
        }
    }

    /// Défauts Online : [number_of_chunks][quality][epsilon][id]
    pub fn online_default() -> Self {
        Self {
            packet_len: Field::U32,
            number_of_chunks: Field::U32,
            degree: Field::None,
            id: Field::U32,
            quality: Field::U32,
            carries_epsilon: true,
            last_chunk_len: Field::U32,
        }
    }

    /// Variante sans champ number_of_chunks (valeur fournie hors bande)
    pub fn with_static_number_of_chunks(mut self) -> Self {
        self.number_of_chunks = Field::None;
        self
    }
}

/// Famille de code du paquet, avec les paramètres propres à la famille
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum PacketFamily {
    #[default]
    Lt,
    Ru10,
    Online {
        quality: u32,
        epsilon: f32,
    },
}

/// Paquet fontaine : unité de transmission
#[derive(Debug, Clone)]
pub struct Packet {
    /// Identifiant, qui sert aussi de graine au tirage des chunks
    pub id: u32,
    /// Nombre total de chunks du fichier source
    pub total_chunks: usize,
    /// Indices participant au XOR (triés, sans doublon)
    pub used_chunks: BTreeSet<usize>,
    /// XOR des chunks référencés
    pub payload: Vec<u8>,
    /// Score de l'oracle de chute, sans effet sur le décodage
    pub error_prob: Option<f32>,
    /// Famille de code
    pub family: PacketFamily,
}

impl Packet {
    pub fn new(
        id: u32,
        total_chunks: usize,
        used_chunks: BTreeSet<usize>,
        payload: Vec<u8>,
        family: PacketFamily,
    ) -> Self {
        Self {
            id,
            total_chunks,
            used_chunks,
            payload,
            error_prob: None,
            family,
        }
    }

    /// Degré du paquet : nombre de chunks repliés dans le payload
    pub fn degree(&self) -> usize {
        self.used_chunks.len()
    }

    /// Réduction destructive : retire la contribution d'un autre paquet
    ///
    /// Opération involutive (l'appliquer deux fois restaure l'état).
    /// Invalide toute forme empaquetée : le code de correction calculé
    /// avant réduction ne couvre plus ce contenu.
    pub fn xor_and_remove(&mut self, other: &Packet) {
        for index in &other.used_chunks {
            if !self.used_chunks.remove(index) {
                self.used_chunks.insert(*index);
            }
        }
        for (dst, src) in self.payload.iter_mut().zip(&other.payload) {
            *dst ^= src;
        }
    }

    /// Projection booléenne des chunks utilisés sur 0..bound
    pub fn used_as_bool_array(&self, bound: usize) -> Vec<bool> {
        let mut out = vec![false; bound];
        for index in &self.used_chunks {
            if *index < bound {
                out[*index] = true;
            }
        }
        out
    }

    /// Sérialise l'en-tête + payload, puis applique la correction
    /// d'erreurs. Ordre : [number_of_chunks?][degré?][qualité?]
    /// [epsilon?][id][payload][code].
    pub fn pack(&self, wire: &WireFormat, correction: &ErrorCorrection) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.payload.len() + 16);
        wire.number_of_chunks
            .pack(self.total_chunks as u64, &mut out)?;
        wire.degree.pack(self.degree() as u64, &mut out)?;
        if let PacketFamily::Online { quality, epsilon } = self.family {
            wire.quality.pack(quality as u64, &mut out)?;
            if wire.carries_epsilon {
                out.extend_from_slice(&epsilon.to_le_bytes());
            }
        }
        wire.id.pack(self.id as u64, &mut out)?;
        out.extend_from_slice(&self.payload);
        correction.encode(&out)
    }

    /// Forme flux : préfixe de longueur + forme empaquetée
    pub fn pack_with_len_prefix(
        &self,
        wire: &WireFormat,
        correction: &ErrorCorrection,
    ) -> Result<Vec<u8>> {
        let packed = self.pack(wire, correction)?;
        let mut out = Vec::with_capacity(packed.len() + wire.packet_len.size());
        // le préfixe de longueur n'est pas masqué
        match wire.packet_len {
            Field::None => {}
            Field::U8 => out.push(packed.len() as u8),
            Field::U16 => out.extend_from_slice(&(packed.len() as u16).to_le_bytes()),
            Field::U32 => out.extend_from_slice(&(packed.len() as u32).to_le_bytes()),
            Field::U64 => out.extend_from_slice(&(packed.len() as u64).to_le_bytes()),
        }
        out.extend(packed);
        Ok(out)
    }

    /// Forme ADN de la forme empaquetée
    ///
    /// En domaine ADN (Reed-Solomon sur GF(4)) chaque octet empaqueté est
    /// déjà un symbole 2 bits : une base par symbole. Sinon, quatre bases
    /// par octet.
    pub fn to_dna(&self, wire: &WireFormat, correction: &ErrorCorrection) -> Result<String> {
        let packed = self.pack(wire, correction)?;
        if correction.is_dna_domain() {
            Ok(quads_to_dna(&packed))
        } else {
            Ok(bytes_to_dna(&packed))
        }
    }
}

/// L'identité d'un paquet est (total_chunks, id, error_prob, famille) —
/// jamais l'égalité des payloads : deux paquets d'ids distincts peuvent
/// porter les mêmes octets et doivent rester distincts.
impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        self.total_chunks == other.total_chunks
            && self.id == other.id
            && self.error_prob == other.error_prob
            && std::mem::discriminant(&self.family) == std::mem::discriminant(&other.family)
    }
}

impl Eq for Packet {}

impl Hash for Packet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.total_chunks.hash(state);
        self.id.hash(state);
        self.error_prob.map(f32::to_bits).hash(state);
        std::mem::discriminant(&self.family).hash(state);
    }
}

impl PartialOrd for Packet {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordre : score d'erreur croissant quand les deux paquets sont notés,
/// sinon plus petit indice utilisé (les workflows d'optimisation gardent
/// les paquets les mieux notés en premier).
impl Ord for Packet {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self.error_prob, other.error_prob) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            _ => self
                .used_chunks
                .iter()
                .next()
                .cmp(&other.used_chunks.iter().next()),
        }
        .then_with(|| self.id.cmp(&other.id))
    }
}
