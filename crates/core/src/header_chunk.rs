//! Chunk d'en-tête (chunk 0 réservé)
//!
//! Porte la longueur réelle du dernier chunk (pour retirer le bourrage à
//! la réassemblage) et le nom du fichier d'origine, terminé par 0x00.

use crate::error::{FountainError, Result};
use crate::packet::Field;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderChunk {
    /// Longueur utile du dernier chunk de données
    pub last_chunk_length: usize,
    /// Nom du fichier d'origine
    pub file_name: String,
}

impl HeaderChunk {
    /// Sérialise l'en-tête dans un chunk de `chunk_size` octets :
    /// [longueur dernier chunk][nom de fichier][0x00 de bourrage]
    pub fn encode(
        file_name: &str,
        last_chunk_length: usize,
        chunk_size: usize,
        last_chunk_len_field: Field,
    ) -> Result<Vec<u8>> {
        let name_bytes = file_name.as_bytes();
        let len_size = last_chunk_len_field.size();
        if name_bytes.len() + len_size >= chunk_size {
            return Err(FountainError::Encoding(format!(
                "chunks de {} octets trop petits pour l'en-tête ({} octets de nom)",
                chunk_size,
                name_bytes.len()
            )));
        }
        let mut out = Vec::with_capacity(chunk_size);
        // le champ de longueur n'est pas masqué (il vit dans le payload)
        match last_chunk_len_field {
            Field::None => {}
            Field::U8 => out.push(last_chunk_length as u8),
            Field::U16 => out.extend_from_slice(&(last_chunk_length as u16).to_le_bytes()),
            Field::U32 => out.extend_from_slice(&(last_chunk_length as u32).to_le_bytes()),
            Field::U64 => out.extend_from_slice(&(last_chunk_length as u64).to_le_bytes()),
        }
        out.extend_from_slice(name_bytes);
        out.resize(chunk_size, 0x00);
        Ok(out)
    }

    /// Relit l'en-tête depuis le payload du chunk 0 reconstruit
    pub fn decode(data: &[u8], last_chunk_len_field: Field) -> Result<Self> {
        let len_size = last_chunk_len_field.size();
        if data.len() < len_size + 1 {
            return Err(FountainError::Decoding(
                "chunk d'en-tête trop court".to_string(),
            ));
        }
        let last_chunk_length = match last_chunk_len_field {
            Field::None => 0,
            Field::U8 => data[0] as usize,
            Field::U16 => u16::from_le_bytes([data[0], data[1]]) as usize,
            Field::U32 => u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize,
            Field::U64 => {
                u64::from_le_bytes(data[..8].try_into().expect("taille vérifiée")) as usize
            }
        };
        let name_region = &data[len_size..];
        let name_end = name_region
            .iter()
            .position(|b| *b == 0x00)
            .unwrap_or(name_region.len());
        let file_name = String::from_utf8_lossy(&name_region[..name_end]).into_owned();
        Ok(Self {
            last_chunk_length,
            file_name,
        })
    }
}
