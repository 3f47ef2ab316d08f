//! Compression optionnelle du payload avant découpage en chunks

use serde::{Deserialize, Serialize};

use crate::error::{FountainError, Result};

/// Type de compression appliqué au fichier entier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CompressionType {
    #[default]
    None,
    Lz4,
    Zstd,
    /// Côté décodeur : essayer LZ4 puis Zstd, sinon données brutes
    Auto,
}

/// Compresse les données selon le type choisi
pub fn compress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::Lz4 => lz4::block::compress(data, None, true)
            .map_err(|e| FountainError::Encoding(format!("Erreur LZ4: {}", e))),
        CompressionType::Zstd => zstd::encode_all(data, 0)
            .map_err(|e| FountainError::Encoding(format!("Erreur Zstd: {}", e))),
        CompressionType::None | CompressionType::Auto => Ok(data.to_vec()),
    }
}

/// Décompresse les données ; en mode Auto, détection par essais successifs
pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::Lz4 => lz4::block::decompress(data, None)
            .map_err(|e| FountainError::Decoding(format!("Erreur décompression LZ4: {}", e))),
        CompressionType::Zstd => zstd::decode_all(data)
            .map_err(|e| FountainError::Decoding(format!("Erreur décompression Zstd: {}", e))),
        CompressionType::Auto => {
            if let Ok(decompressed) = lz4::block::decompress(data, None) {
                return Ok(decompressed);
            }
            if let Ok(decompressed) = zstd::decode_all(data) {
                return Ok(decompressed);
            }
            Ok(data.to_vec())
        }
        CompressionType::None => Ok(data.to_vec()),
    }
}
