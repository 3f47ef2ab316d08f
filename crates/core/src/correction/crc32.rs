//! CRC-32 (IEEE 802.3, compatible zlib)
//!
//! Variante réfléchie, polynôme 0xEDB88320, valeur initiale et XOR final
//! 0xFFFFFFFF. Table précalculée à la construction. Sérialisé en
//! little-endian en queue de paquet.

use crate::error::{FountainError, Result};

/// Polynôme générateur réfléchi (IEEE 802.3)
const POLYNOMIAL: u32 = 0xEDB8_8320;

pub struct Crc32 {
    table: [u32; 256],
}

impl Default for Crc32 {
    fn default() -> Self {
        let mut table = [0u32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u32;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ POLYNOMIAL
                } else {
                    crc >> 1
                };
            }
            *entry = crc;
        }
        Self { table }
    }
}

impl Crc32 {
    /// Calcule la somme de contrôle des données
    pub fn checksum(&self, data: &[u8]) -> u32 {
        let mut crc = 0xFFFF_FFFFu32;
        for byte in data {
            let index = ((crc ^ *byte as u32) & 0xFF) as usize;
            crc = (crc >> 8) ^ self.table[index];
        }
        crc ^ 0xFFFF_FFFF
    }

    /// Ajoute la somme de contrôle (4 octets little-endian) en queue
    pub fn append(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = payload.to_vec();
        out.extend_from_slice(&self.checksum(payload).to_le_bytes());
        out
    }

    /// Vérifie et retire la somme de contrôle
    pub fn strip(&self, packed: &[u8]) -> Result<Vec<u8>> {
        if packed.len() < 4 {
            return Err(FountainError::CorruptPacket(
                "paquet trop court pour contenir un CRC-32".to_string(),
            ));
        }
        let (payload, trailer) = packed.split_at(packed.len() - 4);
        let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let computed = self.checksum(payload);
        if stored != computed {
            return Err(FountainError::CorruptPacket(format!(
                "CRC invalide: {:#010x} != {:#010x}",
                stored, computed
            )));
        }
        Ok(payload.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // Vecteur de référence classique ("123456789" -> 0xCBF43926)
        let crc = Crc32::default();
        assert_eq!(crc.checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        let crc = Crc32::default();
        assert_eq!(crc.checksum(b""), 0);
    }

    #[test]
    fn test_append_strip() {
        let crc = Crc32::default();
        let packed = crc.append(b"payload");
        assert_eq!(crc.strip(&packed).unwrap(), b"payload");
    }

    #[test]
    fn test_detects_flip() {
        let crc = Crc32::default();
        let mut packed = crc.append(b"payload");
        packed[0] ^= 0x01;
        assert!(crc.strip(&packed).is_err());
    }

    #[test]
    fn test_truncated_packet() {
        let crc = Crc32::default();
        assert!(crc.strip(&[0x01, 0x02]).is_err());
    }
}
