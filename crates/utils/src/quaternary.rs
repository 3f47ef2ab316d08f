//! Transcodage octets <-> quaternaire (alphabet ADN)
//!
//! Mapping fixe : A = 00, C = 01, G = 10, T = 11 (2 bits par base,
//! 4 bases par octet, poids forts en premier).

/// Erreur de transcodage : caractère hors alphabet A/C/G/T
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuaternaryError {
    /// Caractère fautif
    pub character: char,
    /// Position dans la chaîne d'entrée
    pub position: usize,
}

impl std::fmt::Display for QuaternaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "caractère '{}' hors alphabet ACGT (position {})",
            self.character, self.position
        )
    }
}

impl std::error::Error for QuaternaryError {}

fn base_of(two_bits: u8) -> char {
    match two_bits & 0b11 {
        0b00 => 'A',
        0b01 => 'C',
        0b10 => 'G',
        _ => 'T',
    }
}

fn bits_of(base: char) -> Option<u8> {
    match base {
        'A' => Some(0b00),
        'C' => Some(0b01),
        'G' => Some(0b10),
        'T' => Some(0b11),
        _ => None,
    }
}

/// Convertit des octets en chaîne ADN (4 bases par octet)
pub fn bytes_to_dna(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 4);
    for byte in data {
        out.push(base_of(byte >> 6));
        out.push(base_of(byte >> 4));
        out.push(base_of(byte >> 2));
        out.push(base_of(*byte));
    }
    out
}

/// Convertit une chaîne ADN en octets
///
/// La longueur doit être un multiple de 4 ; les bases excédentaires en fin
/// de chaîne sont ignorées (symétrique du décodage du médium physique).
pub fn dna_to_bytes(dna: &str) -> Result<Vec<u8>, QuaternaryError> {
    let mut out = Vec::with_capacity(dna.len() / 4);
    let mut acc = 0u8;
    let mut filled = 0usize;
    for (pos, base) in dna.chars().enumerate() {
        let bits = bits_of(base).ok_or(QuaternaryError {
            character: base,
            position: pos,
        })?;
        acc = (acc << 2) | bits;
        filled += 1;
        if filled == 4 {
            out.push(acc);
            acc = 0;
            filled = 0;
        }
    }
    Ok(out)
}

/// Convertit une chaîne ADN en symboles 2 bits (un par octet)
///
/// Utilisé par le Reed-Solomon en domaine ADN, où chaque base est un
/// symbole de GF(4).
pub fn dna_to_quads(dna: &str) -> Result<Vec<u8>, QuaternaryError> {
    dna.chars()
        .enumerate()
        .map(|(pos, base)| {
            bits_of(base).ok_or(QuaternaryError {
                character: base,
                position: pos,
            })
        })
        .collect()
}

/// Convertit des symboles 2 bits en chaîne ADN (un symbole par base)
pub fn quads_to_dna(quads: &[u8]) -> String {
    quads.iter().map(|q| base_of(*q)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bytes_to_dna_mapping() {
        // 0b10101010 -> paires (10,10,10,10) -> GGGG
        assert_eq!(bytes_to_dna(&[0b10101010]), "GGGG");
        assert_eq!(bytes_to_dna(&[0b00011011]), "ACGT");
        assert_eq!(bytes_to_dna(&[0x00, 0xFF]), "AAAATTTT");
    }

    #[test]
    fn test_dna_to_bytes_invalid_base() {
        let err = dna_to_bytes("ACGN").unwrap_err();
        assert_eq!(err.character, 'N');
        assert_eq!(err.position, 3);
    }

    #[test]
    fn test_quads_roundtrip() {
        let quads = vec![0, 1, 2, 3, 3, 0];
        assert_eq!(quads_to_dna(&quads), "ACGTTA");
        assert_eq!(dna_to_quads("ACGTTA").unwrap(), quads);
    }

    proptest! {
        #[test]
        fn prop_bytes_dna_roundtrip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let dna = bytes_to_dna(&data);
            prop_assert_eq!(dna_to_bytes(&dna).unwrap(), data);
        }
    }
}
