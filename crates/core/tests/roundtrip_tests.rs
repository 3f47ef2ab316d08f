//! Tests de roundtrip pour les trois familles de codes
//!
//! Chaque test encode un fichier, fait transiter les paquets par un
//! support de persistance, puis vérifie que le décodage restitue
//! exactement les octets d'origine.

use fontaine_core::{
    CompressionType, DecoderConfig, Distribution, EncoderConfig, ErrorCorrection, LtDecoder,
    LtEncoder, OnlineDecoder, OnlineEncoder, PacketDecoder, RobustSolitonDistribution,
    Ru10Decoder, Ru10Encoder, WireFormat,
};

fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect()
}

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("fontaine_rt_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn robust_dist(n: usize) -> Distribution {
    Distribution::RobustSoliton(RobustSolitonDistribution::new(n, 4, 0.5).unwrap())
}

/// Encode en LT jusqu'à ce qu'un pseudo-décodeur exact valide la
/// reconstructibilité, puis retourne l'encodeur prêt à sauvegarder.
fn lt_encode(data: &[u8], config: EncoderConfig) -> LtEncoder {
    let mut encoder = LtEncoder::new("fichier.bin", data, robust_dist(8), config).unwrap();
    let n = encoder.number_of_chunks();
    let mut pseudo = LtDecoder::new(
        robust_dist(n),
        DecoderConfig {
            static_number_of_chunks: Some(n),
            use_header_chunk: false,
            ..Default::default()
        },
    );
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();
    encoder
}

#[test]
fn test_lt_roundtrip_stream() {
    let data = sample_data(100);
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: true,
        ..Default::default()
    };
    let encoder = lt_encode(&data, config);

    let mut stream = Vec::new();
    encoder.save_to_stream(&mut stream).unwrap();

    let mut decoder = LtDecoder::new(robust_dist(8), DecoderConfig::default());
    assert!(decoder.decode_stream(&mut stream.as_slice()).unwrap());
    let result = decoder.reconstruct(false).unwrap();
    assert_eq!(result.data, data);
    assert_eq!(result.file_name.as_deref(), Some("fichier.bin"));
    assert!(!result.dirty);
}

#[test]
fn test_lt_roundtrip_folder_dna() {
    let data = sample_data(177);
    let dir = temp_dir("lt_dna");
    let config = EncoderConfig {
        chunk_size: 32,
        insert_header: true,
        ..Default::default()
    };
    let encoder = lt_encode(&data, config);
    encoder.save_to_folder(&dir, true).unwrap();

    let mut decoder = LtDecoder::new(robust_dist(8), DecoderConfig::default());
    assert!(decoder.decode_folder(&dir, ".LT_DNA", true).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_lt_roundtrip_with_compression() {
    // données répétitives : la compression mord, le roundtrip reste exact
    let data = vec![0x5Au8; 1024];
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: true,
        compression: CompressionType::Lz4,
        ..Default::default()
    };
    let encoder = lt_encode(&data, config);
    let mut stream = Vec::new();
    encoder.save_to_stream(&mut stream).unwrap();

    let mut decoder = LtDecoder::new(
        robust_dist(8),
        DecoderConfig {
            compression: CompressionType::Lz4,
            ..Default::default()
        },
    );
    assert!(decoder.decode_stream(&mut stream.as_slice()).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
}

#[test]
fn test_lt_partial_reconstruction_is_flagged_dirty() {
    // seuls deux paquets de degré 1 : reconstruction partielle
    let data = sample_data(64);
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: false,
        ..Default::default()
    };
    let mut encoder =
        LtEncoder::new("x.bin", &data, robust_dist(4), config).unwrap();
    let n = encoder.number_of_chunks();
    assert_eq!(n, 4);

    // deux paquets de degré 1 portant deux chunks distincts
    let mut degree_one: Vec<fontaine_core::Packet> = Vec::new();
    let mut solved = std::collections::BTreeSet::new();
    for seed in 0..2000u32 {
        let p = encoder.create_new_packet(Some(seed)).unwrap();
        if p.degree() == 1 && solved.insert(*p.used_chunks.iter().next().unwrap()) {
            degree_one.push(p);
            if degree_one.len() == 2 {
                break;
            }
        }
    }
    assert_eq!(degree_one.len(), 2);

    let mut decoder = LtDecoder::new(
        robust_dist(4),
        DecoderConfig {
            static_number_of_chunks: Some(4),
            use_header_chunk: false,
            ..Default::default()
        },
    );
    for packet in degree_one {
        decoder.input_new_packet(packet).unwrap();
    }
    // décodage complet impossible
    assert!(matches!(
        decoder.reconstruct(false),
        Err(fontaine_core::FountainError::InsufficientData { .. })
    ));
    // mais la sauvegarde « au mieux » reste possible
    let partial = decoder.reconstruct(true).unwrap();
    assert!(partial.dirty);
    assert_eq!(partial.data.len(), 64);
    assert_eq!(partial.missing_chunks.len(), 4 - solved.len());
    for chunk in 0..4usize {
        let slice = &partial.data[chunk * 16..(chunk + 1) * 16];
        if solved.contains(&chunk) {
            assert_eq!(slice, &data[chunk * 16..(chunk + 1) * 16]);
        } else {
            assert!(slice.iter().all(|b| *b == 0));
        }
    }
}

#[test]
fn test_ru10_roundtrip_folder() {
    let data = sample_data(300);
    let dir = temp_dir("ru10");
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: true,
        wire: WireFormat::ru10_default(),
        ..Default::default()
    };
    let mut encoder = Ru10Encoder::new("archive.tar", &data, config).unwrap();
    let n = encoder.number_of_chunks();
    let mut pseudo = Ru10Decoder::pseudo(n);
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();
    encoder.save_to_folder(&dir, false).unwrap();

    let mut decoder = Ru10Decoder::new(DecoderConfig {
        wire: WireFormat::ru10_default(),
        ..Default::default()
    });
    assert!(decoder.decode_folder(&dir, ".RU10", false).unwrap());
    let result = decoder.reconstruct(false).unwrap();
    assert_eq!(result.data, data);
    assert_eq!(result.file_name.as_deref(), Some("archive.tar"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_ru10_roundtrip_zip_dna_with_crc() {
    let data = sample_data(200);
    let dir = temp_dir("ru10_zip");
    let path = dir.join("paquets.zip");
    let config = EncoderConfig {
        chunk_size: 25,
        insert_header: false,
        wire: WireFormat::ru10_default(),
        error_correction: ErrorCorrection::Crc32,
        ..Default::default()
    };
    let mut encoder = Ru10Encoder::new("d.bin", &data, config).unwrap();
    let n = encoder.number_of_chunks();
    let mut pseudo = Ru10Decoder::pseudo(n);
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();
    encoder.save_to_zip(&path, true).unwrap();

    let mut decoder = Ru10Decoder::new(DecoderConfig {
        wire: WireFormat::ru10_default(),
        error_correction: ErrorCorrection::Crc32,
        use_header_chunk: false,
        ..Default::default()
    });
    assert!(decoder.decode_zip(&path, true).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_online_roundtrip_fasta() {
    let data = sample_data(256);
    let dir = temp_dir("online");
    let path = dir.join("paquets.fasta");
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: true,
        wire: WireFormat::online_default(),
        ..Default::default()
    };
    let quality = 3;
    let epsilon = 0.5;
    let mut encoder =
        OnlineEncoder::new("seq.fastq", &data, quality, epsilon, config).unwrap();
    let n = encoder.number_of_chunks();
    let mut pseudo = OnlineDecoder::pseudo(n, quality, epsilon);
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();
    encoder.save_to_fasta(&path).unwrap();

    let mut decoder = OnlineDecoder::new(DecoderConfig {
        wire: WireFormat::online_default(),
        ..Default::default()
    });
    assert!(decoder.decode_fasta(&path).unwrap());
    let result = decoder.reconstruct(false).unwrap();
    assert_eq!(result.data, data);
    assert_eq!(result.file_name.as_deref(), Some("seq.fastq"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_online_roundtrip_stream_reed_solomon() {
    // 16 chunks : plus que le support de la distribution (epsilon = 0.5)
    let data = sample_data(256);
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: false,
        wire: WireFormat::online_default(),
        error_correction: ErrorCorrection::ReedSolomon { repair_symbols: 4 },
        ..Default::default()
    };
    let quality = 5;
    let epsilon = 0.5;
    let mut encoder = OnlineEncoder::new("r.bin", &data, quality, epsilon, config).unwrap();
    let mut pseudo = OnlineDecoder::pseudo(encoder.number_of_chunks(), quality, epsilon);
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();

    let mut stream = Vec::new();
    encoder.save_to_stream(&mut stream).unwrap();

    let mut decoder = OnlineDecoder::new(DecoderConfig {
        wire: WireFormat::online_default(),
        error_correction: ErrorCorrection::ReedSolomon { repair_symbols: 4 },
        use_header_chunk: false,
        ..Default::default()
    });
    assert!(decoder.decode_stream(&mut stream.as_slice()).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
}

#[test]
fn test_lt_roundtrip_dna_reed_solomon_fasta() {
    // Reed-Solomon en domaine ADN : une base par symbole de GF(4)
    let data = sample_data(48);
    let dir = temp_dir("lt_dna_rs");
    let path = dir.join("paquets.fasta");
    let config = EncoderConfig {
        chunk_size: 12,
        insert_header: false,
        error_correction: ErrorCorrection::DnaReedSolomon { repair_symbols: 2 },
        ..Default::default()
    };
    let encoder = lt_encode(&data, config);
    encoder.save_to_fasta(&path).unwrap();

    let mut decoder = LtDecoder::new(
        robust_dist(8),
        DecoderConfig {
            error_correction: ErrorCorrection::DnaReedSolomon { repair_symbols: 2 },
            use_header_chunk: false,
            ..Default::default()
        },
    );
    assert!(decoder.decode_fasta(&path).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_static_number_of_chunks_shrinks_wire() {
    // le champ number_of_chunks disparaît du fil quand il est connu des
    // deux côtés
    let data = sample_data(64);
    let config = EncoderConfig {
        chunk_size: 16,
        insert_header: false,
        wire: WireFormat::lt_default().with_static_number_of_chunks(),
        ..Default::default()
    };
    let mut encoder = LtEncoder::new("s.bin", &data, robust_dist(4), config).unwrap();
    let n = encoder.number_of_chunks();
    let mut pseudo = LtDecoder::new(
        robust_dist(n),
        DecoderConfig {
            static_number_of_chunks: Some(n),
            use_header_chunk: false,
            ..Default::default()
        },
    );
    encoder.encode_until_decodable(&mut pseudo, None).unwrap();

    let mut stream = Vec::new();
    encoder.save_to_stream(&mut stream).unwrap();

    let mut decoder = LtDecoder::new(
        robust_dist(n),
        DecoderConfig {
            wire: WireFormat::lt_default().with_static_number_of_chunks(),
            static_number_of_chunks: Some(n),
            use_header_chunk: false,
            ..Default::default()
        },
    );
    assert!(decoder.decode_stream(&mut stream.as_slice()).unwrap());
    assert_eq!(decoder.reconstruct(false).unwrap().data, data);
}
