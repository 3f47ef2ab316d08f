//! Formats de conteneur et d'archive pour les paquets
//!
//! Quatre supports de persistance : flux binaire mono-fichier à
//! enregistrements préfixés par leur longueur, répertoire plat (un
//! paquet par fichier, nommage `<erreur>_<id>.<ext>`), archive zip des
//! mêmes entrées, et enregistrements texte appariés type FASTA (ligne
//! d'en-tête `>{erreur}_{id}` suivie d'une ligne de bases ACGT).
//!
//! Les lecteurs rendent des enregistrements bruts ; toute la gestion des
//! paquets corrompus vit dans la boucle de décodage.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use tracing::warn;

use fontaine_utils::{dna_to_bytes, dna_to_quads};

use crate::correction::ErrorCorrection;
use crate::error::{FountainError, Result};
use crate::packet::{Field, Packet, WireFormat};

/// Enregistrement brut lu depuis un support
#[derive(Debug, Clone)]
pub enum RawRecord {
    /// Octets prêts à être analysés, avec le score éventuel du nommage
    Binary {
        data: Vec<u8>,
        error_prob: Option<f32>,
    },
    /// Enregistrement illisible (transcodage ADN impossible, entrée vide)
    Corrupt(String),
}

/// Nom de fichier d'un paquet : `<erreur>_<id>` ou `<id>` seul
fn packet_file_name(packet: &Packet, file_ending: &str) -> String {
    match packet.error_prob {
        Some(p) => format!("{}_{}{}", (p * 100.0).ceil() as u32, packet.id, file_ending),
        None => format!("{}{}", packet.id, file_ending),
    }
}

/// Relit le score depuis un nom `<erreur>_<id>`
fn error_prob_from_name(name: &str) -> Option<f32> {
    let stem = name.split('.').next()?;
    let mut parts = stem.split('_');
    let first = parts.next()?;
    parts.next()?;
    first.parse::<f32>().ok().map(|e| e / 100.0)
}

fn packet_bytes(
    packet: &Packet,
    wire: &WireFormat,
    correction: &ErrorCorrection,
    as_dna: bool,
) -> Result<Vec<u8>> {
    if as_dna {
        Ok(packet.to_dna(wire, correction)?.into_bytes())
    } else {
        packet.pack(wire, correction)
    }
}

fn decode_dna_text(text: &str, correction: &ErrorCorrection) -> Result<Vec<u8>> {
    if correction.is_dna_domain() {
        Ok(dna_to_quads(text.trim_end())?)
    } else {
        Ok(dna_to_bytes(text.trim_end())?)
    }
}

/// Écrit les paquets dans un flux : [longueur][forme empaquetée]...
pub fn write_packets_to_stream<W: Write>(
    writer: &mut W,
    packets: &[Packet],
    wire: &WireFormat,
    correction: &ErrorCorrection,
) -> Result<()> {
    for packet in packets {
        writer.write_all(&packet.pack_with_len_prefix(wire, correction)?)?;
    }
    Ok(())
}

/// Relit les enregistrements d'un flux à préfixes de longueur
///
/// Boucle itérative bornée par la fin du flux : un préfixe tronqué
/// termine la lecture, il ne la fait pas paniquer.
pub fn read_records_from_stream<R: Read>(
    reader: &mut R,
    packet_len_field: Field,
) -> Result<Vec<RawRecord>> {
    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;
    let mut records = Vec::new();
    let mut offset = 0usize;
    while offset < buffer.len() {
        // le préfixe de longueur n'est pas masqué : unpack puis re-masque
        let len = match packet_len_field.unpack(&buffer, &mut offset) {
            Ok(unmasked) => packet_len_field.mask(unmasked) as usize,
            Err(_) => break,
        };
        if len == 0 || offset + len > buffer.len() {
            records.push(RawRecord::Corrupt(
                "enregistrement tronqué en fin de flux".to_string(),
            ));
            break;
        }
        records.push(RawRecord::Binary {
            data: buffer[offset..offset + len].to_vec(),
            error_prob: None,
        });
        offset += len;
    }
    Ok(records)
}

/// Écrit un paquet par fichier dans un répertoire plat
pub fn write_packets_to_folder(
    dir: &Path,
    packets: &[Packet],
    wire: &WireFormat,
    correction: &ErrorCorrection,
    as_dna: bool,
    file_ending: &str,
) -> Result<()> {
    fs::create_dir_all(dir)?;
    for packet in packets {
        let bytes = packet_bytes(packet, wire, correction, as_dna)?;
        fs::write(dir.join(packet_file_name(packet, file_ending)), bytes)?;
    }
    Ok(())
}

/// Relit un répertoire plat, trié par score croissant puis par nom
pub fn read_records_from_folder(
    dir: &Path,
    file_ending: &str,
    as_dna: bool,
    correction: &ErrorCorrection,
) -> Result<Vec<RawRecord>> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(file_ending))
        .collect();
    names.sort_by(|a, b| {
        let ea = error_prob_from_name(a).unwrap_or(f32::MAX);
        let eb = error_prob_from_name(b).unwrap_or(f32::MAX);
        ea.total_cmp(&eb).then_with(|| a.cmp(b))
    });

    let mut records = Vec::new();
    for name in names {
        let error_prob = error_prob_from_name(&name);
        let record = if as_dna {
            let text = fs::read_to_string(dir.join(&name))?;
            match decode_dna_text(&text, correction) {
                Ok(data) => RawRecord::Binary { data, error_prob },
                Err(e) => {
                    warn!("fichier {} illisible: {}", name, e);
                    RawRecord::Corrupt(name.clone())
                }
            }
        } else {
            RawRecord::Binary {
                data: fs::read(dir.join(&name))?,
                error_prob,
            }
        };
        records.push(record);
    }
    Ok(records)
}

/// Écrit les paquets dans une archive zip, triés par score croissant
pub fn write_packets_to_zip(
    path: &Path,
    packets: &[Packet],
    wire: &WireFormat,
    correction: &ErrorCorrection,
    as_dna: bool,
    file_ending: &str,
) -> Result<()> {
    let file = File::create(path)?;
    let mut archive = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();

    let mut ordered: Vec<&Packet> = packets.iter().collect();
    ordered.sort();
    for packet in ordered {
        archive
            .start_file(packet_file_name(packet, file_ending), options)
            .map_err(|e| FountainError::Encoding(format!("Erreur zip: {}", e)))?;
        archive.write_all(&packet_bytes(packet, wire, correction, as_dna)?)?;
    }
    archive
        .finish()
        .map_err(|e| FountainError::Encoding(format!("Erreur zip: {}", e)))?;
    Ok(())
}

/// Relit les entrées d'une archive zip, triées par score croissant
pub fn read_records_from_zip(
    path: &Path,
    as_dna: bool,
    correction: &ErrorCorrection,
) -> Result<Vec<RawRecord>> {
    let file = File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| FountainError::Decoding(format!("Erreur zip: {}", e)))?;

    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort_by(|a, b| {
        let ea = error_prob_from_name(a).unwrap_or(f32::MAX);
        let eb = error_prob_from_name(b).unwrap_or(f32::MAX);
        ea.total_cmp(&eb).then_with(|| a.cmp(b))
    });

    let mut records = Vec::new();
    for name in names {
        let mut entry = archive
            .by_name(&name)
            .map_err(|e| FountainError::Decoding(format!("Erreur zip: {}", e)))?;
        let error_prob = error_prob_from_name(&name);
        if as_dna {
            let mut text = String::new();
            if entry.read_to_string(&mut text).is_err() {
                records.push(RawRecord::Corrupt(name.clone()));
                continue;
            }
            match decode_dna_text(&text, correction) {
                Ok(data) => records.push(RawRecord::Binary { data, error_prob }),
                Err(e) => {
                    warn!("entrée {} illisible: {}", name, e);
                    records.push(RawRecord::Corrupt(name.clone()));
                }
            }
        } else {
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            records.push(RawRecord::Binary { data, error_prob });
        }
    }
    Ok(records)
}

/// Écrit les enregistrements texte appariés : `>{erreur}_{id}` + bases
pub fn write_packets_to_fasta(
    path: &Path,
    packets: &[Packet],
    wire: &WireFormat,
    correction: &ErrorCorrection,
) -> Result<()> {
    let mut file = File::create(path)?;
    for packet in packets {
        let error = packet
            .error_prob
            .map(|p| (p * 100.0).ceil() as u32)
            .unwrap_or(0);
        writeln!(file, ">{}_{}", error, packet.id)?;
        writeln!(file, "{}", packet.to_dna(wire, correction)?)?;
    }
    Ok(())
}

/// Relit des enregistrements appariés ; un en-tête mal formé vaut score
/// nul plutôt qu'une erreur
pub fn read_records_from_fasta(path: &Path, correction: &ErrorCorrection) -> Result<Vec<RawRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut pending_error: Option<f32> = None;
    let mut in_record = false;
    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            pending_error = header
                .split('_')
                .next()
                .and_then(|e| e.parse::<f32>().ok())
                .map(|e| e / 100.0);
            in_record = true;
        } else if in_record && !line.trim().is_empty() {
            match decode_dna_text(&line, correction) {
                Ok(data) => records.push(RawRecord::Binary {
                    data,
                    error_prob: pending_error,
                }),
                Err(e) => {
                    warn!("enregistrement illisible: {}", e);
                    records.push(RawRecord::Corrupt(line));
                }
            }
            in_record = false;
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PacketFamily;
    use std::collections::BTreeSet;

    fn sample_packet(id: u32, payload: &[u8]) -> Packet {
        Packet::new(
            id,
            4,
            BTreeSet::from([0usize]),
            payload.to_vec(),
            PacketFamily::Lt,
        )
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fontaine_container_{}_{}",
            tag,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_stream_roundtrip() {
        let wire = WireFormat::lt_default();
        let correction = ErrorCorrection::Nocode;
        let packets = vec![sample_packet(1, b"abcd"), sample_packet(2, b"efgh")];
        let mut buffer = Vec::new();
        write_packets_to_stream(&mut buffer, &packets, &wire, &correction).unwrap();
        let records =
            read_records_from_stream(&mut buffer.as_slice(), wire.packet_len).unwrap();
        assert_eq!(records.len(), 2);
        let expected = packets[0].pack(&wire, &correction).unwrap();
        match &records[0] {
            RawRecord::Binary { data, .. } => assert_eq!(*data, expected),
            RawRecord::Corrupt(_) => panic!("enregistrement corrompu inattendu"),
        }
    }

    #[test]
    fn test_stream_truncated_record() {
        let bytes = vec![10, 0, 0, 0, 1, 2, 3]; // annonce 10 octets, en donne 3
        let records = read_records_from_stream(&mut bytes.as_slice(), Field::U32).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], RawRecord::Corrupt(_)));
    }

    #[test]
    fn test_folder_roundtrip_binary() {
        let dir = temp_dir("folder");
        let wire = WireFormat::lt_default();
        let correction = ErrorCorrection::Nocode;
        let mut first = sample_packet(7, b"abcd");
        first.error_prob = Some(0.42);
        let packets = vec![first, sample_packet(3, b"efgh")];
        write_packets_to_folder(&dir, &packets, &wire, &correction, false, ".LT").unwrap();
        let records = read_records_from_folder(&dir, ".LT", false, &correction).unwrap();
        assert_eq!(records.len(), 2);
        // le paquet noté est lu en premier (score croissant)
        match &records[0] {
            RawRecord::Binary { error_prob, .. } => {
                assert_eq!(*error_prob, Some(0.42));
            }
            RawRecord::Corrupt(_) => panic!("enregistrement corrompu inattendu"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_zip_roundtrip_dna() {
        let dir = temp_dir("zip");
        let path = dir.join("packets.zip");
        let wire = WireFormat::lt_default();
        let correction = ErrorCorrection::Nocode;
        let packets = vec![sample_packet(1, b"abcd")];
        write_packets_to_zip(&path, &packets, &wire, &correction, true, ".LT_DNA").unwrap();
        let records = read_records_from_zip(&path, true, &correction).unwrap();
        assert_eq!(records.len(), 1);
        let expected = packets[0].pack(&wire, &correction).unwrap();
        match &records[0] {
            RawRecord::Binary { data, .. } => assert_eq!(*data, expected),
            RawRecord::Corrupt(_) => panic!("enregistrement corrompu inattendu"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_fasta_roundtrip_and_malformed_header() {
        let dir = temp_dir("fasta");
        let path = dir.join("packets.fasta");
        let wire = WireFormat::lt_default();
        let correction = ErrorCorrection::Nocode;
        let mut packet = sample_packet(9, b"abcd");
        packet.error_prob = Some(0.25);
        write_packets_to_fasta(&path, &[packet.clone()], &wire, &correction).unwrap();

        // en-tête mal formé ajouté à la main : score nul, pas d'erreur
        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str(">entete_sans_nombre\nACGT\n");
        fs::write(&path, content).unwrap();

        let records = read_records_from_fasta(&path, &correction).unwrap();
        assert_eq!(records.len(), 2);
        match &records[0] {
            RawRecord::Binary { data, error_prob } => {
                assert_eq!(*data, packet.pack(&wire, &correction).unwrap());
                assert_eq!(*error_prob, Some(0.25));
            }
            RawRecord::Corrupt(_) => panic!("enregistrement corrompu inattendu"),
        }
        match &records[1] {
            RawRecord::Binary { error_prob, .. } => assert_eq!(*error_prob, None),
            RawRecord::Corrupt(_) => panic!("enregistrement corrompu inattendu"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_folder_dna_corrupt_file_is_flagged() {
        let dir = temp_dir("corrupt");
        let correction = ErrorCorrection::Nocode;
        fs::write(dir.join("0_1.LT_DNA"), "ACGTXX").unwrap();
        let records = read_records_from_folder(&dir, ".LT_DNA", true, &correction).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], RawRecord::Corrupt(_)));
        fs::remove_dir_all(&dir).unwrap();
    }
}
