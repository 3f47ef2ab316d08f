//! Fontaine Core
//!
//! Moteur de codes fontaine (LT, RU10/Raptor, Online) pour le stockage
//! de fichiers sur ADN de synthèse : distributions de degré, sélection
//! déterministe des chunks, format de fil des paquets, codes de
//! correction d'erreurs, et décodage par propagation de croyances avec
//! repli sur l'élimination de Gauss sur GF(2).

pub mod compression;
pub mod container;
pub mod correction;
pub mod decoder;
pub mod distribution;
pub mod encoder;
pub mod error;
pub mod header_chunk;
pub mod logging;
pub mod packet;
pub mod selection;

// Réexportations principales
pub use compression::CompressionType;
pub use correction::ErrorCorrection;
pub use decoder::{
    BeliefReducer, DecoderConfig, Equation, Gepp, LtDecoder, OnlineDecoder, PacketDecoder,
    ReconstructedFile, Ru10Decoder, SolverKind,
};
pub use distribution::{
    Distribution, ErlichZielinskiDistribution, IdealSolitonDistribution, OnlineDistribution,
    RaptorDistribution, RobustSolitonDistribution,
};
pub use encoder::{DropOracle, EncoderConfig, LtEncoder, OnlineEncoder, Ru10Encoder};
pub use error::{FountainError, Result};
pub use header_chunk::HeaderChunk;
pub use logging::init_logging;
pub use packet::{Field, Packet, PacketFamily, WireFormat};
