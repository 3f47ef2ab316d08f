//! Fonctions utilitaires pour le codec fontaine
//!
//! Helpers sans état : transcodage octets/quaternaire (ADN) et
//! arithmétique combinatoire utilisée par la construction Raptor.

pub mod math;
pub mod quaternary;

pub use math::{bits_set, build_gray_sequence, center_binomial, gray_code, smallest_prime_ge};
pub use quaternary::{bytes_to_dna, dna_to_bytes, dna_to_quads, quads_to_dna, QuaternaryError};
