//! Types d'erreurs pour le codec fontaine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FountainError {
    #[error("Paquet corrompu: {0}")]
    CorruptPacket(String),

    #[error("Données insuffisantes pour la reconstruction: besoin de {need} chunks, avons {have}")]
    InsufficientData { need: usize, have: usize },

    #[error("État incohérent entre encodeur et décodeur: {0}")]
    InconsistentState(String),

    #[error("Degré invalide: {degree} > {population}")]
    DegreeOutOfRange { degree: usize, population: usize },

    #[error("Distribution invalide: {0}")]
    InvalidDistribution(String),

    #[error("Erreur IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erreur de sérialisation: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur d'encodage: {0}")]
    Encoding(String),

    #[error("Erreur de décodage: {0}")]
    Decoding(String),

    #[error("Erreur de correction: {0}")]
    Correction(String),
}

impl FountainError {
    /// Vrai si l'erreur est récupérable au niveau de la boucle de décodage
    /// (on passe au paquet suivant au lieu d'abandonner la session).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FountainError::CorruptPacket(_) | FountainError::InsufficientData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FountainError>;

impl From<fontaine_utils::QuaternaryError> for FountainError {
    fn from(err: fontaine_utils::QuaternaryError) -> Self {
        FountainError::CorruptPacket(err.to_string())
    }
}
