//! prover error taxonomy

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProofError {
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
    #[error("bad field element: {0}")]
    BadField(String),
    #[error("artifact fetch failed for {name}: {cause}")]
    FetchArtifact { name: String, cause: String },
    #[error("circuit initialization failed: {0}")]
    CircuitInitialization(String),
}

pub type Result<T> = std::result::Result<T, ProofError>;

impl From<shade_core::field::FieldError> for ProofError {
    fn from(e: shade_core::field::FieldError) -> Self {
        ProofError::BadField(e.to_string())
    }
}
