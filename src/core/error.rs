//! Error types for the diagnosis pipeline

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiagnosisError {
    #[error("Source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Artifact missing for {disease}: {path}")]
    ArtifactMissing { disease: String, path: PathBuf },

    #[error("Artifact corrupt for {disease}: {reason}")]
    ArtifactCorrupt { disease: String, reason: String },

    #[error("Incompatible artifact format version {found}, supported: {supported}")]
    IncompatibleArtifact { found: u32, supported: u32 },

    #[error("Scaler and model for {disease} come from different training runs")]
    PairMismatch { disease: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Prediction unavailable for {0}")]
    PredictionUnavailable(String),

    #[error("Unknown disease: {0}")]
    UnknownDisease(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Invalid label: expected 0 or 1, got {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DiagnosisError {
    /// Errors caused by the caller's input rather than by the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DiagnosisError::MissingField(_)
                | DiagnosisError::MalformedInput(_)
                | DiagnosisError::DimensionMismatch { .. }
                | DiagnosisError::UnknownDisease(_)
        )
    }

    /// Errors that mean a disease's artifacts cannot be used
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DiagnosisError::ArtifactMissing { .. }
                | DiagnosisError::ArtifactCorrupt { .. }
                | DiagnosisError::IncompatibleArtifact { .. }
                | DiagnosisError::PairMismatch { .. }
                | DiagnosisError::PredictionUnavailable(_)
        )
    }
}

impl From<csv::Error> for DiagnosisError {
    fn from(err: csv::Error) -> Self {
        DiagnosisError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DiagnosisError>;
