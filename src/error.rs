//! Error types for vital-forest
//!
//! Alignment and registry errors are recoverable: the failing operation leaves
//! tables and the registry index unchanged. Training errors are final for the run.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// vital-forest error types
#[derive(Error, Debug)]
pub enum Error {
    /// Identifier shorter than the patient-level prefix
    #[error("Malformed identifier {id:?}: expected at least {expected} characters")]
    MalformedIdentifier {
        /// The offending identifier
        id: String,
        /// Required prefix length
        expected: usize,
    },

    /// A model is already stored under this name (non-fatal, nothing written)
    #[error("Model {0} already exists in the registry")]
    AlreadyExists(String),

    /// Ordinal lookup beyond the registry index, or missing index file
    #[error("Not found: {0}")]
    NotFound(String),

    /// Degenerate or empty training input
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// Feature-name count does not match the model's feature count
    #[error("Schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch {
        /// Feature count the model was trained with
        expected: usize,
        /// Feature count supplied by the caller
        actual: usize,
    },

    /// Invalid argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Table or configuration parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Model (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// TSV reader/writer error
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
