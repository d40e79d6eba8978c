//! Error types for SDM training and prediction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SDMError {
    /// Eigendecomposition failure, non-finite values or a degenerate
    /// self-similarity on the kernel diagonal.
    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No hyperparameter candidate could be fit.
    #[error("Model selection failed: {0}")]
    Selection(String),

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

pub type Result<T> = std::result::Result<T, SDMError>;
