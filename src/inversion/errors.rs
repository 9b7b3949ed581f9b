//! Errors for the inversion layer (solver contract and hyperparameter
//! search).
//!
//! This module defines [`InversionError`], shared by configuration
//! enumeration, best-method parsing, and solver invocation. Opaque solver
//! backends report failures as `anyhow::Error`, which is converted into
//! the string-carrying [`InversionError::Solver`] variant.

/// Result alias for inversion operations that may produce
/// [`InversionError`].
pub type InversionResult<T> = Result<T, InversionError>;

/// Unified error type for the inversion layer.
#[derive(Debug, Clone, PartialEq)]
pub enum InversionError {
    /// A best-method name did not parse.
    UnknownBestMethod { method: String },

    /// A threshold that must be strictly positive was not.
    NonPositiveThreshold { value: f64 },

    /// A chunk size that must be strictly positive was not.
    NonPositiveChunkSize { value: usize },

    /// The measurement vector handed to a search was empty.
    EmptyMeasurements,

    /// An importance-weight vector does not match the ensemble size.
    WeightLengthMismatch { expected: usize, actual: usize },

    /// A failure reported by an opaque solver backend.
    Solver(String),

    /// An error whose source could not be determined.
    UnknownError,
}

impl std::error::Error for InversionError {}

impl std::fmt::Display for InversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InversionError::UnknownBestMethod { method } => {
                write!(f, "Inversion Error: unknown best-method name '{}'", method)
            }
            InversionError::NonPositiveThreshold { value } => {
                write!(f, "Inversion Error: threshold must be finite and > 0 (got {})", value)
            }
            InversionError::NonPositiveChunkSize { value } => {
                write!(f, "Inversion Error: chunk size must be > 0 (got {})", value)
            }
            InversionError::EmptyMeasurements => {
                write!(f, "Inversion Error: measurement vector must be non-empty")
            }
            InversionError::WeightLengthMismatch { expected, actual } => write!(
                f,
                "Inversion Error: weight vector length {} does not match ensemble size {}",
                actual, expected
            ),
            InversionError::Solver(msg) => write!(f, "Inversion Error: solver failure: {}", msg),
            InversionError::UnknownError => {
                write!(f, "Inversion Error: unknown error")
            }
        }
    }
}

impl From<anyhow::Error> for InversionError {
    fn from(err: anyhow::Error) -> Self {
        InversionError::Solver(format!("{:#}", err))
    }
}
