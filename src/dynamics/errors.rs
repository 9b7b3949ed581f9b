//! Errors for the dynamics layer (system-state validation, windowed
//! acquisition, and ensemble propagation).
//!
//! This module defines a single error type, [`DynamicsError`], used across
//! system-state construction, option validation, data acquisition, and
//! forward propagation. It implements `Display`/`Error` and carries the
//! offending values so callers can report precise diagnostics.
//!
//! ## Conventions
//! - **Indices are 0-based** (window indices, ensemble indices, state
//!   indices).
//! - Configuration errors fail fast at construction time; out-of-range
//!   window or ensemble references fail fast at call time.
//! - Sampler-level failures (degenerate noise levels, inverted boxes) are
//!   wrapped via [`DynamicsError::Sampler`].

use crate::samplers::SamplerError;

/// Result alias for dynamics operations that may produce [`DynamicsError`].
pub type DynamicsResult<T> = Result<T, DynamicsError>;

/// Unified error type for the dynamics layer.
///
/// Covers option/state validation, window and ensemble indexing, shape
/// mismatches between collaborator outputs and the configured system, and
/// wrapped sampler failures. Implements `Display`/`Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicsError {
    // ---- Configuration validation ----
    /// A scalar option that must be strictly positive and finite was not.
    NonPositiveOption { name: &'static str, value: f64 },

    /// A value that must be finite was NaN or ±inf.
    NonFiniteValue { name: &'static str, value: f64 },

    /// The observation cadence must be at least the solve cadence.
    CadenceMismatch { solve_dt: f64, sample_dt: f64 },

    /// An observed state index exceeds the state dimension.
    ObservedIndexOutOfRange { index: usize, n_states: usize },

    /// The same state index appears twice in the observed subset.
    DuplicateObservedIndex { index: usize },

    /// The observed-index subset is empty.
    NoObservedIndices,

    /// A parameter vector's length does not match the system's parameter
    /// dimension.
    ParamLengthMismatch { expected: usize, actual: usize },

    /// A state vector's length does not match the system's state dimension.
    StateLengthMismatch { expected: usize, actual: usize },

    /// A bound pair's arrays differ in length or do not match the
    /// dimension they constrain.
    BoundLengthMismatch { name: &'static str, expected: usize, actual: usize },

    // ---- Acquisition ----
    /// The requested window does not span at least two solve-grid points.
    WindowTooShort { window_length: f64, solve_dt: f64, points: usize },

    // ---- Window / ensemble indexing ----
    /// An operation referenced a window but no windows have been acquired.
    EmptyWindows,

    /// A window index is out of range for the acquired window list.
    WindowOutOfRange { index: usize, len: usize },

    /// An ensemble index would leave a gap in the ensemble list.
    EnsembleOutOfRange { index: usize, len: usize },

    /// A propagation call received an empty sample table.
    EmptyEnsembleInput,

    /// Carried-forward initial conditions do not match the sample table.
    CarriedShapeMismatch { expected: (usize, usize), actual: (usize, usize) },

    /// A forward-model trajectory had the wrong shape for the window grid.
    TrajectoryShapeMismatch { expected: (usize, usize), actual: (usize, usize) },

    // ---- Samplers ----
    /// Wrapped noise-injection or box-sampling failure.
    Sampler(SamplerError),
}

impl std::error::Error for DynamicsError {}

impl std::fmt::Display for DynamicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration validation ----
            DynamicsError::NonPositiveOption { name, value } => {
                write!(f, "Dynamics Error: {} must be finite and > 0 (got {})", name, value)
            }
            DynamicsError::NonFiniteValue { name, value } => {
                write!(f, "Dynamics Error: {} must be finite (got {})", name, value)
            }
            DynamicsError::CadenceMismatch { solve_dt, sample_dt } => write!(
                f,
                "Dynamics Error: sample_dt ({}) must be >= solve_dt ({})",
                sample_dt, solve_dt
            ),
            DynamicsError::ObservedIndexOutOfRange { index, n_states } => write!(
                f,
                "Dynamics Error: observed state index {} out of range for {} states",
                index, n_states
            ),
            DynamicsError::DuplicateObservedIndex { index } => {
                write!(f, "Dynamics Error: observed state index {} appears more than once", index)
            }
            DynamicsError::NoObservedIndices => {
                write!(f, "Dynamics Error: at least one state index must be observed")
            }
            DynamicsError::ParamLengthMismatch { expected, actual } => write!(
                f,
                "Dynamics Error: parameter vector length {} does not match system dimension {}",
                actual, expected
            ),
            DynamicsError::StateLengthMismatch { expected, actual } => write!(
                f,
                "Dynamics Error: state vector length {} does not match system dimension {}",
                actual, expected
            ),
            DynamicsError::BoundLengthMismatch { name, expected, actual } => write!(
                f,
                "Dynamics Error: {} expects arrays of length {} (got {})",
                name, expected, actual
            ),

            // ---- Acquisition ----
            DynamicsError::WindowTooShort { window_length, solve_dt, points } => write!(
                f,
                "Dynamics Error: window of length {} at solve_dt {} yields {} grid points (need >= 2)",
                window_length, solve_dt, points
            ),

            // ---- Window / ensemble indexing ----
            DynamicsError::EmptyWindows => {
                write!(f, "Dynamics Error: no data windows have been acquired")
            }
            DynamicsError::WindowOutOfRange { index, len } => {
                write!(f, "Dynamics Error: window index {} out of range (len {})", index, len)
            }
            DynamicsError::EnsembleOutOfRange { index, len } => write!(
                f,
                "Dynamics Error: ensemble index {} would leave a gap (len {})",
                index, len
            ),
            DynamicsError::EmptyEnsembleInput => {
                write!(f, "Dynamics Error: sample table must contain at least one row")
            }
            DynamicsError::CarriedShapeMismatch { expected, actual } => write!(
                f,
                "Dynamics Error: carried initial conditions have shape {:?}, expected {:?}",
                actual, expected
            ),
            DynamicsError::TrajectoryShapeMismatch { expected, actual } => write!(
                f,
                "Dynamics Error: forward model returned trajectory of shape {:?}, expected {:?}",
                actual, expected
            ),

            // ---- Samplers ----
            DynamicsError::Sampler(err) => write!(f, "Dynamics Error: {}", err),
        }
    }
}

impl From<SamplerError> for DynamicsError {
    fn from(err: SamplerError) -> Self {
        DynamicsError::Sampler(err)
    }
}
