//! Errors for the online controllers.
//!
//! [`ControlError`] unifies controller-level validation failures with the
//! dynamics and inversion errors the iteration loops propagate. Window
//! boundary indices are 0-based.

use crate::dynamics::errors::DynamicsError;
use crate::inversion::errors::InversionError;

/// Result alias for controller operations that may produce
/// [`ControlError`].
pub type ControlResult<T> = Result<T, ControlError>;

/// Unified error type for the online controllers.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlError {
    /// An adaptive run needs at least two window boundaries.
    TooFewBoundaries { len: usize },

    /// Window boundaries must be strictly ascending.
    BoundariesNotAscending { index: usize },

    /// An initial weight vector does not match the ensemble size.
    WeightLengthMismatch { expected: usize, actual: usize },

    /// A scalar option that must be strictly positive was not.
    NonPositiveOption { name: &'static str, value: f64 },

    /// The fixed controller's attempt budget cannot cover its iterations.
    AttemptBudgetTooSmall { max_attempts: usize, iterations: usize },

    /// The first adaptive window was ill-posed; there is no earlier
    /// posterior to refine from.
    FirstWindowIllPosed { deviation: f64 },

    /// Propagated dynamics failure.
    Dynamics(DynamicsError),

    /// Propagated inversion failure.
    Inversion(InversionError),
}

impl std::error::Error for ControlError {}

impl std::fmt::Display for ControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlError::TooFewBoundaries { len } => {
                write!(f, "Control Error: at least 2 window boundaries required (got {})", len)
            }
            ControlError::BoundariesNotAscending { index } => write!(
                f,
                "Control Error: window boundaries must be strictly ascending (violation at {})",
                index
            ),
            ControlError::WeightLengthMismatch { expected, actual } => write!(
                f,
                "Control Error: initial weight vector length {} does not match ensemble size {}",
                actual, expected
            ),
            ControlError::NonPositiveOption { name, value } => {
                write!(f, "Control Error: {} must be finite and > 0 (got {})", name, value)
            }
            ControlError::AttemptBudgetTooSmall { max_attempts, iterations } => write!(
                f,
                "Control Error: max_attempts ({}) must be >= iterations ({})",
                max_attempts, iterations
            ),
            ControlError::FirstWindowIllPosed { deviation } => write!(
                f,
                "Control Error: first window is ill-posed (deviation {}); no earlier posterior to refine from",
                deviation
            ),
            ControlError::Dynamics(err) => write!(f, "Control Error: {}", err),
            ControlError::Inversion(err) => write!(f, "Control Error: {}", err),
        }
    }
}

impl From<DynamicsError> for ControlError {
    fn from(err: DynamicsError) -> Self {
        ControlError::Dynamics(err)
    }
}

impl From<InversionError> for ControlError {
    fn from(err: InversionError) -> Self {
        ControlError::Inversion(err)
    }
}
