//! Propagated sample ensembles and carried initial conditions.
//!
//! Purpose
//! -------
//! Hold the output of one ensemble propagation: the parameter draws, their
//! predicted readings aligned with a window's observed measurements, and an
//! optional marker for the row a later inversion selected as best. Also
//! defines [`InitialConditions`], the per-sample terminal states carried
//! between windows.
//!
//! Key behaviors
//! -------------
//! - [`SampleEnsemble::new`] checks that the predicted table is consistent
//!   with the sample table and the declared reading layout.
//! - [`SampleEnsemble::mark_best`] records the selected row after an
//!   inversion; the marker starts out unset.
//!
//! Invariants & assumptions
//! ------------------------
//! - `predicted` has one row per sample and
//!   `n_sample_instants * n_sensors` columns, sample-instant-major.
//! - `best_sample` is `None` until an inversion marks it, and always a
//!   valid row index afterwards.

use crate::dynamics::errors::{DynamicsError, DynamicsResult};
use ndarray::Array2;

/// Per-sample initial conditions carried between windows.
///
/// One full state vector per ensemble row; produced by a propagation as the
/// trajectory's terminal state and consumed by the next propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialConditions(pub Array2<f64>);

impl InitialConditions {
    /// Number of sample rows the conditions cover.
    pub fn n_samples(&self) -> usize {
        self.0.nrows()
    }

    /// State dimension of each carried condition.
    pub fn n_states(&self) -> usize {
        self.0.ncols()
    }
}

/// `SampleEnsemble` — one propagated ensemble for one window.
///
/// Fields
/// ------
/// - `params`: `Array2<f64>`
///   Parameter draws, one per row.
/// - `predicted`: `Array2<f64>`
///   Predicted readings per draw, sample-instant-major.
/// - `n_sample_instants`: `usize`
///   Sample instants the predictions cover.
/// - `n_sensors`: `usize`
///   Observed sensors per sample instant.
/// - `best_sample`: `Option<usize>`
///   Row index a later inversion selected; `None` until marked.
///
/// Invariants
/// ----------
/// - `predicted.nrows() == params.nrows()`.
/// - `predicted.ncols() == n_sample_instants * n_sensors`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEnsemble {
    /// Parameter draws, one per row.
    pub params: Array2<f64>,
    /// Predicted readings per draw.
    pub predicted: Array2<f64>,
    /// Sample instants covered.
    pub n_sample_instants: usize,
    /// Observed sensors per sample instant.
    pub n_sensors: usize,
    /// Row selected by a later inversion.
    pub best_sample: Option<usize>,
}

impl SampleEnsemble {
    /// Assemble an ensemble, checking table consistency.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::EmptyEnsembleInput` when `params` has no rows.
    /// - `DynamicsError::TrajectoryShapeMismatch` when `predicted` does not
    ///   match the sample count or the declared reading layout.
    pub(crate) fn new(
        params: Array2<f64>,
        predicted: Array2<f64>,
        n_sample_instants: usize,
        n_sensors: usize,
    ) -> DynamicsResult<Self> {
        if params.nrows() == 0 {
            return Err(DynamicsError::EmptyEnsembleInput);
        }
        let expected = (params.nrows(), n_sample_instants * n_sensors);
        if predicted.dim() != expected {
            return Err(DynamicsError::TrajectoryShapeMismatch {
                expected,
                actual: predicted.dim(),
            });
        }
        Ok(SampleEnsemble { params, predicted, n_sample_instants, n_sensors, best_sample: None })
    }

    /// Number of parameter draws in the ensemble.
    pub fn n_samples(&self) -> usize {
        self.params.nrows()
    }

    /// Record the row a completed inversion selected as best.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::EnsembleOutOfRange` when `row` is not a valid
    ///   sample index.
    pub fn mark_best(&mut self, row: usize) -> DynamicsResult<()> {
        if row >= self.n_samples() {
            return Err(DynamicsError::EnsembleOutOfRange { index: row, len: self.n_samples() });
        }
        self.best_sample = Some(row);
        Ok(())
    }
}
