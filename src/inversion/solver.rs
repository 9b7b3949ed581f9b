//! Solver contract: the opaque inversion backend.
//!
//! Purpose
//! -------
//! Define the seam between this crate's iteration control and whatever
//! data-consistent-inversion mathematics the caller supplies. The engine
//! never inspects posterior internals; it consumes only the diagnostics a
//! completed solve exposes (expected ratio, KL divergence, best-sample
//! index, per-sample weight ratios) and the ability to draw new parameter
//! tables from a posterior handle.
//!
//! Key behaviors
//! -------------
//! - A solve resolves to an explicit [`SolveStatus`]: solved with
//!   diagnostics, ill-posed with a reason, or no solution. Anything else
//!   propagates as an [`InversionError`].
//!
//! Conventions
//! -----------
//! - `weight_ratios` has one entry per ensemble row and feeds the adaptive
//!   controller's importance-weight stack.

use crate::inversion::errors::InversionResult;
use ndarray::{Array1, Array2};

/// One hyperparameter configuration of a solve.
///
/// Fields
/// ------
/// - `pca_components`: indices of the retained data-reduction components.
/// - `mask_size`: number of readings the solve masks in.
/// - `splits`: number of sequential sub-solves the masked data is split
///   into.
/// - `exp_thresh`: acceptable deviation of the expected ratio from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveConfig {
    /// Retained data-reduction component indices.
    pub pca_components: Vec<usize>,
    /// Number of readings masked into the solve.
    pub mask_size: usize,
    /// Number of sequential sub-solves.
    pub splits: usize,
    /// Acceptable expected-ratio deviation.
    pub exp_thresh: f64,
}

/// Diagnostics of one completed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    /// Expected ratio `e_r`; 1 indicates a consistent update.
    pub expected_ratio: f64,
    /// KL divergence of the update.
    pub kl_divergence: f64,
    /// Ensemble row the solve identified as the MUD point.
    pub mud_index: usize,
    /// Per-sample update ratios, one per ensemble row.
    pub weight_ratios: Array1<f64>,
}

/// Explicit resolution of one solve attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// The solve completed with diagnostics.
    Solved(SolveOutcome),
    /// The problem was ill-posed for this configuration; carries the
    /// backend's reason.
    IllPosed(String),
    /// The backend found no admissible update.
    NoSolution,
}

impl SolveStatus {
    /// The diagnostics of a solved status, if any.
    pub fn outcome(&self) -> Option<&SolveOutcome> {
        match self {
            SolveStatus::Solved(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Opaque inversion backend over one window's ensemble and measurements.
pub trait Solver {
    /// Handle to a completed solve's posterior, sufficient to draw new
    /// parameter tables from.
    type Posterior: Clone;

    /// Run one solve under `config`, executing its full split sequence and
    /// resolving to the sequence's final status.
    fn solve(&mut self, config: &SolveConfig) -> InversionResult<SolveStatus>;

    /// Per-sub-solve diagnostics table of the split sequence under
    /// `config`, one entry per completed sub-solve. A backend that has
    /// just completed [`Solver::solve`] under the same configuration may
    /// return its stored table without re-solving.
    fn solve_iterative(&mut self, config: &SolveConfig) -> InversionResult<Vec<SolveOutcome>>;

    /// Posterior handle of the most recent successful solve, if any.
    fn posterior(&self) -> Option<Self::Posterior>;

    /// Draw a `count x n_params` parameter table from `posterior`.
    fn sample_from(
        &mut self,
        posterior: &Self::Posterior,
        count: usize,
    ) -> InversionResult<Array2<f64>>;

    /// KL divergence of the most recent successful solve, if any.
    fn kl_divergence(&self) -> Option<f64>;
}

/// Factory constructing a [`Solver`] over one window's data.
pub trait SolverBuilder {
    /// The solver type this builder produces.
    type Solver: Solver;

    /// Build a solver over an ensemble's predictions, the window's
    /// non-missing measurements, the measurement-noise level, a prior
    /// parameter table, and accumulated importance weights (`None` for
    /// uniform).
    fn build(
        &self,
        ensemble: &Array2<f64>,
        measurements: &Array1<f64>,
        noise: f64,
        prior: &Array2<f64>,
        weights: Option<&Array1<f64>>,
    ) -> InversionResult<Self::Solver>;
}
