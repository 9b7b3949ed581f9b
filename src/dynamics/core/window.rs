//! Acquired measurement windows.
//!
//! Purpose
//! -------
//! Hold everything one acquisition produced: the dense solve grid, the
//! sample-instant flags, the governing true parameters per timestamp, the
//! clean reference trajectory, and the noisy sensor table with `NaN` at
//! non-sample instants and unobserved states.
//!
//! Key behaviors
//! -------------
//! - [`DataWindow::new`] checks the table shapes against the grid and the
//!   flag invariant (the final timestamp is always a sample instant).
//! - Accessors expose the sample-instant view the inversion layer consumes:
//!   [`DataWindow::observed_measurements`] flattens the noisy readings at
//!   sample instants into the sample-instant-major vector the solver sees.
//!
//! Invariants & assumptions
//! ------------------------
//! - `ts`, `sample_flag`, and `shift_idx` share one length; `lam_true` and
//!   `true_states` have that many rows; `measurements` has that many rows
//!   and `n_states` columns.
//! - `sample_flag` ends with `true`.
//! - `measurements[i, j]` is finite exactly when `sample_flag[i]` holds and
//!   `j` is an observed index.
//!
//! Conventions
//! -----------
//! - The observed flattening is sample-instant-major: all sensors of the
//!   first sample instant, then all sensors of the second, and so on.

use crate::dynamics::errors::{DynamicsError, DynamicsResult};
use ndarray::{Array1, Array2};

/// `DataWindow` — one acquired window of reference data.
///
/// Fields
/// ------
/// - `ts`: `Array1<f64>`
///   Dense solve grid, endpoint inclusive.
/// - `shift_idx`: `Vec<usize>`
///   Shift-segment id per timestamp.
/// - `sample_flag`: `Vec<bool>`
///   True at sample instants; last entry always true.
/// - `lam_true`: `Array2<f64>`
///   Governing true parameter vector per timestamp.
/// - `true_states`: `Array2<f64>`
///   Clean reference trajectory, one full state per timestamp.
/// - `measurements`: `Array2<f64>`
///   Noisy readings; `NaN` off the sample/observed mask.
/// - `state_idxs`: `Vec<usize>`
///   Observed state indices the window was acquired under.
#[derive(Debug, Clone, PartialEq)]
pub struct DataWindow {
    /// Dense solve grid.
    pub ts: Array1<f64>,
    /// Shift-segment id per timestamp.
    pub shift_idx: Vec<usize>,
    /// Sample-instant flags; last entry true.
    pub sample_flag: Vec<bool>,
    /// True parameters per timestamp.
    pub lam_true: Array2<f64>,
    /// Clean reference trajectory.
    pub true_states: Array2<f64>,
    /// Noisy readings with `NaN` off the mask.
    pub measurements: Array2<f64>,
    /// Observed state indices.
    pub state_idxs: Vec<usize>,
}

impl DataWindow {
    /// Assemble a window, checking shape and flag invariants.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::TrajectoryShapeMismatch` when a table does not
    ///   match the grid length, the state dimension, or `n_params`.
    /// - `DynamicsError::WindowTooShort` when the grid has fewer than two
    ///   points or the final flag is not set.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ts: Array1<f64>,
        shift_idx: Vec<usize>,
        sample_flag: Vec<bool>,
        lam_true: Array2<f64>,
        true_states: Array2<f64>,
        measurements: Array2<f64>,
        state_idxs: Vec<usize>,
        n_params: usize,
    ) -> DynamicsResult<Self> {
        let n = ts.len();
        if n < 2 || sample_flag.last() != Some(&true) {
            return Err(DynamicsError::WindowTooShort {
                window_length: if n > 0 { ts[n - 1] - ts[0] } else { 0.0 },
                solve_dt: if n > 1 { ts[1] - ts[0] } else { 0.0 },
                points: n,
            });
        }
        let n_states = true_states.ncols();
        for (rows, cols, dim) in [
            (shift_idx.len(), 1, (n, 1)),
            (sample_flag.len(), 1, (n, 1)),
            (lam_true.nrows(), lam_true.ncols(), (n, n_params)),
            (true_states.nrows(), n_states, (n, n_states)),
            (measurements.nrows(), measurements.ncols(), (n, n_states)),
        ] {
            if (rows, cols) != dim {
                return Err(DynamicsError::TrajectoryShapeMismatch {
                    expected: dim,
                    actual: (rows, cols),
                });
            }
        }
        Ok(DataWindow { ts, shift_idx, sample_flag, lam_true, true_states, measurements, state_idxs })
    }

    /// Indices of the sample instants within the dense grid.
    pub fn sample_indices(&self) -> Vec<usize> {
        self.sample_flag
            .iter()
            .enumerate()
            .filter_map(|(i, &flag)| flag.then_some(i))
            .collect()
    }

    /// Number of sample instants in the window.
    pub fn n_sample_instants(&self) -> usize {
        self.sample_flag.iter().filter(|&&flag| flag).count()
    }

    /// Number of scalar readings the window contributes:
    /// `n_sample_instants * n_sensors`.
    pub fn n_readings(&self) -> usize {
        self.n_sample_instants() * self.state_idxs.len()
    }

    /// Flatten the noisy readings at sample instants over the observed
    /// indices, sample-instant-major.
    pub fn observed_measurements(&self) -> Array1<f64> {
        let idxs = self.sample_indices();
        let mut out = Array1::zeros(idxs.len() * self.state_idxs.len());
        let mut k = 0;
        for &i in &idxs {
            for &j in &self.state_idxs {
                out[k] = self.measurements[[i, j]];
                k += 1;
            }
        }
        out
    }

    /// Full reference state at the last sample instant.
    pub fn last_sampled_state(&self) -> Array1<f64> {
        self.true_states.row(self.true_states.nrows() - 1).to_owned()
    }

    /// Timestamp of the last sample instant.
    pub fn last_sampled_time(&self) -> f64 {
        self.ts[self.ts.len() - 1]
    }
}
