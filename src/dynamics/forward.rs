//! Forward-model abstraction.
//!
//! Purpose
//! -------
//! Decouple the dynamics layer from any particular physical system: the
//! engine only needs to map an initial state, a time grid, and a parameter
//! vector to a dense trajectory. Reference-trajectory acquisition and
//! ensemble propagation both go through this one seam.
//!
//! Conventions
//! -----------
//! - The returned trajectory has one row per grid timestamp and one column
//!   per state, with the first row equal to the initial state at `times[0]`.

use ndarray::{Array2, ArrayView1};

/// Deterministic forward map of the system under study.
///
/// Implementations must be pure with respect to their inputs: the same
/// `(x0, times, params)` triple always yields the same trajectory.
pub trait ForwardModel {
    /// Propagate `x0` over `times` under `params`.
    ///
    /// Returns a `times.len() x n_states` trajectory whose first row is
    /// `x0`.
    fn propagate(
        &self,
        x0: ArrayView1<'_, f64>,
        times: ArrayView1<'_, f64>,
        params: ArrayView1<'_, f64>,
    ) -> Array2<f64>;
}
