//! Configuration options for windowed acquisition and propagation.
//!
//! Purpose
//! -------
//! Validate and hold the numerical knobs of the dynamics layer: the dense
//! solve cadence, the coarser observation cadence, optional hard bounds on
//! states and parameters, and the RNG seed. A validated
//! [`DynamicsOptions`] is consumed once by
//! [`crate::dynamics::DynamicModel::new`].
//!
//! Key behaviors
//! -------------
//! - [`DynamicsOptions::new`] rejects non-positive cadences, an observation
//!   cadence finer than the solve cadence, and malformed bound pairs.
//!
//! Invariants & assumptions
//! ------------------------
//! - `solve_dt > 0`, `sample_dt >= solve_dt`, both finite.
//! - Bound pairs, when present, are elementwise `min < max` with finite
//!   entries.
//!
//! Testing notes
//! -------------
//! - Unit tests cover cadence validation and bound-pair rejection.

use crate::dynamics::errors::{DynamicsError, DynamicsResult};
use ndarray::Array1;

/// `DynamicsOptions` — validated knobs for acquisition and propagation.
///
/// Fields
/// ------
/// - `solve_dt`: `f64`
///   Dense solve-grid spacing; finite and > 0.
/// - `sample_dt`: `f64`
///   Observation cadence; finite and >= `solve_dt`.
/// - `state_bounds`: `Option<(Array1<f64>, Array1<f64>)>`
///   Optional hard `(min, max)` bounds clipping initial states.
/// - `param_bounds`: `Option<(Array1<f64>, Array1<f64>)>`
///   Optional hard `(min, max)` bounds clipping uniform parameter boxes.
/// - `seed`: `Option<u64>`
///   Seed for the model-owned RNG; `None` seeds from entropy.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsOptions {
    /// Dense solve-grid spacing.
    pub solve_dt: f64,
    /// Observation cadence.
    pub sample_dt: f64,
    /// Optional hard bounds on state vectors.
    pub state_bounds: Option<(Array1<f64>, Array1<f64>)>,
    /// Optional hard bounds on parameter vectors.
    pub param_bounds: Option<(Array1<f64>, Array1<f64>)>,
    /// RNG seed; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl DynamicsOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::NonPositiveOption` when a cadence is not finite
    ///   and strictly positive.
    /// - `DynamicsError::CadenceMismatch` when `sample_dt < solve_dt`.
    /// - `DynamicsError::NonFiniteValue` when a bound entry is not finite.
    /// - `DynamicsError::NonPositiveOption` (named `bound_width`) when a
    ///   bound pair is inverted or collapsed.
    /// - `DynamicsError::BoundLengthMismatch` when a bound pair's min and
    ///   max arrays differ in length.
    pub fn new(
        solve_dt: f64,
        sample_dt: f64,
        state_bounds: Option<(Array1<f64>, Array1<f64>)>,
        param_bounds: Option<(Array1<f64>, Array1<f64>)>,
        seed: Option<u64>,
    ) -> DynamicsResult<Self> {
        if !solve_dt.is_finite() || solve_dt <= 0.0 {
            return Err(DynamicsError::NonPositiveOption { name: "solve_dt", value: solve_dt });
        }
        if !sample_dt.is_finite() || sample_dt <= 0.0 {
            return Err(DynamicsError::NonPositiveOption { name: "sample_dt", value: sample_dt });
        }
        if sample_dt < solve_dt {
            return Err(DynamicsError::CadenceMismatch { solve_dt, sample_dt });
        }
        Self::check_bounds(&state_bounds, "state_bounds")?;
        Self::check_bounds(&param_bounds, "param_bounds")?;
        Ok(DynamicsOptions { solve_dt, sample_dt, state_bounds, param_bounds, seed })
    }

    fn check_bounds(
        bounds: &Option<(Array1<f64>, Array1<f64>)>,
        name: &'static str,
    ) -> DynamicsResult<()> {
        if let Some((mins, maxs)) = bounds {
            if mins.len() != maxs.len() {
                return Err(DynamicsError::BoundLengthMismatch {
                    name,
                    expected: mins.len(),
                    actual: maxs.len(),
                });
            }
            for (&lo, &hi) in mins.iter().zip(maxs.iter()) {
                if !lo.is_finite() {
                    return Err(DynamicsError::NonFiniteValue { name: "bound_min", value: lo });
                }
                if !hi.is_finite() {
                    return Err(DynamicsError::NonFiniteValue { name: "bound_max", value: hi });
                }
                if lo >= hi {
                    return Err(DynamicsError::NonPositiveOption {
                        name: "bound_width",
                        value: hi - lo,
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of solve-grid steps between consecutive sample instants.
    pub fn sample_step(&self) -> usize {
        ((self.sample_dt / self.solve_dt) as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Cadence validation (positivity, ordering) in `DynamicsOptions::new`.
    // - Bound-pair validation and the derived `sample_step` ratio.
    //
    // They intentionally DO NOT cover:
    // - How the options drive acquisition; that lives in the model tests.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that a coarser observation cadence than the solve cadence is
    // accepted and `sample_step` is the integer ratio.
    //
    // Given
    // -----
    // - `solve_dt = 0.1`, `sample_dt = 0.5`.
    //
    // Expect
    // ------
    // - Construction succeeds and `sample_step() == 5`.
    fn new_accepts_coarser_observation_cadence() {
        let opts = DynamicsOptions::new(0.1, 0.5, None, None, Some(0)).unwrap();

        assert_eq!(opts.sample_step(), 5);
    }

    #[test]
    // Purpose
    // -------
    // Ensure an observation cadence finer than the solve cadence is
    // rejected.
    //
    // Given
    // -----
    // - `solve_dt = 0.5`, `sample_dt = 0.1`.
    //
    // Expect
    // ------
    // - `DynamicsError::CadenceMismatch`.
    fn new_rejects_finer_observation_cadence() {
        let err = DynamicsOptions::new(0.5, 0.1, None, None, None).unwrap_err();

        assert_eq!(err, DynamicsError::CadenceMismatch { solve_dt: 0.5, sample_dt: 0.1 });
    }

    #[test]
    // Purpose
    // -------
    // Ensure non-positive cadences are rejected.
    //
    // Given
    // -----
    // - `solve_dt = 0.0` and `sample_dt = -1.0` in separate calls.
    //
    // Expect
    // ------
    // - `DynamicsError::NonPositiveOption` naming the offending knob.
    fn new_rejects_non_positive_cadences() {
        let err = DynamicsOptions::new(0.0, 0.5, None, None, None).unwrap_err();
        assert_eq!(err, DynamicsError::NonPositiveOption { name: "solve_dt", value: 0.0 });

        let err = DynamicsOptions::new(0.1, -1.0, None, None, None).unwrap_err();
        assert_eq!(err, DynamicsError::NonPositiveOption { name: "sample_dt", value: -1.0 });
    }

    #[test]
    // Purpose
    // -------
    // Ensure inverted bound pairs are rejected.
    //
    // Given
    // -----
    // - Parameter bounds with `min = [2.0]`, `max = [1.0]`.
    //
    // Expect
    // ------
    // - `DynamicsError::NonPositiveOption` naming `bound_width`.
    fn new_rejects_inverted_bound_pairs() {
        let err = DynamicsOptions::new(
            0.1,
            0.5,
            None,
            Some((array![2.0], array![1.0])),
            None,
        )
        .unwrap_err();

        assert_eq!(err, DynamicsError::NonPositiveOption { name: "bound_width", value: -1.0 });
    }

    #[test]
    // Purpose
    // -------
    // Ensure a bound pair whose min and max arrays differ in length is
    // rejected instead of silently truncating to the shorter array.
    //
    // Given
    // -----
    // - State bounds with `min = [0.0, 0.0]`, `max = [1.0]`.
    //
    // Expect
    // ------
    // - `DynamicsError::BoundLengthMismatch` naming `state_bounds`.
    fn new_rejects_mismatched_bound_pair_lengths() {
        let err = DynamicsOptions::new(
            0.1,
            0.5,
            Some((array![0.0, 0.0], array![1.0])),
            None,
            None,
        )
        .unwrap_err();

        assert_eq!(
            err,
            DynamicsError::BoundLengthMismatch {
                name: "state_bounds",
                expected: 2,
                actual: 1
            }
        );
    }
}
