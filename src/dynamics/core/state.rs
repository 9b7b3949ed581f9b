//! System state for the reference dynamical system.
//!
//! Purpose
//! -------
//! Represent the ground-truth side of the inversion problem: where the
//! reference trajectory currently is (`t0`, `x0`), what the true parameters
//! are, when and how they shift, how noisy the sensors are, and which state
//! indices are observed. This module centralizes validation of those
//! quantities so acquisition and propagation can assume a consistent
//! system.
//!
//! Key behaviors
//! -------------
//! - [`SystemState::new`] validates dimensions, finiteness, noise
//!   positivity, and the observed-index subset (unique, ascending,
//!   in-range, non-empty), and sorts the shift schedule by time.
//! - [`SystemState::schedule`] resolves a dense time grid into per-timestamp
//!   shift-segment ids and true parameter values: a shift at time `s`
//!   applies to timestamps strictly greater than `s`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `state_idxs` is non-empty, strictly ascending, and each entry is
//!   `< n_states`.
//! - `measurement_noise` is finite and strictly positive.
//! - Every shift's parameter vector has the same length as `lam_true`;
//!   shift times are finite. Segment id 0 is the base (`lam_true`) segment;
//!   segment `i + 1` is governed by the `i`-th shift in time order.
//!
//! Conventions
//! -----------
//! - When no observed subset is supplied, the first
//!   `min(n_states, MAX_DEFAULT_OBSERVED)` state indices are observed.
//!
//! Testing notes
//! -------------
//! - Unit tests cover constructor validation and schedule resolution
//!   around shift boundaries (strict inequality, multiple shifts, shifts
//!   outside the grid).

use crate::dynamics::errors::{DynamicsError, DynamicsResult};
use ndarray::{Array1, Array2};

/// Cap on the default observed-index subset when none is supplied.
pub const MAX_DEFAULT_OBSERVED: usize = 10;

/// One entry of the piecewise-constant true-parameter schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamShift {
    /// Time after which (strictly) the replacement parameters apply.
    pub time: f64,
    /// Replacement parameter vector; same length as the base parameters.
    pub params: Array1<f64>,
}

impl ParamShift {
    /// Construct a shift entry; validation happens in [`SystemState::new`].
    pub fn new(time: f64, params: Array1<f64>) -> ParamShift {
        ParamShift { time, params }
    }
}

/// `SystemState` — validated ground-truth state of the reference system.
///
/// Purpose
/// -------
/// Bundle the mutable trajectory head (`t0`, `x0`), the true parameter
/// vector and its shift schedule, the sensor noise level, and the observed
/// state-index subset. Exclusively owned and mutated by the acquisition /
/// propagation pair inside [`crate::dynamics::DynamicModel`].
///
/// Fields
/// ------
/// - `t0`: `f64`
///   Current reference time; advanced by committed acquisitions.
/// - `x0`: `Array1<f64>`
///   Current reference state; advanced alongside `t0`.
/// - `lam_true`: `Array1<f64>`
///   Base true parameter vector (segment 0 of the schedule).
/// - `param_shifts`: `Vec<ParamShift>`
///   Shift schedule, sorted ascending by time at construction.
/// - `measurement_noise`: `f64`
///   Sensor noise standard deviation; finite and > 0.
/// - `state_idxs`: `Vec<usize>`
///   Observed state indices; unique, ascending, each `< n_states`.
///
/// Invariants
/// ----------
/// - `state_idxs.len() <= n_states`; indices unique and ascending.
/// - All numeric fields finite; `measurement_noise > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemState {
    /// Current reference time.
    pub t0: f64,
    /// Current reference state vector.
    pub x0: Array1<f64>,
    /// Base true parameter vector.
    pub lam_true: Array1<f64>,
    /// Shift schedule, ascending by time.
    pub param_shifts: Vec<ParamShift>,
    /// Measurement-noise standard deviation.
    pub measurement_noise: f64,
    /// Observed state indices (unique, ascending).
    pub state_idxs: Vec<usize>,
}

impl SystemState {
    /// Construct a validated [`SystemState`].
    ///
    /// Parameters
    /// ----------
    /// - `t0`: initial reference time; must be finite.
    /// - `x0`: initial reference state; entries must be finite.
    /// - `lam_true`: base true parameter vector; entries must be finite,
    ///   at least one parameter.
    /// - `param_shifts`: shift schedule; times must be finite, parameter
    ///   vectors must match `lam_true` in length. Sorted here by time.
    /// - `measurement_noise`: sensor noise standard deviation; finite, > 0.
    /// - `state_idxs`: observed subset, or `None` to observe the first
    ///   `min(n_states, MAX_DEFAULT_OBSERVED)` indices. Must be non-empty,
    ///   strictly ascending, and in range.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::NonFiniteValue` for non-finite `t0`, states,
    ///   parameters, or shift times.
    /// - `DynamicsError::NonPositiveOption` for a degenerate noise level.
    /// - `DynamicsError::ParamLengthMismatch` for a shift vector of the
    ///   wrong length.
    /// - `DynamicsError::StateLengthMismatch` for an empty state vector.
    /// - `DynamicsError::NoObservedIndices`,
    ///   `DynamicsError::ObservedIndexOutOfRange`, and
    ///   `DynamicsError::DuplicateObservedIndex` for a malformed observed
    ///   subset.
    pub fn new(
        t0: f64,
        x0: Array1<f64>,
        lam_true: Array1<f64>,
        mut param_shifts: Vec<ParamShift>,
        measurement_noise: f64,
        state_idxs: Option<Vec<usize>>,
    ) -> DynamicsResult<Self> {
        if !t0.is_finite() {
            return Err(DynamicsError::NonFiniteValue { name: "t0", value: t0 });
        }
        if x0.is_empty() {
            return Err(DynamicsError::StateLengthMismatch { expected: 1, actual: 0 });
        }
        if let Some(&value) = x0.iter().find(|v| !v.is_finite()) {
            return Err(DynamicsError::NonFiniteValue { name: "x0", value });
        }
        if lam_true.is_empty() {
            return Err(DynamicsError::ParamLengthMismatch { expected: 1, actual: 0 });
        }
        if let Some(&value) = lam_true.iter().find(|v| !v.is_finite()) {
            return Err(DynamicsError::NonFiniteValue { name: "lam_true", value });
        }
        if !measurement_noise.is_finite() || measurement_noise <= 0.0 {
            return Err(DynamicsError::NonPositiveOption {
                name: "measurement_noise",
                value: measurement_noise,
            });
        }

        let n_states = x0.len();
        let n_params = lam_true.len();

        for shift in &param_shifts {
            if !shift.time.is_finite() {
                return Err(DynamicsError::NonFiniteValue {
                    name: "param_shift.time",
                    value: shift.time,
                });
            }
            if shift.params.len() != n_params {
                return Err(DynamicsError::ParamLengthMismatch {
                    expected: n_params,
                    actual: shift.params.len(),
                });
            }
            if let Some(&value) = shift.params.iter().find(|v| !v.is_finite()) {
                return Err(DynamicsError::NonFiniteValue {
                    name: "param_shift.params",
                    value,
                });
            }
        }
        param_shifts.sort_by(|a, b| a.time.total_cmp(&b.time));

        let state_idxs = match state_idxs {
            Some(idxs) => {
                if idxs.is_empty() {
                    return Err(DynamicsError::NoObservedIndices);
                }
                for (k, &idx) in idxs.iter().enumerate() {
                    if idx >= n_states {
                        return Err(DynamicsError::ObservedIndexOutOfRange { index: idx, n_states });
                    }
                    if k > 0 && idxs[k - 1] >= idx {
                        return Err(DynamicsError::DuplicateObservedIndex { index: idx });
                    }
                }
                idxs
            }
            None => (0..n_states.min(MAX_DEFAULT_OBSERVED)).collect(),
        };

        Ok(SystemState { t0, x0, lam_true, param_shifts, measurement_noise, state_idxs })
    }

    /// State dimension of the system.
    pub fn n_states(&self) -> usize {
        self.x0.len()
    }

    /// Parameter dimension of the system.
    pub fn n_params(&self) -> usize {
        self.lam_true.len()
    }

    /// Number of observed sensors.
    pub fn n_sensors(&self) -> usize {
        self.state_idxs.len()
    }

    /// Resolve a time grid into per-timestamp shift-segment ids and true
    /// parameter values.
    ///
    /// Returns `(shift_idx, param_vals)` where `shift_idx[i]` is the
    /// segment id at `ts[i]` (0 for the base segment, `k + 1` after the
    /// `k`-th shift) and `param_vals.row(i)` is the governing parameter
    /// vector. A shift at time `s` applies strictly after `s`.
    pub fn schedule(&self, ts: &Array1<f64>) -> (Vec<usize>, Array2<f64>) {
        let n = ts.len();
        let n_params = self.n_params();
        let mut shift_idx = vec![0usize; n];
        let mut param_vals = Array2::zeros((n, n_params));
        for i in 0..n {
            param_vals.row_mut(i).assign(&self.lam_true);
        }
        for (k, shift) in self.param_shifts.iter().enumerate() {
            for i in 0..n {
                if ts[i] > shift.time {
                    shift_idx[i] = k + 1;
                    param_vals.row_mut(i).assign(&shift.params);
                }
            }
        }
        (shift_idx, param_vals)
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
    // - Constructor validation of `SystemState::new` (noise, observed
    //   subset, shift vectors, default subset cap).
    // - Schedule resolution: strict shift-boundary semantics, multiple
    //   shifts, and shifts beyond the grid.
    //
    // They intentionally DO NOT cover:
    // - Acquisition or propagation behavior; those live in the model tests.
    // -------------------------------------------------------------------------

    fn make_state_stub(shifts: Vec<ParamShift>) -> SystemState {
        SystemState::new(
            0.0,
            array![1.0, 2.0],
            array![0.5],
            shifts,
            0.05,
            Some(vec![0, 1]),
        )
        .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Verify that a valid construction preserves its inputs and derives
    // the dimension accessors correctly.
    //
    // Given
    // -----
    // - A 2-state, 1-parameter system observing both states.
    //
    // Expect
    // ------
    // - `n_states == 2`, `n_params == 1`, `n_sensors == 2`.
    fn new_preserves_fields_and_dimensions() {
        let state = make_state_stub(vec![]);

        assert_eq!(state.n_states(), 2);
        assert_eq!(state.n_params(), 1);
        assert_eq!(state.n_sensors(), 2);
        assert_eq!(state.t0, 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Ensure degenerate noise levels are rejected.
    //
    // Given
    // -----
    // - `measurement_noise = 0.0`.
    //
    // Expect
    // ------
    // - `DynamicsError::NonPositiveOption` naming `measurement_noise`.
    fn new_rejects_non_positive_noise() {
        let err = SystemState::new(0.0, array![1.0], array![0.5], vec![], 0.0, Some(vec![0]))
            .unwrap_err();

        assert_eq!(
            err,
            DynamicsError::NonPositiveOption { name: "measurement_noise", value: 0.0 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Ensure out-of-range and non-ascending observed subsets are rejected.
    //
    // Given
    // -----
    // - `state_idxs = [0, 2]` for a 2-state system (out of range).
    // - `state_idxs = [1, 1]` (duplicate).
    //
    // Expect
    // ------
    // - `ObservedIndexOutOfRange` and `DuplicateObservedIndex`
    //   respectively.
    fn new_rejects_malformed_observed_subsets() {
        let err = SystemState::new(
            0.0,
            array![1.0, 2.0],
            array![0.5],
            vec![],
            0.05,
            Some(vec![0, 2]),
        )
        .unwrap_err();
        assert_eq!(err, DynamicsError::ObservedIndexOutOfRange { index: 2, n_states: 2 });

        let err = SystemState::new(
            0.0,
            array![1.0, 2.0],
            array![0.5],
            vec![],
            0.05,
            Some(vec![1, 1]),
        )
        .unwrap_err();
        assert_eq!(err, DynamicsError::DuplicateObservedIndex { index: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Ensure shift vectors must match the parameter dimension.
    //
    // Given
    // -----
    // - A shift carrying 2 parameters in a 1-parameter system.
    //
    // Expect
    // ------
    // - `DynamicsError::ParamLengthMismatch { expected: 1, actual: 2 }`.
    fn new_rejects_mismatched_shift_vectors() {
        let err = SystemState::new(
            0.0,
            array![1.0],
            array![0.5],
            vec![ParamShift::new(1.0, array![0.1, 0.2])],
            0.05,
            Some(vec![0]),
        )
        .unwrap_err();

        assert_eq!(err, DynamicsError::ParamLengthMismatch { expected: 1, actual: 2 });
    }

    #[test]
    // Purpose
    // -------
    // Verify strict shift-boundary semantics in `schedule`: a shift at
    // time `s` applies only to timestamps strictly greater than `s`.
    //
    // Given
    // -----
    // - One shift at `t = 1.0` replacing the base parameter 0.5 with 0.9.
    // - Grid `[0.0, 1.0, 2.0]`.
    //
    // Expect
    // ------
    // - Segment ids `[0, 0, 1]`; parameter values `[0.5, 0.5, 0.9]`.
    fn schedule_applies_shifts_strictly_after_their_time() {
        let state = make_state_stub(vec![ParamShift::new(1.0, array![0.9])]);
        let ts = array![0.0, 1.0, 2.0];

        let (shift_idx, param_vals) = state.schedule(&ts);

        assert_eq!(shift_idx, vec![0, 0, 1]);
        assert_eq!(param_vals.column(0).to_vec(), vec![0.5, 0.5, 0.9]);
    }

    #[test]
    // Purpose
    // -------
    // Verify later shifts override earlier ones and shifts beyond the grid
    // leave the schedule untouched.
    //
    // Given
    // -----
    // - Shifts at 0.5 (-> 0.7) and 1.5 (-> 0.9), plus one at 10.0.
    // - Grid `[0.0, 1.0, 2.0]`.
    //
    // Expect
    // ------
    // - Segment ids `[0, 1, 2]`; values `[0.5, 0.7, 0.9]`; the far shift
    //   contributes nothing.
    fn schedule_layers_multiple_shifts_in_time_order() {
        let state = make_state_stub(vec![
            ParamShift::new(1.5, array![0.9]),
            ParamShift::new(0.5, array![0.7]),
            ParamShift::new(10.0, array![0.1]),
        ]);
        let ts = array![0.0, 1.0, 2.0];

        let (shift_idx, param_vals) = state.schedule(&ts);

        assert_eq!(shift_idx, vec![0, 1, 2]);
        assert_eq!(param_vals.column(0).to_vec(), vec![0.5, 0.7, 0.9]);
    }

    #[test]
    // Purpose
    // -------
    // Verify the default observed subset is the first
    // `min(n_states, MAX_DEFAULT_OBSERVED)` indices.
    //
    // Given
    // -----
    // - A 3-state system constructed with `state_idxs = None`.
    //
    // Expect
    // ------
    // - `state_idxs == [0, 1, 2]`.
    fn new_defaults_observed_subset_to_leading_indices() {
        let state =
            SystemState::new(0.0, array![1.0, 2.0, 3.0], array![0.5], vec![], 0.05, None).unwrap();

        assert_eq!(state.state_idxs, vec![0, 1, 2]);
    }
}
