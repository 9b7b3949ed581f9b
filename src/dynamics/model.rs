//! Windowed acquisition and ensemble propagation over a forward model.
//!
//! Purpose
//! -------
//! Implement the stateful engine the online controllers drive:
//! [`DynamicModel`] owns the ground-truth [`SystemState`], the validated
//! [`DynamicsOptions`], the acquired window list, the propagated ensemble
//! list, and a single seeded RNG. Acquisition walks the reference
//! trajectory forward (splitting at shift boundaries); propagation pushes
//! candidate parameter draws through the same forward model and aligns
//! their predictions with a window's observed readings.
//!
//! Key behaviors
//! -------------
//! - [`DynamicModel::acquire`] builds the dense grid, resolves the shift
//!   schedule, chains segment trajectories, injects Gaussian noise at
//!   sample instants on observed indices, and either commits (appends the
//!   window and advances `t0`/`x0`) or peeks (leaves all state untouched
//!   beyond RNG consumption).
//! - [`DynamicModel::propagate`] reuses carried initial conditions unless
//!   a restart is requested, in which case per-sample conditions are
//!   regenerated by perturbing the window's first reference state.
//! - Ensembles append at `window_index == ensembles.len()` and overwrite
//!   in place at an existing index; a gap is an error.
//!
//! Invariants & assumptions
//! ------------------------
//! - The forward model is deterministic; all stochasticity comes from the
//!   model-owned RNG.
//! - A window's final grid point is always a sample instant, so committed
//!   acquisitions advance `t0`/`x0` to a sampled state.
//!
//! Testing notes
//! -------------
//! - Unit tests pin the grid construction, the peek/commit distinction,
//!   segment chaining under a shift, initial-condition clipping, and the
//!   append/overwrite/gap ensemble rules against a closed-form linear
//!   forward model.

use crate::dynamics::core::ensemble::{InitialConditions, SampleEnsemble};
use crate::dynamics::core::options::DynamicsOptions;
use crate::dynamics::core::state::SystemState;
use crate::dynamics::core::window::DataWindow;
use crate::dynamics::errors::{DynamicsError, DynamicsResult};
use crate::dynamics::forward::ForwardModel;
use crate::samplers::{GaussianNoise, UniformBox};
use log::debug;
use ndarray::{s, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `DynamicModel` — stateful acquisition/propagation engine.
///
/// Purpose
/// -------
/// Pair a [`ForwardModel`] with the ground-truth system and accumulate the
/// window/ensemble history the online controllers iterate over.
///
/// Fields
/// ------
/// - `forward`: the caller's forward map.
/// - `state`: validated ground-truth state; mutated only by committed
///   acquisitions.
/// - `opts`: validated cadences, bounds, and seed.
/// - `windows`, `ensembles`: acquisition-ordered histories, addressed by
///   window index.
/// - `rng`: single seeded RNG behind every stochastic operation.
///
/// Invariants
/// ----------
/// - `ensembles.len() <= windows.len()` during controller iteration.
#[derive(Debug)]
pub struct DynamicModel<F: ForwardModel> {
    pub(crate) forward: F,
    pub(crate) state: SystemState,
    pub(crate) opts: DynamicsOptions,
    pub(crate) windows: Vec<DataWindow>,
    pub(crate) ensembles: Vec<SampleEnsemble>,
    pub(crate) rng: StdRng,
}

impl<F: ForwardModel> DynamicModel<F> {
    /// Assemble a model from a validated state and options.
    ///
    /// Seeds the internal RNG from `opts.seed`, or from entropy when the
    /// seed is `None`.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::BoundLengthMismatch` when the configured state
    ///   bounds do not span the state dimension or the parameter bounds do
    ///   not span the parameter dimension.
    pub fn new(forward: F, state: SystemState, opts: DynamicsOptions) -> DynamicsResult<Self> {
        if let Some((mins, maxs)) = &opts.state_bounds {
            if mins.len() != state.n_states() || maxs.len() != state.n_states() {
                return Err(DynamicsError::BoundLengthMismatch {
                    name: "state_bounds",
                    expected: state.n_states(),
                    actual: mins.len().min(maxs.len()),
                });
            }
        }
        if let Some((mins, maxs)) = &opts.param_bounds {
            if mins.len() != state.n_params() || maxs.len() != state.n_params() {
                return Err(DynamicsError::BoundLengthMismatch {
                    name: "param_bounds",
                    expected: state.n_params(),
                    actual: mins.len().min(maxs.len()),
                });
            }
        }
        let rng = match opts.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(DynamicModel { forward, state, opts, windows: Vec::new(), ensembles: Vec::new(), rng })
    }

    /// Ground-truth system state.
    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Acquisition/propagation options.
    pub fn opts(&self) -> &DynamicsOptions {
        &self.opts
    }

    /// Acquired windows in acquisition order.
    pub fn windows(&self) -> &[DataWindow] {
        &self.windows
    }

    /// Propagated ensembles in window order.
    pub fn ensembles(&self) -> &[SampleEnsemble] {
        &self.ensembles
    }

    /// Window at `index`, or an indexing error.
    pub fn window(&self, index: usize) -> DynamicsResult<&DataWindow> {
        if self.windows.is_empty() {
            return Err(DynamicsError::EmptyWindows);
        }
        self.windows
            .get(index)
            .ok_or(DynamicsError::WindowOutOfRange { index, len: self.windows.len() })
    }

    /// Ensemble at `index`, or an indexing error.
    pub fn ensemble(&self, index: usize) -> DynamicsResult<&SampleEnsemble> {
        self.ensembles
            .get(index)
            .ok_or(DynamicsError::EnsembleOutOfRange { index, len: self.ensembles.len() })
    }

    /// Record the row a completed inversion selected on the ensemble at
    /// `index`.
    pub fn mark_best(&mut self, index: usize, row: usize) -> DynamicsResult<()> {
        let len = self.ensembles.len();
        let ens = self
            .ensembles
            .get_mut(index)
            .ok_or(DynamicsError::EnsembleOutOfRange { index, len })?;
        ens.mark_best(row)
    }

    /// Acquire one window of reference data of length `window_length`.
    ///
    /// The dense grid has `floor(window_length / solve_dt)` points spanning
    /// `[t0, t0 + window_length]` inclusive. Every
    /// `floor(sample_dt / solve_dt)`-th point is a sample instant, and the
    /// final point always is. The reference trajectory is solved per shift
    /// segment, chaining terminal states, and Gaussian noise at the
    /// system's noise level lands only on observed indices at sample
    /// instants.
    ///
    /// Parameters
    /// ----------
    /// - `window_length`: time span to acquire; must be finite and > 0.
    /// - `x0_override`, `t0_override`: optional starting point replacing
    ///   the tracked `x0`/`t0` for this acquisition.
    /// - `commit`: when true, append the window and advance `t0`/`x0` to
    ///   the window's last sampled instant; when false, a pure peek.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::WindowTooShort` when the grid has < 2 points.
    /// - `DynamicsError::StateLengthMismatch` for a malformed override.
    /// - `DynamicsError::NonPositiveOption` / `NonFiniteValue` for a
    ///   degenerate `window_length` or non-finite override time.
    pub fn acquire(
        &mut self,
        window_length: f64,
        x0_override: Option<Array1<f64>>,
        t0_override: Option<f64>,
        commit: bool,
    ) -> DynamicsResult<DataWindow> {
        if !window_length.is_finite() || window_length <= 0.0 {
            return Err(DynamicsError::NonPositiveOption {
                name: "window_length",
                value: window_length,
            });
        }
        let t0 = match t0_override {
            Some(t) if !t.is_finite() => {
                return Err(DynamicsError::NonFiniteValue { name: "t0_override", value: t })
            }
            Some(t) => t,
            None => self.state.t0,
        };
        let x0 = match x0_override {
            Some(x) if x.len() != self.state.n_states() => {
                return Err(DynamicsError::StateLengthMismatch {
                    expected: self.state.n_states(),
                    actual: x.len(),
                })
            }
            Some(x) => x,
            None => self.state.x0.clone(),
        };

        let points = (window_length / self.opts.solve_dt) as usize;
        if points < 2 {
            return Err(DynamicsError::WindowTooShort {
                window_length,
                solve_dt: self.opts.solve_dt,
                points,
            });
        }
        let ts = Array1::linspace(t0, t0 + window_length, points);

        let sample_step = self.opts.sample_step();
        let mut sample_flag: Vec<bool> = (0..points).map(|i| i % sample_step == 0).collect();
        sample_flag[points - 1] = true;

        let (shift_idx, lam_true) = self.state.schedule(&ts);

        // Chain the reference trajectory across shift segments.
        let n_states = self.state.n_states();
        let mut true_states = Array2::zeros((points, n_states));
        let mut seg_x0 = x0;
        let mut start = 0;
        while start < points {
            let mut end = start + 1;
            while end < points && shift_idx[end] == shift_idx[start] {
                end += 1;
            }
            let seg_ts = ts.slice(s![start..end]).to_owned();
            let traj =
                self.forward.propagate(seg_x0.view(), seg_ts.view(), lam_true.row(start));
            if traj.dim() != (end - start, n_states) {
                return Err(DynamicsError::TrajectoryShapeMismatch {
                    expected: (end - start, n_states),
                    actual: traj.dim(),
                });
            }
            true_states.slice_mut(s![start..end, ..]).assign(&traj);
            seg_x0 = traj.row(traj.nrows() - 1).to_owned();
            start = end;
        }

        // Noise lands only at sample instants on observed indices.
        let mut measurements = Array2::from_elem((points, n_states), f64::NAN);
        for i in 0..points {
            if !sample_flag[i] {
                continue;
            }
            for &j in &self.state.state_idxs {
                let mut reading = [true_states[[i, j]]];
                GaussianNoise::perturb(&mut reading, self.state.measurement_noise, &mut self.rng)?;
                measurements[[i, j]] = reading[0];
            }
        }

        let window = DataWindow::new(
            ts,
            shift_idx,
            sample_flag,
            lam_true,
            true_states,
            measurements,
            self.state.state_idxs.clone(),
            self.state.n_params(),
        )?;

        if commit {
            self.state.t0 = window.last_sampled_time();
            self.state.x0 = window.last_sampled_state();
            debug!(
                "acquired window {} spanning [{:.4}, {:.4}] with {} sample instants",
                self.windows.len(),
                window.ts[0],
                window.last_sampled_time(),
                window.n_sample_instants()
            );
            self.windows.push(window.clone());
        }
        Ok(window)
    }

    /// Generate per-sample initial conditions by Gaussian perturbation of
    /// `x0` at the measurement-noise level, clipped to the configured state
    /// bounds.
    pub fn generate_initial_conditions(
        &mut self,
        x0: &Array1<f64>,
        count: usize,
    ) -> DynamicsResult<InitialConditions> {
        if x0.len() != self.state.n_states() {
            return Err(DynamicsError::StateLengthMismatch {
                expected: self.state.n_states(),
                actual: x0.len(),
            });
        }
        if count == 0 {
            return Err(DynamicsError::EmptyEnsembleInput);
        }
        let n_states = x0.len();
        let mut out = Array2::zeros((count, n_states));
        for mut row in out.rows_mut() {
            let mut buf: Vec<f64> = x0.to_vec();
            GaussianNoise::perturb(&mut buf, self.state.measurement_noise, &mut self.rng)?;
            if let Some((mins, maxs)) = &self.opts.state_bounds {
                for (j, v) in buf.iter_mut().enumerate() {
                    *v = v.max(mins[j]).min(maxs[j]);
                }
            }
            row.assign(&Array1::from_vec(buf));
        }
        Ok(InitialConditions(out))
    }

    /// Push a parameter ensemble through the forward model against the
    /// window at `window_index`.
    ///
    /// Each sample row is propagated over the window's dense grid from its
    /// carried initial condition; predictions are the trajectory values at
    /// sample instants over the observed indices, flattened
    /// sample-instant-major. The resulting ensemble is appended at
    /// `window_index == ensembles.len()` or overwritten in place at an
    /// existing index.
    ///
    /// Parameters
    /// ----------
    /// - `samples`: `n_samples x n_params` parameter table.
    /// - `restart`: when true, or when `carried` is `None`, per-sample
    ///   initial conditions are regenerated from the window's first
    ///   reference state.
    /// - `window_index`: window to align predictions with.
    /// - `carried`: initial conditions returned by the previous call.
    ///
    /// Returns the per-sample terminal states to carry into the next call.
    ///
    /// Errors
    /// ------
    /// - `DynamicsError::EmptyEnsembleInput` for an empty sample table.
    /// - `DynamicsError::ParamLengthMismatch` for a wrong parameter width.
    /// - `DynamicsError::WindowOutOfRange` / `EmptyWindows` for a bad
    ///   window reference.
    /// - `DynamicsError::CarriedShapeMismatch` when `carried` does not
    ///   match the sample table.
    /// - `DynamicsError::EnsembleOutOfRange` when `window_index` would
    ///   leave a gap in the ensemble list.
    /// - `DynamicsError::TrajectoryShapeMismatch` when the forward model
    ///   returns a malformed trajectory.
    pub fn propagate(
        &mut self,
        samples: &Array2<f64>,
        restart: bool,
        window_index: usize,
        carried: Option<&InitialConditions>,
    ) -> DynamicsResult<InitialConditions> {
        let n_samples = samples.nrows();
        if n_samples == 0 {
            return Err(DynamicsError::EmptyEnsembleInput);
        }
        if samples.ncols() != self.state.n_params() {
            return Err(DynamicsError::ParamLengthMismatch {
                expected: self.state.n_params(),
                actual: samples.ncols(),
            });
        }
        if window_index > self.ensembles.len() {
            return Err(DynamicsError::EnsembleOutOfRange {
                index: window_index,
                len: self.ensembles.len(),
            });
        }
        let window = self.window(window_index)?.clone();
        let n_states = self.state.n_states();

        let ics = match carried {
            Some(c) if !restart => {
                if c.0.dim() != (n_samples, n_states) {
                    return Err(DynamicsError::CarriedShapeMismatch {
                        expected: (n_samples, n_states),
                        actual: c.0.dim(),
                    });
                }
                c.clone()
            }
            _ => {
                let first_state = window.true_states.row(0).to_owned();
                self.generate_initial_conditions(&first_state, n_samples)?
            }
        };

        let sample_idxs = window.sample_indices();
        let n_readings = sample_idxs.len() * window.state_idxs.len();
        let mut predicted = Array2::zeros((n_samples, n_readings));
        let mut terminal = Array2::zeros((n_samples, n_states));
        for i in 0..n_samples {
            let traj = self.forward.propagate(
                ics.0.row(i),
                window.ts.view(),
                samples.row(i),
            );
            if traj.dim() != (window.ts.len(), n_states) {
                return Err(DynamicsError::TrajectoryShapeMismatch {
                    expected: (window.ts.len(), n_states),
                    actual: traj.dim(),
                });
            }
            let mut k = 0;
            for &t in &sample_idxs {
                for &j in &window.state_idxs {
                    predicted[[i, k]] = traj[[t, j]];
                    k += 1;
                }
            }
            terminal.row_mut(i).assign(&traj.row(traj.nrows() - 1));
        }

        let ensemble = SampleEnsemble::new(
            samples.clone(),
            predicted,
            sample_idxs.len(),
            window.state_idxs.len(),
        )?;
        if window_index == self.ensembles.len() {
            self.ensembles.push(ensemble);
        } else {
            self.ensembles[window_index] = ensemble;
        }
        debug!(
            "propagated {} samples against window {} ({} readings each)",
            n_samples, window_index, n_readings
        );
        Ok(InitialConditions(terminal))
    }

    /// Draw a difficulty-scaled uniform prior ensemble around the true
    /// parameter vector.
    ///
    /// The box half-widths are `scale * |lam_true_i|` per coordinate
    /// (falling back to `scale` at zero), clipped to the configured
    /// parameter bounds.
    pub fn uniform_initial_samples(
        &mut self,
        scale: f64,
        count: usize,
    ) -> DynamicsResult<(UniformBox, Array2<f64>)> {
        if count == 0 {
            return Err(DynamicsError::EmptyEnsembleInput);
        }
        let bounds = self
            .opts
            .param_bounds
            .as_ref()
            .map(|(mins, maxs)| (mins, maxs));
        let prior = UniformBox::around(&self.state.lam_true, scale, bounds)?;
        let draws = prior.sample(count, &mut self.rng)?;
        Ok((prior, draws))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, ArrayView1};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Bound-dimension validation at model assembly.
    // - Grid construction: point count, endpoint inclusion, sample-flag
    //   cadence, and the forced final flag.
    // - Peek versus commit acquisition semantics.
    // - Segment chaining across a shift boundary.
    // - Noise placement (finite exactly on the sample/observed mask).
    // - Initial-condition regeneration, clipping, and carried reuse.
    // - Ensemble append/overwrite/gap rules.
    //
    // They intentionally DO NOT cover:
    // - Inversion or controller behavior; those live in `inversion`,
    //   `control`, and the integration tests.
    // -------------------------------------------------------------------------

    /// Closed-form linear growth: `x(t) = x(t0) + lam * (t - t0)` per state.
    #[derive(Debug)]
    struct LinearGrowth;

    impl ForwardModel for LinearGrowth {
        fn propagate(
            &self,
            x0: ArrayView1<'_, f64>,
            times: ArrayView1<'_, f64>,
            params: ArrayView1<'_, f64>,
        ) -> Array2<f64> {
            let mut out = Array2::zeros((times.len(), x0.len()));
            for (i, &t) in times.iter().enumerate() {
                for j in 0..x0.len() {
                    out[[i, j]] = x0[j] + params[0] * (t - times[0]);
                }
            }
            out
        }
    }

    fn make_model_stub(shifts: Vec<crate::dynamics::ParamShift>) -> DynamicModel<LinearGrowth> {
        let state = SystemState::new(
            0.0,
            array![1.0, 2.0],
            array![0.5],
            shifts,
            0.01,
            Some(vec![0, 1]),
        )
        .unwrap();
        let opts = DynamicsOptions::new(0.25, 0.5, None, None, Some(17)).unwrap();
        DynamicModel::new(LinearGrowth, state, opts).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Ensure bound arrays shorter than the system dimensions are rejected
    // at assembly instead of surfacing later as an indexing panic.
    //
    // Given
    // -----
    // - A 2-state, 1-parameter system paired first with 1-entry state
    //   bounds, then with 2-entry parameter bounds.
    //
    // Expect
    // ------
    // - `DynamicsError::BoundLengthMismatch` naming the offending pair in
    //   each case.
    fn new_rejects_bounds_shorter_than_dimensions() {
        let state = || {
            SystemState::new(0.0, array![1.0, 2.0], array![0.5], vec![], 0.01, Some(vec![0, 1]))
                .unwrap()
        };

        let opts = DynamicsOptions::new(
            0.25,
            0.5,
            Some((array![0.0], array![10.0])),
            None,
            Some(2),
        )
        .unwrap();
        let err = DynamicModel::new(LinearGrowth, state(), opts).unwrap_err();
        assert_eq!(
            err,
            DynamicsError::BoundLengthMismatch { name: "state_bounds", expected: 2, actual: 1 }
        );

        let opts = DynamicsOptions::new(
            0.25,
            0.5,
            None,
            Some((array![0.0, 0.0], array![1.0, 1.0])),
            Some(2),
        )
        .unwrap();
        let err = DynamicModel::new(LinearGrowth, state(), opts).unwrap_err();
        assert_eq!(
            err,
            DynamicsError::BoundLengthMismatch { name: "param_bounds", expected: 1, actual: 2 }
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify the dense grid and sample flags of an acquisition.
    //
    // Given
    // -----
    // - `window_length = 2.0`, `solve_dt = 0.25`, `sample_dt = 0.5`.
    //
    // Expect
    // ------
    // - 8 grid points spanning [0, 2] inclusive; flags every 2nd point
    //   plus a forced final flag.
    fn acquire_builds_inclusive_grid_with_forced_final_flag() {
        let mut model = make_model_stub(vec![]);

        let window = model.acquire(2.0, None, None, false).unwrap();

        assert_eq!(window.ts.len(), 8);
        assert_eq!(window.ts[0], 0.0);
        assert_eq!(window.ts[7], 2.0);
        assert_eq!(
            window.sample_flag,
            vec![true, false, true, false, true, false, true, true]
        );
    }

    #[test]
    // Purpose
    // -------
    // Verify a peek leaves tracked state untouched while a commit advances
    // it to the window's last sampled instant.
    //
    // Given
    // -----
    // - One peek then one commit of a 2.0-length window from t0 = 0.
    //
    // Expect
    // ------
    // - After the peek: `t0 == 0`, no windows recorded.
    // - After the commit: `t0 == 2.0`, `x0` equals the window's terminal
    //   state, one window recorded.
    fn acquire_peek_is_pure_and_commit_advances() {
        let mut model = make_model_stub(vec![]);

        model.acquire(2.0, None, None, false).unwrap();
        assert_eq!(model.state().t0, 0.0);
        assert!(model.windows().is_empty());

        let window = model.acquire(2.0, None, None, true).unwrap();
        assert_eq!(model.state().t0, 2.0);
        assert_eq!(model.state().x0, window.last_sampled_state());
        assert_eq!(model.windows().len(), 1);
    }

    #[test]
    // Purpose
    // -------
    // Verify segment chaining across a shift boundary: each segment is
    // solved with its own constant parameter, and a new segment's first
    // timestamp carries the previous segment's terminal state verbatim.
    //
    // Given
    // -----
    // - Base slope 0.5, shift to slope 2.0 at t = 1.0, window [0, 2]
    //   (8 grid points; points 0..=3 fall in segment 0, points 4..=7 in
    //   segment 1).
    //
    // Expect
    // ------
    // - Slope 0.5 inside segment 0, slope 2.0 inside segment 1, and zero
    //   growth across the boundary interval where the terminal state is
    //   carried.
    fn acquire_chains_segments_across_a_shift() {
        let mut model = make_model_stub(vec![crate::dynamics::ParamShift::new(
            1.0,
            array![2.0],
        )]);

        let window = model.acquire(2.0, None, None, false).unwrap();

        assert_eq!(window.shift_idx, vec![0, 0, 0, 0, 1, 1, 1, 1]);
        let ts = &window.ts;
        let xs = window.true_states.column(0);
        for i in 1..ts.len() {
            let slope = (xs[i] - xs[i - 1]) / (ts[i] - ts[i - 1]);
            let expected = match i {
                1..=3 => 0.5,
                4 => 0.0,
                _ => 2.0,
            };
            assert!(
                (slope - expected).abs() < 1e-9,
                "slope {} at ts[{}] = {}, expected {}",
                slope,
                i,
                ts[i],
                expected
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify noise placement: measurements are finite exactly at sample
    // instants on observed indices.
    //
    // Given
    // -----
    // - A system observing only state 1 of 2.
    //
    // Expect
    // ------
    // - Column 0 is all NaN; column 1 is finite exactly where the flag is
    //   set.
    fn acquire_places_noise_only_on_the_observed_mask() {
        let state = SystemState::new(0.0, array![1.0, 2.0], array![0.5], vec![], 0.01, Some(vec![1]))
            .unwrap();
        let opts = DynamicsOptions::new(0.25, 0.5, None, None, Some(3)).unwrap();
        let mut model = DynamicModel::new(LinearGrowth, state, opts).unwrap();

        let window = model.acquire(2.0, None, None, false).unwrap();

        for i in 0..window.ts.len() {
            assert!(window.measurements[[i, 0]].is_nan());
            assert_eq!(window.measurements[[i, 1]].is_finite(), window.sample_flag[i]);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify initial-condition regeneration perturbs around the given
    // state and clips to state bounds.
    //
    // Given
    // -----
    // - State bounds `[0.9, 1.9] .. [1.1, 2.1]` and 50 regenerated rows.
    //
    // Expect
    // ------
    // - Every row lies inside the bounds.
    fn generate_initial_conditions_clips_to_state_bounds() {
        let state =
            SystemState::new(0.0, array![1.0, 2.0], array![0.5], vec![], 0.5, Some(vec![0, 1]))
                .unwrap();
        let opts = DynamicsOptions::new(
            0.25,
            0.5,
            Some((array![0.9, 1.9], array![1.1, 2.1])),
            None,
            Some(5),
        )
        .unwrap();
        let mut model = DynamicModel::new(LinearGrowth, state, opts).unwrap();

        let ics = model.generate_initial_conditions(&array![1.0, 2.0], 50).unwrap();

        assert_eq!(ics.0.dim(), (50, 2));
        for i in 0..50 {
            assert!(ics.0[[i, 0]] >= 0.9 && ics.0[[i, 0]] <= 1.1);
            assert!(ics.0[[i, 1]] >= 1.9 && ics.0[[i, 1]] <= 2.1);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify carried conditions are reused verbatim when restart is false
    // and predictions align with the window's reading layout.
    //
    // Given
    // -----
    // - Exact carried conditions `[[1.0, 2.0]]` and the linear model, so
    //   the trajectory is closed form.
    //
    // Expect
    // ------
    // - Predicted readings equal `ic + lam * (t_k - t0)` at each sample
    //   instant and sensor; terminal state matches the trajectory end.
    fn propagate_reuses_carried_conditions_and_aligns_predictions() {
        let mut model = make_model_stub(vec![]);
        model.acquire(2.0, None, None, true).unwrap();
        let samples = array![[0.5]];
        let carried = InitialConditions(array![[1.0, 2.0]]);

        let next = model.propagate(&samples, false, 0, Some(&carried)).unwrap();

        let window = model.window(0).unwrap();
        let ens = model.ensemble(0).unwrap();
        assert_eq!(ens.n_samples(), 1);
        assert_eq!(ens.predicted.ncols(), window.n_readings());
        let mut k = 0;
        for &t in &window.sample_indices() {
            let dt = window.ts[t] - window.ts[0];
            for &j in &[0usize, 1usize] {
                let base = if j == 0 { 1.0 } else { 2.0 };
                assert!((ens.predicted[[0, k]] - (base + 0.5 * dt)).abs() < 1e-12);
                k += 1;
            }
        }
        assert!((next.0[[0, 0]] - (1.0 + 0.5 * 2.0)).abs() < 1e-12);
        assert!((next.0[[0, 1]] - (2.0 + 0.5 * 2.0)).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Verify the ensemble placement rules: append at the next index,
    // overwrite in place at an existing index, error on a gap.
    //
    // Given
    // -----
    // - One acquired window; propagations at indices 0 (twice) and 2.
    //
    // Expect
    // ------
    // - First call appends; second overwrites (list length stays 1);
    //   index 2 yields `EnsembleOutOfRange`.
    fn propagate_appends_overwrites_and_rejects_gaps() {
        let mut model = make_model_stub(vec![]);
        model.acquire(2.0, None, None, true).unwrap();
        let samples_a = array![[0.5]];
        let samples_b = array![[0.9], [1.1]];

        model.propagate(&samples_a, true, 0, None).unwrap();
        assert_eq!(model.ensembles().len(), 1);
        assert_eq!(model.ensemble(0).unwrap().n_samples(), 1);

        model.propagate(&samples_b, true, 0, None).unwrap();
        assert_eq!(model.ensembles().len(), 1);
        assert_eq!(model.ensemble(0).unwrap().n_samples(), 2);

        let err = model.propagate(&samples_a, true, 2, None).unwrap_err();
        assert_eq!(err, DynamicsError::EnsembleOutOfRange { index: 2, len: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Verify the uniform prior ensemble stays inside the clipped box.
    //
    // Given
    // -----
    // - `lam_true = [0.5]`, scale 0.5, parameter bounds `[0.3, 0.7]`.
    //
    // Expect
    // ------
    // - The box is `[0.3, 0.7]` and all 100 draws lie inside it.
    fn uniform_initial_samples_respects_parameter_bounds() {
        let state = SystemState::new(0.0, array![1.0], array![0.5], vec![], 0.01, Some(vec![0]))
            .unwrap();
        let opts = DynamicsOptions::new(
            0.25,
            0.5,
            None,
            Some((array![0.3], array![0.7])),
            Some(11),
        )
        .unwrap();
        let mut model = DynamicModel::new(LinearGrowth, state, opts).unwrap();

        let (prior, draws) = model.uniform_initial_samples(0.5, 100).unwrap();

        assert_eq!(prior.lo, array![0.3]);
        assert_eq!(prior.hi, array![0.7]);
        for &v in draws.iter() {
            assert!(v >= 0.3 && v <= 0.7);
        }
    }
}
