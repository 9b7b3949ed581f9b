//! Adaptive online controller with importance-weight accumulation.
//!
//! Purpose
//! -------
//! Walk a caller-supplied sequence of window boundaries, solving one
//! fixed-configuration inversion per window and adapting to what the
//! expected-ratio deviation `d = |e_r - 1|` reveals: a small deviation is
//! accepted and its per-sample weight ratios join the importance-weight
//! stack; a mid-range deviation triggers one refine-retry from the
//! previous accepted posterior; a large (or sentinel negative) deviation
//! triggers one shift redraw from the difficulty-scaled uniform box.
//!
//! Key behaviors
//! -------------
//! - At most two attempts per window; exhausting them rolls the ensemble,
//!   prior, and weight stack back to their window-start values and records
//!   the window as skipped.
//! - An ill-posed solve forces the sentinel deviation `-1.0`, routing into
//!   the shift arm.
//! - After every acceptance the net weights (elementwise product of the
//!   stack) are checked: when the fraction of samples with non-negligible
//!   weight drops below `min_eff_sample_frac`, the ensemble is resampled
//!   from the fresh posterior, the stack is cleared, and the current
//!   sample grouping is closed. Acceptance after a retry also closes the
//!   grouping.
//!
//! Invariants & assumptions
//! ------------------------
//! - The effective sample size never increases while the weight stack
//!   only grows; clearing the stack resets it to the full ensemble.
//! - A refine-retry on the first window is fatal: there is no earlier
//!   posterior to refine from.
//!
//! Testing notes
//! -------------
//! - `net_weights` / `effective_sample_size` are pure and unit tested
//!   here; the controller branches are exercised end to end in the
//!   integration tests with a scripted solver.

use crate::control::errors::{ControlError, ControlResult};
use crate::control::AcceptedEntry;
use crate::dynamics::{DynamicModel, ForwardModel, InitialConditions};
use crate::inversion::{
    InversionError, SolveConfig, SolveStatus, Solver, SolverBuilder,
};
use log::{info, warn};
use ndarray::Array1;

/// Net weights below this level count a sample as effectively dead.
pub const NEGLIGIBLE_WEIGHT: f64 = 1e-10;

/// Elementwise product of a stack of per-sample weight vectors.
///
/// An empty stack yields the all-ones vector of length `n_samples`.
pub fn net_weights(stack: &[Array1<f64>], n_samples: usize) -> Array1<f64> {
    let mut net = Array1::ones(n_samples);
    for w in stack {
        net = net * w;
    }
    net
}

/// Count of samples whose net weight is above [`NEGLIGIBLE_WEIGHT`].
pub fn effective_sample_size(net: &Array1<f64>) -> usize {
    net.iter().filter(|&&w| w > NEGLIGIBLE_WEIGHT).count()
}

/// Per-attempt resolution of the adaptive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptiveDecision {
    /// The solve was accepted and its weights joined the stack.
    Accepted,
    /// Mid-range deviation; the ensemble was resampled from the previous
    /// accepted posterior for one retry.
    RefineRetry,
    /// Large or sentinel deviation; the ensemble was redrawn from the
    /// uniform box for one retry.
    Shifted,
}

/// One attempt of the adaptive loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveStep {
    /// Window the attempt worked on.
    pub window_index: usize,
    /// 0-based attempt number within the window.
    pub attempt: usize,
    /// Resolution of the attempt.
    pub decision: AdaptiveDecision,
    /// Expected-ratio deviation observed (`-1.0` sentinel for an
    /// ill-posed solve).
    pub deviation: f64,
}

/// Validated options of the adaptive controller.
///
/// Fields
/// ------
/// - `time_windows`: strictly ascending window boundaries; at least 2.
/// - `ensemble_size`: draws per ensemble; > 0.
/// - `difficulty`: scale of the uniform box; finite and > 0.
/// - `num_components`: retained data-reduction components per solve; > 0.
/// - `resample_thresh` / `shift_thresh`: deviation levels separating
///   accept, refine-retry, and shift; each finite and > 0.
/// - `min_eff_sample_frac`: effective-sample fraction below which the
///   ensemble is resampled after an acceptance; finite and > 0.
/// - `initial_weights`: optional pre-seeded weight stack; each vector
///   must have `ensemble_size` entries.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveOptions {
    /// Strictly ascending window boundaries.
    pub time_windows: Vec<f64>,
    /// Draws per ensemble.
    pub ensemble_size: usize,
    /// Uniform-box scale.
    pub difficulty: f64,
    /// Retained components per solve.
    pub num_components: usize,
    /// Deviation level above which refinement is attempted.
    pub resample_thresh: f64,
    /// Deviation level above which a shift is suspected.
    pub shift_thresh: f64,
    /// Effective-sample fraction floor.
    pub min_eff_sample_frac: f64,
    /// Pre-seeded weight stack.
    pub initial_weights: Option<Vec<Array1<f64>>>,
}

impl AdaptiveOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `ControlError::TooFewBoundaries` / `BoundariesNotAscending` for a
    ///   malformed boundary sequence.
    /// - `ControlError::NonPositiveOption` for a degenerate count, scale,
    ///   or threshold.
    /// - `ControlError::WeightLengthMismatch` for a pre-seeded weight
    ///   vector of the wrong length.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        time_windows: Vec<f64>,
        ensemble_size: usize,
        difficulty: f64,
        num_components: usize,
        resample_thresh: f64,
        shift_thresh: f64,
        min_eff_sample_frac: f64,
        initial_weights: Option<Vec<Array1<f64>>>,
    ) -> ControlResult<Self> {
        if time_windows.len() < 2 {
            return Err(ControlError::TooFewBoundaries { len: time_windows.len() });
        }
        for i in 1..time_windows.len() {
            if time_windows[i - 1] >= time_windows[i] {
                return Err(ControlError::BoundariesNotAscending { index: i });
            }
        }
        if ensemble_size == 0 {
            return Err(ControlError::NonPositiveOption { name: "ensemble_size", value: 0.0 });
        }
        if num_components == 0 {
            return Err(ControlError::NonPositiveOption { name: "num_components", value: 0.0 });
        }
        for (name, value) in [
            ("difficulty", difficulty),
            ("resample_thresh", resample_thresh),
            ("shift_thresh", shift_thresh),
            ("min_eff_sample_frac", min_eff_sample_frac),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ControlError::NonPositiveOption { name, value });
            }
        }
        if let Some(stack) = &initial_weights {
            for w in stack {
                if w.len() != ensemble_size {
                    return Err(ControlError::WeightLengthMismatch {
                        expected: ensemble_size,
                        actual: w.len(),
                    });
                }
            }
        }
        Ok(AdaptiveOptions {
            time_windows,
            ensemble_size,
            difficulty,
            num_components,
            resample_thresh,
            shift_thresh,
            min_eff_sample_frac,
            initial_weights,
        })
    }
}

/// Result of one adaptive run.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveRun {
    /// Window indices grouped by the sample set that solved them.
    pub groupings: Vec<Vec<usize>>,
    /// Accepted solves in window order.
    pub accepted: Vec<AcceptedEntry>,
    /// Windows skipped after exhausting both attempts.
    pub skipped: Vec<usize>,
    /// Every attempt in order.
    pub steps: Vec<AdaptiveStep>,
}

impl<F: ForwardModel> DynamicModel<F> {
    /// Run the adaptive controller over `opts.time_windows`.
    ///
    /// Per consecutive boundary pair: acquires the window, then attempts
    /// up to two solves with the fixed `num_components` configuration,
    /// routing each attempt through the accept / refine-retry / shift
    /// arms described in the module docs.
    ///
    /// Errors
    /// ------
    /// - `ControlError::FirstWindowIllPosed` when the first window routes
    ///   into the refine arm.
    /// - Dynamics and inversion hard failures propagate via the `From`
    ///   conversions on [`ControlError`].
    pub fn adaptive_online_iterative<B: SolverBuilder>(
        &mut self,
        builder: &B,
        opts: &AdaptiveOptions,
    ) -> ControlResult<AdaptiveRun> {
        let n_windows = opts.time_windows.len() - 1;
        info!(
            "adaptive run over {} windows, ensemble {}, thresholds {} / {}",
            n_windows, opts.ensemble_size, opts.resample_thresh, opts.shift_thresh
        );

        let (_, mut samples) =
            self.uniform_initial_samples(opts.difficulty, opts.ensemble_size)?;
        let mut weights: Vec<Array1<f64>> = opts.initial_weights.clone().unwrap_or_default();

        let config = SolveConfig {
            pca_components: (0..opts.num_components).collect(),
            mask_size: 0,
            splits: 1,
            exp_thresh: opts.shift_thresh,
        };

        let mut groupings: Vec<Vec<usize>> = Vec::new();
        let mut grouping: Vec<usize> = Vec::new();
        let mut accepted: Vec<AcceptedEntry> = Vec::new();
        let mut skipped: Vec<usize> = Vec::new();
        let mut steps: Vec<AdaptiveStep> = Vec::new();

        let mut last_accepted: Option<B::Solver> = None;
        let mut carried: Option<InitialConditions> = None;
        let mut restart = false;

        for i in 0..n_windows {
            grouping.push(i);
            let t0 = opts.time_windows[i];
            let t1 = opts.time_windows[i + 1];
            self.acquire(t1 - t0, None, Some(t0), true)?;
            let window_index = self.windows().len() - 1;
            let window = self.window(window_index)?;
            let measurements = window.observed_measurements();
            let n_readings = window.n_readings();
            let solve_config = SolveConfig { mask_size: n_readings, ..config.clone() };

            let prev_samples = samples.clone();
            let prev_weights = weights.clone();

            let mut tries = 0;
            let mut solution_found = false;
            while !solution_found && tries < 2 {
                let next_carried =
                    self.propagate(&samples, restart, window_index, carried.as_ref())?;
                carried = Some(next_carried);

                let ensemble = self.ensemble(window_index)?.predicted.clone();
                let net = if weights.is_empty() {
                    None
                } else {
                    Some(net_weights(&weights, opts.ensemble_size))
                };
                let mut solver = builder.build(
                    &ensemble,
                    &measurements,
                    self.state().measurement_noise,
                    &samples,
                    net.as_ref(),
                )?;

                let (deviation, outcome) = match solver.solve(&solve_config)? {
                    SolveStatus::Solved(outcome) => {
                        ((outcome.expected_ratio - 1.0).abs(), Some(outcome))
                    }
                    SolveStatus::IllPosed(reason) => {
                        warn!("window {}: ill-posed solve ({}); suspecting shift", i, reason);
                        (-1.0, None)
                    }
                    SolveStatus::NoSolution => {
                        warn!("window {}: no admissible update; suspecting shift", i);
                        (-1.0, None)
                    }
                };

                if deviation > opts.resample_thresh && deviation < opts.shift_thresh {
                    if i == 0 {
                        return Err(ControlError::FirstWindowIllPosed { deviation });
                    }
                    info!(
                        "window {}: deviation {:.4} in refine band; resampling from previous posterior",
                        i, deviation
                    );
                    let prev = last_accepted
                        .as_mut()
                        .ok_or(ControlError::FirstWindowIllPosed { deviation })?;
                    let posterior = prev.posterior().ok_or(InversionError::UnknownError)?;
                    samples = prev.sample_from(&posterior, opts.ensemble_size)?;
                    weights.clear();
                    tries += 1;
                    restart = true;
                    steps.push(AdaptiveStep {
                        window_index: i,
                        attempt: tries - 1,
                        decision: AdaptiveDecision::RefineRetry,
                        deviation,
                    });
                } else if deviation >= opts.shift_thresh || deviation < 0.0 {
                    info!(
                        "window {}: deviation {:.4} beyond shift threshold; redrawing uniform ensemble",
                        i, deviation
                    );
                    let (_, redraw) =
                        self.uniform_initial_samples(opts.difficulty, opts.ensemble_size)?;
                    samples = redraw;
                    weights.clear();
                    tries += 1;
                    restart = true;
                    steps.push(AdaptiveStep {
                        window_index: i,
                        attempt: tries - 1,
                        decision: AdaptiveDecision::Shifted,
                        deviation,
                    });
                } else {
                    let outcome = outcome.ok_or(InversionError::UnknownError)?;
                    info!(
                        "window {} accepted: deviation {:.4}, kl {:.4}",
                        i, deviation, outcome.kl_divergence
                    );
                    self.mark_best(window_index, outcome.mud_index)?;
                    weights.push(outcome.weight_ratios.clone());
                    let net = net_weights(&weights, opts.ensemble_size);
                    let ess = effective_sample_size(&net);
                    if (ess as f64) / (opts.ensemble_size as f64) < opts.min_eff_sample_frac {
                        info!(
                            "window {}: effective sample size {} below floor; resampling fresh",
                            i, ess
                        );
                        let posterior =
                            solver.posterior().ok_or(InversionError::UnknownError)?;
                        samples = solver.sample_from(&posterior, opts.ensemble_size)?;
                        weights.clear();
                        restart = true;
                        groupings.push(std::mem::take(&mut grouping));
                    } else if tries > 0 {
                        // An accepted retry means the sample set changed.
                        groupings.push(std::mem::take(&mut grouping));
                        restart = false;
                    } else {
                        restart = false;
                    }
                    steps.push(AdaptiveStep {
                        window_index: i,
                        attempt: tries,
                        decision: AdaptiveDecision::Accepted,
                        deviation,
                    });
                    accepted.push(AcceptedEntry { window_index, outcome: Some(outcome) });
                    last_accepted = Some(solver);
                    solution_found = true;
                }
            }

            if !solution_found {
                info!("window {}: both attempts failed; rolling back and skipping", i);
                samples = prev_samples;
                weights = prev_weights;
                restart = false;
                skipped.push(i);
            }
        }

        if !grouping.is_empty() {
            groupings.push(grouping);
        }
        Ok(AdaptiveRun { groupings, accepted, skipped, steps })
    }
}
