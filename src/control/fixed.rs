//! Fixed-cadence online controller.
//!
//! Purpose
//! -------
//! Consume equal-length data windows one per completed iteration. Each
//! pass propagates the current ensemble against the window, runs the full
//! combinatorial configuration search, and resolves to one of three
//! decisions: ACCEPT (a threshold-respecting best solve exists), SHIFT
//! (no best and the mean KL divergence over the attempted solves exceeds
//! the shift threshold, or no solve succeeded at all), or SKIP (no best
//! but KL is unremarkable).
//!
//! Key behaviors
//! -------------
//! - A SHIFT redraws the ensemble from the difficulty-scaled uniform box
//!   and retries the same window; it does not advance the iteration
//!   counter, so termination is bounded by the mandatory `max_attempts`
//!   pass budget instead.
//! - A SKIP advances past the window with a placeholder entry; an ACCEPT
//!   marks the solve's MUD row on the ensemble and resamples from the
//!   winning posterior.
//! - Every pass keeps its search's successful-solve records on its
//!   [`FixedStep`], so best-less diagnostics survive shift and skip
//!   passes.
//!
//! Invariants & assumptions
//! ------------------------
//! - The run makes at most `max_attempts` passes; `exhausted` reports
//!   whether the pass budget ran out before `iterations` windows were
//!   consumed.
//!
//! Testing notes
//! -------------
//! - The integration tests drive this loop with a scripted solver so the
//!   shift and exhaustion branches are reachable deterministically.

use crate::control::errors::{ControlError, ControlResult};
use crate::control::AcceptedEntry;
use crate::dynamics::{DynamicModel, ForwardModel};
use crate::inversion::{
    enumerate_configurations, search, InversionError, SearchOptions, SearchRecord, SearchSpace,
    Solver, SolverBuilder,
};
use log::info;

/// Per-pass resolution of the fixed-cadence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A best solve was found and the iteration advanced.
    Accepted,
    /// A parameter shift was suspected; the ensemble was redrawn and the
    /// window will be retried.
    Shifted,
    /// No best solve, no shift evidence; the window was consumed with a
    /// placeholder.
    Skipped,
}

/// One pass of the fixed-cadence loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStep {
    /// 1-based pass number.
    pub pass: usize,
    /// Window the pass worked on.
    pub window_index: usize,
    /// Resolution of the pass.
    pub decision: Decision,
    /// Mean KL divergence over the pass's successful solves, if any.
    pub mean_kl: Option<f64>,
    /// Successful-solve records of the pass's search, kept even when the
    /// pass resolved without a best (shift and skip passes).
    pub records: Vec<SearchRecord>,
}

/// Validated options of the fixed-cadence controller.
///
/// Fields
/// ------
/// - `iterations`: windows to consume; > 0.
/// - `max_attempts`: hard pass budget; >= `iterations`. Required because
///   shift passes do not advance the iteration counter.
/// - `ensemble_size`: draws per ensemble; > 0.
/// - `window_length`: time span acquired per window; finite and > 0.
/// - `difficulty`: scale of the uniform box the run initializes (and
///   shift passes reset) to; finite and > 0.
/// - `kl_shift_thresh`: mean-KL level above which a best-less search is
///   treated as a shift; finite and > 0.
/// - `search_space`, `search`: configuration enumeration bounds and
///   best-selection options.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedOptions {
    /// Windows to consume.
    pub iterations: usize,
    /// Hard pass budget.
    pub max_attempts: usize,
    /// Draws per ensemble.
    pub ensemble_size: usize,
    /// Time span per window.
    pub window_length: f64,
    /// Uniform-box scale.
    pub difficulty: f64,
    /// Mean-KL shift threshold.
    pub kl_shift_thresh: f64,
    /// Configuration enumeration bounds.
    pub search_space: SearchSpace,
    /// Search options.
    pub search: SearchOptions,
}

impl FixedOptions {
    /// Construct validated options.
    ///
    /// Errors
    /// ------
    /// - `ControlError::NonPositiveOption` for a degenerate count, span,
    ///   scale, or threshold.
    /// - `ControlError::AttemptBudgetTooSmall` when
    ///   `max_attempts < iterations`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        iterations: usize,
        max_attempts: usize,
        ensemble_size: usize,
        window_length: f64,
        difficulty: f64,
        kl_shift_thresh: f64,
        search_space: SearchSpace,
        search: SearchOptions,
    ) -> ControlResult<Self> {
        if iterations == 0 {
            return Err(ControlError::NonPositiveOption { name: "iterations", value: 0.0 });
        }
        if ensemble_size == 0 {
            return Err(ControlError::NonPositiveOption { name: "ensemble_size", value: 0.0 });
        }
        if !window_length.is_finite() || window_length <= 0.0 {
            return Err(ControlError::NonPositiveOption {
                name: "window_length",
                value: window_length,
            });
        }
        if !difficulty.is_finite() || difficulty <= 0.0 {
            return Err(ControlError::NonPositiveOption { name: "difficulty", value: difficulty });
        }
        if !kl_shift_thresh.is_finite() || kl_shift_thresh <= 0.0 {
            return Err(ControlError::NonPositiveOption {
                name: "kl_shift_thresh",
                value: kl_shift_thresh,
            });
        }
        if max_attempts < iterations {
            return Err(ControlError::AttemptBudgetTooSmall { max_attempts, iterations });
        }
        Ok(FixedOptions {
            iterations,
            max_attempts,
            ensemble_size,
            window_length,
            difficulty,
            kl_shift_thresh,
            search_space,
            search,
        })
    }
}

/// Result of one fixed-cadence run.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRun {
    /// Every pass in order.
    pub steps: Vec<FixedStep>,
    /// Consumed windows (accepted solves and skip placeholders).
    pub accepted: Vec<AcceptedEntry>,
    /// True when the pass budget ran out before `iterations` windows were
    /// consumed.
    pub exhausted: bool,
}

impl<F: ForwardModel> DynamicModel<F> {
    /// Run the fixed-cadence controller.
    ///
    /// Initializes the ensemble from the difficulty-scaled uniform box,
    /// then per pass: acquires the pass's window if it is not already
    /// present, propagates with regenerated initial conditions, enumerates
    /// and searches the configuration space, and applies the
    /// accept / shift / skip decision described in the module docs.
    ///
    /// Errors
    /// ------
    /// - Dynamics and inversion hard failures propagate via the `From`
    ///   conversions on [`ControlError`].
    pub fn online_iterative<B: SolverBuilder>(
        &mut self,
        builder: &B,
        opts: &FixedOptions,
    ) -> ControlResult<FixedRun> {
        info!(
            "fixed-cadence run: {} iterations (budget {}), ensemble {}, difficulty {}",
            opts.iterations, opts.max_attempts, opts.ensemble_size, opts.difficulty
        );
        let (_, mut samples) =
            self.uniform_initial_samples(opts.difficulty, opts.ensemble_size)?;

        let mut steps = Vec::new();
        let mut accepted: Vec<AcceptedEntry> = Vec::new();
        let mut passes = 0;
        while accepted.len() < opts.iterations && passes < opts.max_attempts {
            passes += 1;
            let window_index = accepted.len();
            if window_index >= self.windows().len() {
                self.acquire(opts.window_length, None, None, true)?;
            }
            self.propagate(&samples, true, window_index, None)?;

            let window = self.window(window_index)?;
            let measurements = window.observed_measurements();
            let n_readings = window.n_readings();
            let configs = enumerate_configurations(
                &opts.search_space,
                n_readings,
                opts.ensemble_size,
                self.state().n_params(),
            )?;
            let ensemble = self.ensemble(window_index)?.predicted.clone();
            let mut outcome = search(
                builder,
                &ensemble,
                &measurements,
                self.state().measurement_noise,
                &samples,
                None,
                &configs,
                &opts.search,
            )?;

            let (decision, mean_kl) = match outcome.best {
                Some(best) => {
                    let record = outcome.records[best].clone();
                    self.mark_best(window_index, record.outcome.mud_index)?;
                    let mut solver = outcome.solvers.swap_remove(best);
                    let posterior =
                        solver.posterior().ok_or(InversionError::UnknownError)?;
                    samples = solver.sample_from(&posterior, opts.ensemble_size)?;
                    info!(
                        "window {} accepted: e_r = {:.4}, kl = {:.4}",
                        window_index, record.outcome.expected_ratio, record.outcome.kl_divergence
                    );
                    accepted.push(AcceptedEntry {
                        window_index,
                        outcome: Some(record.outcome),
                    });
                    (Decision::Accepted, None)
                }
                None => {
                    let mean_kl = outcome.mean_kl();
                    let shift = match mean_kl {
                        Some(kl) => kl > opts.kl_shift_thresh,
                        None => true,
                    };
                    if shift {
                        info!(
                            "window {}: suspected parameter shift (mean kl {:?}); redrawing ensemble",
                            window_index, mean_kl
                        );
                        let (_, redraw) =
                            self.uniform_initial_samples(opts.difficulty, opts.ensemble_size)?;
                        samples = redraw;
                        (Decision::Shifted, mean_kl)
                    } else {
                        info!(
                            "window {}: no best solve, mean kl {:?} unremarkable; skipping",
                            window_index, mean_kl
                        );
                        accepted.push(AcceptedEntry { window_index, outcome: None });
                        (Decision::Skipped, mean_kl)
                    }
                }
            };
            steps.push(FixedStep {
                pass: passes,
                window_index,
                decision,
                mean_kl,
                records: outcome.records,
            });
        }

        let exhausted = accepted.len() < opts.iterations;
        if exhausted {
            info!(
                "fixed-cadence run exhausted its {} passes with {} of {} windows consumed",
                opts.max_attempts,
                accepted.len(),
                opts.iterations
            );
        }
        Ok(FixedRun { steps, accepted, exhausted })
    }
}
