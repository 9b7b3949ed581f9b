//! Combinatorial hyperparameter search over solver configurations.
//!
//! Purpose
//! -------
//! Enumerate the admissible solve configurations for one window of data
//! and evaluate each against a freshly built solver, ranking successful
//! solves by how consistent their update is (expected ratio near 1) and
//! by KL divergence. The winner, when one exists, drives the controllers'
//! accept path.
//!
//! Key behaviors
//! -------------
//! - [`enumerate_configurations`] crosses the component, mask-size, and
//!   split ranges, keeping only combinations where the masked readings
//!   fill every split's chunk (`mask_size / (splits * chunk) >= 1`).
//! - [`search`] builds one solver per configuration; ill-posed and
//!   no-solution statuses are logged and skipped, hard failures
//!   propagate. Each successful solve's per-sub-solve table is retained
//!   on its record. Derived flags (`closest`, `min_kl`, `max_kl`) are
//!   computed only over threshold-respecting rows, and ties resolve by
//!   enumeration order.
//!
//! Invariants & assumptions
//! ------------------------
//! - A selected best row always has `within_thresh` set.
//! - An empty configuration list or zero successful solves yields a
//!   no-best [`SearchOutcome`], never an error.
//!
//! Testing notes
//! -------------
//! - Unit tests drive [`search`] with a scripted stub solver so every
//!   branch (skip, tie, no-best) is reachable deterministically.

use crate::inversion::errors::{InversionError, InversionResult};
use crate::inversion::solver::{SolveConfig, SolveOutcome, SolveStatus, Solver, SolverBuilder};
use log::{debug, warn};
use ndarray::{Array1, Array2};
use std::str::FromStr;

/// Criterion selecting the best row among threshold-respecting solves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestMethod {
    /// Smallest deviation of the expected ratio from 1.
    Closest,
    /// Smallest KL divergence.
    MinKl,
    /// Largest KL divergence.
    MaxKl,
}

impl FromStr for BestMethod {
    type Err = InversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "closest" => Ok(BestMethod::Closest),
            "min_kl" => Ok(BestMethod::MinKl),
            "max_kl" => Ok(BestMethod::MaxKl),
            other => Err(InversionError::UnknownBestMethod { method: other.to_string() }),
        }
    }
}

/// Bounds of the configuration enumeration.
///
/// Fields
/// ------
/// - `exp_thresh`: expected-ratio threshold stamped on every
///   configuration; finite and > 0.
/// - `max_components`: cap on retained data-reduction components; further
///   capped by the ensemble's order of magnitude.
/// - `chunk_size`: reading-chunk granularity; `None` defaults to
///   `min(n_params, n_readings)`.
/// - `use_all_data`: when true, the only mask size is the full reading
///   count.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSpace {
    /// Expected-ratio threshold for every configuration.
    pub exp_thresh: f64,
    /// Cap on retained components.
    pub max_components: usize,
    /// Reading-chunk granularity; `None` for the default.
    pub chunk_size: Option<usize>,
    /// Mask in the full reading count only.
    pub use_all_data: bool,
}

fn order_of_magnitude(n: usize) -> usize {
    (n as f64).log10() as usize + 1
}

/// Enumerate the admissible solve configurations for one window.
///
/// Parameters
/// ----------
/// - `space`: enumeration bounds.
/// - `n_readings`: scalar readings the window contributes.
/// - `ensemble_size`: rows in the ensemble; caps the component range at
///   its order of magnitude.
/// - `n_params`: parameter dimension; feeds the default chunk size.
///
/// Returns configurations in deterministic enumeration order (components
/// outermost, then mask size, then splits). An oversized chunk yields an
/// empty list.
///
/// Errors
/// ------
/// - `InversionError::NonPositiveThreshold` for a degenerate
///   `exp_thresh`.
/// - `InversionError::NonPositiveChunkSize` for an explicit zero chunk.
/// - `InversionError::EmptyMeasurements` when `n_readings == 0`.
pub fn enumerate_configurations(
    space: &SearchSpace,
    n_readings: usize,
    ensemble_size: usize,
    n_params: usize,
) -> InversionResult<Vec<SolveConfig>> {
    if !space.exp_thresh.is_finite() || space.exp_thresh <= 0.0 {
        return Err(InversionError::NonPositiveThreshold { value: space.exp_thresh });
    }
    if n_readings == 0 {
        return Err(InversionError::EmptyMeasurements);
    }
    let chunk = match space.chunk_size {
        Some(0) => return Err(InversionError::NonPositiveChunkSize { value: 0 }),
        Some(c) => c,
        None => n_params.min(n_readings),
    };

    let max_nc = order_of_magnitude(ensemble_size.max(1))
        .min(space.max_components)
        .min(chunk);
    let mask_sizes: Vec<usize> = if space.use_all_data {
        vec![n_readings]
    } else {
        (chunk..=n_readings).step_by(chunk).collect()
    };
    let max_splits = n_readings / chunk;

    let mut configs = Vec::new();
    for nc in 1..=max_nc {
        for &mask_size in &mask_sizes {
            for splits in 1..=max_splits {
                // Every split must be fillable from the masked readings.
                if (mask_size as f64) / ((splits * chunk) as f64) >= 1.0 {
                    configs.push(SolveConfig {
                        pca_components: (0..nc).collect(),
                        mask_size,
                        splits,
                        exp_thresh: space.exp_thresh,
                    });
                }
            }
        }
    }
    debug!(
        "enumerated {} configurations (chunk {}, {} readings, component cap {})",
        configs.len(),
        chunk,
        n_readings,
        max_nc
    );
    Ok(configs)
}

/// Options of one search pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Expected-ratio threshold gating the derived flags; finite and > 0.
    pub exp_thresh: f64,
    /// Criterion selecting the best row.
    pub best_method: BestMethod,
}

impl SearchOptions {
    /// Construct validated search options.
    ///
    /// Errors
    /// ------
    /// - `InversionError::NonPositiveThreshold` for a degenerate
    ///   `exp_thresh`.
    pub fn new(exp_thresh: f64, best_method: BestMethod) -> InversionResult<Self> {
        if !exp_thresh.is_finite() || exp_thresh <= 0.0 {
            return Err(InversionError::NonPositiveThreshold { value: exp_thresh });
        }
        Ok(SearchOptions { exp_thresh, best_method })
    }
}

/// One successful solve within a search, with its derived ranking flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    /// Enumeration index of the configuration.
    pub index: usize,
    /// The configuration that was solved.
    pub config: SolveConfig,
    /// Diagnostics of the solve.
    pub outcome: SolveOutcome,
    /// Per-sub-solve diagnostics of the split sequence behind `outcome`.
    pub sub_solves: Vec<SolveOutcome>,
    /// `|expected_ratio - 1|`.
    pub predict_delta: f64,
    /// `predict_delta <= exp_thresh`.
    pub within_thresh: bool,
    /// Smallest `predict_delta` among threshold-respecting rows.
    pub closest: bool,
    /// Smallest KL among threshold-respecting rows.
    pub min_kl: bool,
    /// Largest KL among threshold-respecting rows.
    pub max_kl: bool,
}

/// Result of one search pass.
///
/// `records` and `solvers` are aligned: `solvers[i]` produced
/// `records[i]`. `best` indexes into `records` (and `solvers`) when a
/// threshold-respecting row exists under the requested method.
#[derive(Debug)]
pub struct SearchOutcome<S: Solver> {
    /// Successful solves in enumeration order.
    pub records: Vec<SearchRecord>,
    /// The solvers behind each record.
    pub solvers: Vec<S>,
    /// Index of the selected best record, if any.
    pub best: Option<usize>,
}

impl<S: Solver> SearchOutcome<S> {
    /// Mean KL divergence over the successful solves, if any.
    pub fn mean_kl(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        let sum: f64 = self.records.iter().map(|r| r.outcome.kl_divergence).sum();
        Some(sum / self.records.len() as f64)
    }
}

/// Evaluate `configs` against freshly built solvers and select a best row.
///
/// Parameters
/// ----------
/// - `builder`: factory for per-configuration solvers.
/// - `ensemble`: predicted readings, one ensemble row per draw.
/// - `measurements`: the window's non-missing readings.
/// - `noise`: measurement-noise level.
/// - `prior`: prior parameter table the solvers update from.
/// - `weights`: accumulated importance weights, `None` for uniform.
/// - `configs`: configurations in enumeration order.
/// - `opts`: threshold and best-method criterion.
///
/// Errors
/// ------
/// - `InversionError::EmptyMeasurements` for an empty reading vector.
/// - `InversionError::WeightLengthMismatch` when `weights` does not have
///   one entry per ensemble row.
/// - Builder and solver hard failures propagate unchanged; ill-posed and
///   no-solution statuses are logged and skipped.
#[allow(clippy::too_many_arguments)]
pub fn search<B: SolverBuilder>(
    builder: &B,
    ensemble: &Array2<f64>,
    measurements: &Array1<f64>,
    noise: f64,
    prior: &Array2<f64>,
    weights: Option<&Array1<f64>>,
    configs: &[SolveConfig],
    opts: &SearchOptions,
) -> InversionResult<SearchOutcome<B::Solver>> {
    if measurements.is_empty() {
        return Err(InversionError::EmptyMeasurements);
    }
    if let Some(w) = weights {
        if w.len() != ensemble.nrows() {
            return Err(InversionError::WeightLengthMismatch {
                expected: ensemble.nrows(),
                actual: w.len(),
            });
        }
    }

    let mut records = Vec::new();
    let mut solvers = Vec::new();
    for (index, config) in configs.iter().enumerate() {
        let mut solver = builder.build(ensemble, measurements, noise, prior, weights)?;
        match solver.solve(config)? {
            SolveStatus::Solved(outcome) => {
                let predict_delta = (outcome.expected_ratio - 1.0).abs();
                let sub_solves = solver.solve_iterative(config)?;
                records.push(SearchRecord {
                    index,
                    config: config.clone(),
                    outcome,
                    sub_solves,
                    predict_delta,
                    within_thresh: predict_delta <= opts.exp_thresh,
                    closest: false,
                    min_kl: false,
                    max_kl: false,
                });
                solvers.push(solver);
            }
            SolveStatus::IllPosed(reason) => {
                warn!("configuration {} skipped: ill-posed problem: {}", index, reason);
            }
            SolveStatus::NoSolution => {
                warn!("configuration {} skipped: no solution within threshold", index);
            }
        }
    }

    // Derived flags are relative to the threshold-respecting subset.
    let eligible: Vec<usize> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.within_thresh.then_some(i))
        .collect();
    if !eligible.is_empty() {
        let min_delta = eligible
            .iter()
            .map(|&i| records[i].predict_delta)
            .fold(f64::INFINITY, f64::min);
        let min_kl = eligible
            .iter()
            .map(|&i| records[i].outcome.kl_divergence)
            .fold(f64::INFINITY, f64::min);
        let max_kl = eligible
            .iter()
            .map(|&i| records[i].outcome.kl_divergence)
            .fold(f64::NEG_INFINITY, f64::max);
        for &i in &eligible {
            records[i].closest = records[i].predict_delta <= min_delta;
            records[i].min_kl = records[i].outcome.kl_divergence <= min_kl;
            records[i].max_kl = records[i].outcome.kl_divergence >= max_kl;
        }
    }

    let best = records.iter().position(|r| match opts.best_method {
        BestMethod::Closest => r.closest,
        BestMethod::MinKl => r.min_kl,
        BestMethod::MaxKl => r.max_kl,
    });
    debug!(
        "search evaluated {} configurations, {} solved, best = {:?}",
        configs.len(),
        records.len(),
        best
    );
    Ok(SearchOutcome { records, solvers, best })
}
