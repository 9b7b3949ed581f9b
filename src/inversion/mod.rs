//! Inversion layer: the opaque solver contract and the combinatorial
//! hyperparameter search that ranks its solves.
//!
//! Purpose
//! -------
//! Keep the posterior mathematics behind the [`Solver`] /
//! [`SolverBuilder`] traits while this crate owns configuration
//! enumeration, skip handling, and best-candidate selection. The
//! controllers in [`crate::control`] consume only [`SearchOutcome`]s and
//! the diagnostics a [`SolveOutcome`] carries.

pub mod errors;
pub mod search;
pub mod solver;

pub use errors::{InversionError, InversionResult};
pub use search::{
    enumerate_configurations, search, BestMethod, SearchOptions, SearchOutcome, SearchRecord,
    SearchSpace,
};
pub use solver::{SolveConfig, SolveOutcome, SolveStatus, Solver, SolverBuilder};
