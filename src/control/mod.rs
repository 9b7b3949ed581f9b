//! Online controllers driving the acquire / propagate / invert cycle.
//!
//! Purpose
//! -------
//! Implement the two iteration strategies over a
//! [`crate::dynamics::DynamicModel`] and an opaque
//! [`crate::inversion::SolverBuilder`]: a fixed-cadence loop with
//! combinatorial configuration search and KL-based shift detection
//! ([`fixed`]), and an adaptive loop with bounded retries,
//! importance-weight accumulation, and effective-sample-size monitoring
//! ([`adaptive`]).
//!
//! Conventions
//! -----------
//! - Every pass of either controller is recorded in a step log; accepted
//!   windows (and fixed-cadence skip placeholders) land in an
//!   [`AcceptedEntry`] sequence in window order.

pub mod adaptive;
pub mod errors;
pub mod fixed;

pub use errors::{ControlError, ControlResult};

use crate::inversion::SolveOutcome;

/// One advanced window of a controller run.
///
/// `outcome` is `None` for a fixed-cadence skip placeholder: the window
/// was consumed without a threshold-respecting solve.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedEntry {
    /// Window the entry covers.
    pub window_index: usize,
    /// Diagnostics of the accepted solve, or `None` for a skip; the
    /// skipped pass's search records stay on its fixed-cadence step.
    pub outcome: Option<SolveOutcome>,
}
