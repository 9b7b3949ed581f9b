//! Dynamics layer: validated system state, windowed data acquisition, and
//! ensemble forward propagation.
//!
//! Purpose
//! -------
//! Own everything that touches the reference trajectory and the candidate
//! ensembles: the ground-truth [`SystemState`] with its shift schedule, the
//! acquisition of noisy [`DataWindow`]s at a fixed observation cadence, and
//! the propagation of parameter draws through a caller-supplied
//! [`ForwardModel`] into [`SampleEnsemble`]s aligned with those windows.
//!
//! Key behaviors
//! -------------
//! - [`DynamicModel::acquire`] produces one window of reference data,
//!   splitting the dense grid at true-parameter shift boundaries and
//!   chaining terminal states across segments.
//! - [`DynamicModel::propagate`] pushes an ensemble through the forward
//!   model against an acquired window, carrying per-sample terminal states
//!   forward as explicit [`InitialConditions`].
//!
//! Conventions
//! -----------
//! - Windows and ensembles are addressed by 0-based window index; the two
//!   lists grow in lockstep during normal iteration.
//! - All randomness flows through the model-owned seeded RNG.

pub mod core;
pub mod errors;
pub mod forward;
pub mod model;

pub use self::core::ensemble::{InitialConditions, SampleEnsemble};
pub use self::core::options::DynamicsOptions;
pub use self::core::state::{ParamShift, SystemState};
pub use self::core::window::DataWindow;
pub use errors::{DynamicsError, DynamicsResult};
pub use forward::ForwardModel;
pub use model::DynamicModel;
