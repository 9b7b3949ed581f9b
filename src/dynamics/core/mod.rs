//! Core data types of the dynamics layer: validated system state, options,
//! acquired windows, and propagated ensembles.

pub mod ensemble;
pub mod options;
pub mod state;
pub mod window;
