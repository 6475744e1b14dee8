//! hawkes — multivariate Hawkes processes with optional mark states.
//!
//! - [`core`]: validated event data, kernels, mark tables, and the
//!   precomputed per-realization statistics shared by the models.
//! - [`simulation`]: Ogata thinning with custom mark multipliers.
//! - [`models`]: fixed-decay log-likelihood and least-squares contrasts.
//! - [`errors`]: the unified [`errors::HawkesError`].
pub mod core;
pub mod errors;
pub mod models;
pub mod simulation;

pub mod prelude {
    pub use super::core::{
        EndTimes, HawkesData, HawkesKernel, KernelMatrix, MarkDynamics, MarkTable, ModelOptions,
        ParamLayout, Realization, SimOpts, rescale_by_first_mark,
    };
    pub use super::errors::{HawkesError, HawkesResult};
    pub use super::models::prelude::*;
    pub use super::simulation::{HawkesSimulation, IntensityTrace, SimulationResult};
}
