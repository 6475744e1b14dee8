//! simulation — Ogata thinning for marked multivariate Hawkes processes.
//!
//! [`HawkesSimulation`] is configured with a [`KernelMatrix`], baselines,
//! [`SimOpts`] and optionally a [`MarkTable`] with [`MarkDynamics`];
//! [`HawkesSimulation::simulate`] returns a [`SimulationResult`] whose
//! `into_data` feeds the models directly.
//!
//! [`KernelMatrix`]: crate::hawkes::core::KernelMatrix
//! [`SimOpts`]: crate::hawkes::core::SimOpts
//! [`MarkTable`]: crate::hawkes::core::MarkTable
//! [`MarkDynamics`]: crate::hawkes::core::MarkDynamics
pub mod result;
pub mod simulator;

pub use self::result::{IntensityTrace, SimulationResult};
pub use self::simulator::HawkesSimulation;
