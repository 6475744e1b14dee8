//! Simulation output containers.
use ndarray::Array1;

use crate::hawkes::{
    core::data::{EndTimes, HawkesData, Realization},
    errors::HawkesResult,
};

/// Intensities sampled on a regular grid.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityTrace {
    /// Grid `0, dt, 2dt, … ≤ end_time`.
    pub times: Array1<f64>,
    /// `values[i][k]`: intensity of node `i` at `times[k]`.
    pub values: Vec<Array1<f64>>,
}

/// One simulated realization with its mark path.
///
/// `global_n[0]` is the state before the first event and `global_n[k]` the
/// state right after the `k`-th event, so `global_n.len() == n_jumps() + 1`.
/// `quantities` follows the same indexing when the mark dynamics track a
/// queue quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub realization: Realization,
    pub global_n: Vec<usize>,
    pub quantities: Option<Vec<f64>>,
    pub intensity: Option<IntensityTrace>,
    pub end_time: f64,
    pub n_states: usize,
}

impl SimulationResult {
    pub fn timestamps(&self) -> &[Array1<f64>] {
        self.realization.timestamps()
    }

    pub fn n_nodes(&self) -> usize {
        self.realization.n_nodes()
    }

    /// Total number of accepted events.
    pub fn n_jumps(&self) -> usize {
        self.realization.n_events()
    }

    /// Hand the realization and its marks to the models, with the simulation
    /// horizon as end time.
    pub fn into_data(self) -> HawkesResult<HawkesData> {
        HawkesData::with_marks(
            vec![self.realization.timestamps().to_vec()],
            vec![self.global_n],
            self.n_states,
            EndTimes::Scalar(self.end_time),
        )
    }
}
