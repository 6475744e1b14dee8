//! Thinning simulator for multivariate Hawkes processes with mark states.
//!
//! Purpose
//! -------
//! Draw one realization of a Hawkes process whose intensities are
//!
//! ```text
//! λ_i(t) = f_i[state(t)] · (μ_i + Σ_j Σ_{t_k^j < t} φ_ij(t − t_k^j))
//! ```
//!
//! together with the path of the global mark state.
//!
//! Key behaviors
//! -------------
//! - Ogata thinning. Between accepted events every excitation is monotone
//!   towards zero, so `Σ_i f_i[state] · (μ_i + positive contributions)`
//!   evaluated at the last event bounds the total intensity until the next
//!   one. Candidates are spaced by `Exp(1) / bound` and accepted with
//!   probability `λ(t) / bound`.
//! - On acceptance the firing node is drawn proportionally to its intensity,
//!   the excitation states jump, and the mark process moves to its next state.
//! - The simulation stops at the first candidate beyond `end_time`, when
//!   `max_jumps` events have been accepted, or when the bound drops to zero.
//!
//! Invariants & assumptions
//! ------------------------
//! - The output is a pure function of the configuration and `SimOpts::seed`.
//! - Timestamps are strictly increasing per node and lie in `[0, end_time]`.
//! - A negative total intensity on some node is a
//!   [`HawkesError::NegativeIntensity`] error, never silently clamped.
//! - Networks whose mark-scaled branching ratio is `≥ 1` are refused with
//!   [`HawkesError::Explosive`] unless `force_simulation` is set or
//!   `max_jumps` bounds the output.
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use statrs::distribution::Exp;

use crate::hawkes::{
    core::{
        data::Realization,
        kernel_matrix::KernelMatrix,
        kernels::ExcitationState,
        marks::{MarkDynamics, MarkProcess, MarkTable},
        options::SimOpts,
        validation::validate_baselines,
    },
    errors::{HawkesError, HawkesResult},
    simulation::result::{IntensityTrace, SimulationResult},
};

/// Configured Hawkes simulator.
///
/// Built with [`HawkesSimulation::new`] for a plain process, then optionally
/// given a mark table and dynamics with [`HawkesSimulation::with_marks`].
#[derive(Debug, Clone, PartialEq)]
pub struct HawkesSimulation {
    kernels: KernelMatrix,
    baselines: Array1<f64>,
    marks: MarkTable,
    dynamics: MarkDynamics,
    opts: SimOpts,
}

impl HawkesSimulation {
    /// # Errors
    /// - [`HawkesError::BaselineLengthMismatch`] / [`HawkesError::InvalidBaseline`]
    ///   if `baselines` does not hold one finite, non-negative value per node.
    pub fn new(kernels: KernelMatrix, baselines: Array1<f64>, opts: SimOpts) -> HawkesResult<Self> {
        validate_baselines(&baselines, kernels.n_nodes())?;
        let marks = MarkTable::neutral(kernels.n_nodes());
        Ok(Self { kernels, baselines, marks, dynamics: MarkDynamics::Uniform, opts })
    }

    /// Attach mark factors `f_i` and the state transition rule.
    ///
    /// # Errors
    /// - [`HawkesError::MarkTableShape`] if the table does not have one row
    ///   per node.
    /// - Errors from [`MarkDynamics::validate`].
    pub fn with_marks(mut self, marks: MarkTable, dynamics: MarkDynamics) -> HawkesResult<Self> {
        let n = self.kernels.n_nodes();
        if marks.n_nodes() != n {
            return Err(HawkesError::MarkTableShape {
                expected: (n, marks.n_states()),
                found: marks.factors().dim(),
            });
        }
        dynamics.validate(n, marks.n_states())?;
        self.marks = marks;
        self.dynamics = dynamics;
        Ok(self)
    }

    pub fn n_nodes(&self) -> usize {
        self.kernels.n_nodes()
    }

    pub fn opts(&self) -> &SimOpts {
        &self.opts
    }

    /// Replace the seed, keeping everything else.
    pub fn set_seed(&mut self, seed: u64) {
        self.opts.seed = seed;
    }

    /// Spectral radius of `diag(max_q f_i[q]) · ‖φ_ij‖₁`.
    pub fn spectral_radius(&self) -> f64 {
        self.kernels.spectral_radius(Some(&self.marks.max_factors()))
    }

    /// Run the thinning algorithm.
    ///
    /// # Errors
    /// - [`HawkesError::Explosive`] for an unbounded explosive configuration.
    /// - [`HawkesError::NegativeIntensity`] if some node's intensity drops
    ///   below zero at a candidate time.
    pub fn simulate(&self) -> HawkesResult<SimulationResult> {
        if !self.opts.force_simulation && self.opts.max_jumps.is_none() {
            let rho = self.spectral_radius();
            if rho >= 1.0 {
                return Err(HawkesError::Explosive { spectral_radius: rho });
            }
        }

        let n = self.n_nodes();
        let end_time = self.opts.end_time;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.opts.seed);
        let waiting = Exp::new(1.0)?;

        let mut excitations: Vec<ExcitationState> = (0..n * n)
            .map(|idx| ExcitationState::new(self.kernels.get(idx / n, idx % n)))
            .collect();
        let mut history: Vec<Vec<f64>> = vec![Vec::new(); n];
        let mut process = MarkProcess::new(&self.dynamics, self.marks.n_states());
        let mut global_n = vec![process.state()];
        let mut quantities = process.quantity().map(|q| vec![q]);
        let mut tracker = self.opts.track_intensity.map(|dt| Tracker::new(dt, end_time, n));

        let mut t = 0.0;
        let mut n_jumps = 0usize;
        loop {
            if self.opts.max_jumps.is_some_and(|m| n_jumps >= m) {
                break;
            }
            let state = process.state();
            let bound = self.envelope(t, state, &excitations, &history);
            if bound <= 0.0 || !bound.is_finite() {
                break;
            }
            let draw: f64 = rng.sample(&waiting);
            let candidate = t + draw / bound;
            if let Some(tr) = tracker.as_mut() {
                tr.record_until(candidate.min(end_time), |s| {
                    self.intensities(s, state, &excitations, &history)
                });
            }
            if candidate > end_time {
                break;
            }
            t = candidate;

            let intensities = self.intensities(t, state, &excitations, &history);
            if let Some((node, &value)) = intensities.iter().enumerate().find(|(_, v)| **v < 0.0) {
                return Err(HawkesError::NegativeIntensity { node, time: t, value });
            }
            let total: f64 = intensities.iter().sum();
            let u = rng.gen::<f64>() * bound;
            if u >= total {
                continue;
            }

            let node = pick_node(&intensities, u);
            history[node].push(t);
            for i in 0..n {
                excitations[i * n + node].jump(t);
            }
            global_n.push(process.transition(node, &mut rng));
            if let (Some(qs), Some(q)) = (quantities.as_mut(), process.quantity()) {
                qs.push(q);
            }
            n_jumps += 1;
        }
        if let Some(tr) = tracker.as_mut() {
            let state = process.state();
            tr.record_until(end_time, |s| self.intensities(s, state, &excitations, &history));
        }

        let timestamps = history.into_iter().map(Array1::from).collect();
        Ok(SimulationResult {
            realization: Realization::from_sorted(timestamps),
            global_n,
            quantities,
            intensity: tracker.map(Tracker::finish),
            end_time,
            n_states: self.marks.n_states(),
        })
    }

    fn envelope(
        &self, t: f64, state: usize, excitations: &[ExcitationState], history: &[Vec<f64>],
    ) -> f64 {
        let n = self.n_nodes();
        (0..n)
            .map(|i| {
                let excitation: f64 = (0..n)
                    .map(|j| excitations[i * n + j].positive_bound_at(t, &history[j]))
                    .sum();
                self.marks.factor(i, state) * (self.baselines[i] + excitation)
            })
            .sum()
    }

    fn intensities(
        &self, t: f64, state: usize, excitations: &[ExcitationState], history: &[Vec<f64>],
    ) -> Vec<f64> {
        let n = self.n_nodes();
        (0..n)
            .map(|i| {
                let excitation: f64 =
                    (0..n).map(|j| excitations[i * n + j].value_at(t, &history[j])).sum();
                self.marks.factor(i, state) * (self.baselines[i] + excitation)
            })
            .collect()
    }
}

/// Node whose cumulative intensity first exceeds `u` (`u < Σ λ`).
fn pick_node(intensities: &[f64], u: f64) -> usize {
    let mut acc = 0.0;
    for (i, &lambda) in intensities.iter().enumerate() {
        acc += lambda;
        if u < acc {
            return i;
        }
    }
    intensities.iter().rposition(|&l| l > 0.0).unwrap_or(0)
}

struct Tracker {
    dt: f64,
    end_time: f64,
    next: usize,
    times: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl Tracker {
    fn new(dt: f64, end_time: f64, n_nodes: usize) -> Self {
        Self { dt, end_time, next: 0, times: Vec::new(), values: vec![Vec::new(); n_nodes] }
    }

    /// Sample every pending grid time `< until` (`≤ end_time` at the horizon).
    fn record_until<F: Fn(f64) -> Vec<f64>>(&mut self, until: f64, intensities: F) {
        loop {
            let s = self.next as f64 * self.dt;
            let pending = if until >= self.end_time { s <= self.end_time } else { s < until };
            if !pending {
                break;
            }
            for (column, value) in self.values.iter_mut().zip(intensities(s)) {
                column.push(value);
            }
            self.times.push(s);
            self.next += 1;
        }
    }

    fn finish(self) -> IntensityTrace {
        IntensityTrace {
            times: Array1::from(self.times),
            values: self.values.into_iter().map(Array1::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hawkes::core::kernels::HawkesKernel;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn two_node_exp(end_time: f64, seed: u64) -> HawkesSimulation {
        let kernels =
            KernelMatrix::exp(&array![[0.2, 0.3], [0.1, 0.4]], 3.0).expect("valid kernels");
        let opts = SimOpts::with_horizon(end_time, seed).expect("valid options");
        HawkesSimulation::new(kernels, array![0.5, 0.8], opts).expect("valid simulator")
    }

    #[test]
    // Purpose
    // -------
    // Simulated timestamps are sorted, inside the horizon, and reproducible.
    //
    // Given
    // -----
    // - Two exponential nodes, horizon 500, seed 3007, simulated twice.
    //
    // Expect
    // ------
    // - Strictly increasing timestamps in [0, 500] per node.
    // - Identical outputs across runs.
    // - global_n of length n_jumps + 1, all zero for a neutral table.
    fn simulation_is_sorted_bounded_and_deterministic() {
        let sim = two_node_exp(500.0, 3007);

        let first = sim.simulate().expect("simulation succeeds");
        let second = sim.simulate().expect("simulation succeeds");

        assert_eq!(first, second);
        assert!(first.n_jumps() > 0);
        for ts in first.timestamps() {
            assert!(ts.windows(2).into_iter().all(|w| w[0] < w[1]));
            assert!(ts.iter().all(|&t| (0.0..=500.0).contains(&t)));
        }
        assert_eq!(first.global_n.len(), first.n_jumps() + 1);
        assert!(first.global_n.iter().all(|&s| s == 0));
    }

    #[test]
    // Purpose
    // -------
    // Event counts match the stationary rate (I - ‖φ‖)^{-1} μ.
    //
    // Given
    // -----
    // - Norms [[0.2, 0.3], [0.1, 0.4]], μ = [0.5, 0.8], horizon 20000.
    //
    // Expect
    // ------
    // - Rates within 5% of [1.2, 1.533333].
    fn empirical_rates_match_stationary_rates() {
        let sim = two_node_exp(20_000.0, 11);

        let out = sim.simulate().expect("simulation succeeds");

        let counts = out.realization.n_events_per_node();
        let rate0 = counts[0] as f64 / 20_000.0;
        let rate1 = counts[1] as f64 / 20_000.0;
        assert_relative_eq!(rate0, 1.2, max_relative = 0.05);
        assert_relative_eq!(rate1, 1.5333333333333334, max_relative = 0.05);
    }

    #[test]
    // Purpose
    // -------
    // Uniform mark dynamics produce states in range, starting from state 0.
    fn uniform_marks_stay_in_range() {
        let table = MarkTable::new(array![[1.0, 0.5, 2.0], [1.0, 1.5, 0.5]]).expect("valid table");
        let sim = two_node_exp(200.0, 5).with_marks(table, MarkDynamics::Uniform).expect("valid");

        let out = sim.simulate().expect("simulation succeeds");

        assert_eq!(out.n_states, 3);
        assert_eq!(out.global_n.len(), out.n_jumps() + 1);
        assert_eq!(out.global_n[0], 0);
        assert!(out.global_n.iter().all(|&s| s < 3));
        assert!(out.global_n.iter().any(|&s| s != 0));
    }

    #[test]
    // Purpose
    // -------
    // Queue dynamics record one quantity per state.
    fn queue_dynamics_record_quantities() {
        let table = MarkTable::new(Array2::ones((2, 4))).expect("valid table");
        let dynamics = MarkDynamics::QueueSize {
            initial_quantity: 2.0,
            average_size: 1.0,
            order_sizes: vec![1.0, -1.0],
        };
        let sim = two_node_exp(100.0, 9).with_marks(table, dynamics).expect("valid");

        let out = sim.simulate().expect("simulation succeeds");

        let quantities = out.quantities.as_ref().expect("queue quantities tracked");
        assert_eq!(quantities.len(), out.global_n.len());
        assert!(quantities.iter().all(|&q| q >= 0.0));
        assert_eq!(out.global_n[0], 2);
    }

    #[test]
    // Purpose
    // -------
    // Explosive networks are refused unless bounded.
    //
    // Given
    // -----
    // - A single node with ‖φ‖ = 0.8 and mark factors up to 1.5 (ρ = 1.2).
    //
    // Expect
    // ------
    // - `Explosive` by default.
    // - A max_jumps bound lets the simulation run and stop at that count.
    fn explosive_network_requires_a_guard() {
        let kernels = KernelMatrix::exp(&array![[0.8]], 1.0).expect("valid kernels");
        let table = MarkTable::new(array![[1.0, 1.5]]).expect("valid table");
        let opts = SimOpts::with_horizon(1e6, 1).expect("valid options");
        let sim = HawkesSimulation::new(kernels.clone(), array![1.0], opts)
            .and_then(|s| s.with_marks(table.clone(), MarkDynamics::Uniform))
            .expect("valid simulator");

        let err = sim.simulate().expect_err("explosive must fail");
        match err {
            HawkesError::Explosive { spectral_radius } => {
                assert_relative_eq!(spectral_radius, 1.2, epsilon = 1e-8)
            }
            other => panic!("Unexpected error: {other:?}"),
        }

        let bounded = SimOpts::new(1e6, 1, None, Some(50), false).expect("valid options");
        let sim = HawkesSimulation::new(kernels, array![1.0], bounded)
            .and_then(|s| s.with_marks(table, MarkDynamics::Uniform))
            .expect("valid simulator");
        let out = sim.simulate().expect("bounded simulation succeeds");
        assert_eq!(out.n_jumps(), 50);
    }

    #[test]
    // Purpose
    // -------
    // Zero baselines and no excitation give an empty realization, not an
    // error.
    fn empty_simulation_is_not_an_error() {
        let kernels = KernelMatrix::new(vec![vec![HawkesKernel::Zero]]).expect("valid kernels");
        let opts = SimOpts::new(10.0, 0, Some(2.5), None, false).expect("valid options");
        let sim = HawkesSimulation::new(kernels, array![0.0], opts).expect("valid simulator");

        let out = sim.simulate().expect("simulation succeeds");

        assert_eq!(out.n_jumps(), 0);
        assert_eq!(out.global_n, vec![0]);
        let trace = out.intensity.expect("tracking requested");
        assert_eq!(trace.times, array![0.0, 2.5, 5.0, 7.5, 10.0]);
        assert!(trace.values[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Tracked intensities equal the baseline before the first event and
    // jump by at most φ(0) after events.
    fn tracked_intensity_starts_at_baseline() {
        let sim = {
            let kernels = KernelMatrix::exp(&array![[0.5]], 2.0).expect("valid kernels");
            let opts = SimOpts::new(50.0, 4, Some(0.01), None, false).expect("valid options");
            HawkesSimulation::new(kernels, array![0.7], opts).expect("valid simulator")
        };

        let out = sim.simulate().expect("simulation succeeds");

        let trace = out.intensity.expect("tracking requested");
        assert_eq!(trace.times.len(), trace.values[0].len());
        assert_relative_eq!(trace.values[0][0], 0.7);
        assert!(trace.values[0].iter().all(|&v| v >= 0.7 - 1e-12));
    }

    #[test]
    // Purpose
    // -------
    // Strong inhibition driving an intensity negative is reported.
    fn negative_intensity_is_an_error() {
        let kernels = KernelMatrix::new(vec![
            vec![HawkesKernel::Zero, HawkesKernel::exp(-5.0, 0.1).expect("valid kernel")],
            vec![HawkesKernel::Zero, HawkesKernel::Zero],
        ])
        .expect("valid kernels");
        let opts = SimOpts::new(1000.0, 2, None, None, true).expect("valid options");
        let sim = HawkesSimulation::new(kernels, array![0.1, 1.0], opts).expect("valid simulator");

        let err = sim.simulate().expect_err("negative intensity must fail");

        match err {
            HawkesError::NegativeIntensity { node, value, .. } => {
                assert_eq!(node, 0);
                assert!(value < 0.0);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }
}
