//! Hawkes options — configuration for simulation and model evaluation.
//!
//! Purpose
//! -------
//! Keep the knobs of the thinning simulator and of the parallel model
//! evaluation out of the numerical code, so call sites pass explicit,
//! validated options instead of ad-hoc flags.
//!
//! Key behaviors
//! -------------
//! - [`SimOpts`] holds the horizon, RNG seed, intensity-tracking grid, and
//!   the guards against explosive configurations.
//! - [`ModelOptions`] holds the size of the worker pool used by `fit`,
//!   `loss` and `grad`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every constructor validates its inputs and never panics.
//! - `SimOpts::default()` simulates nothing (`end_time = 0`); callers are
//!   expected to set a horizon.
use crate::hawkes::errors::{HawkesError, HawkesResult};

/// SimOpts — simulation-time configuration for the thinning simulator.
///
/// Fields
/// ------
/// - `end_time`: `f64`
///   Horizon of the realization; candidates beyond it stop the simulation.
/// - `seed`: `u64`
///   RNG seed. A simulation is a pure function of its configuration and seed.
/// - `track_intensity`: `Option<f64>`
///   When `Some(dt)`, intensities are sampled on the grid `0, dt, 2dt, …`.
/// - `max_jumps`: `Option<usize>`
///   Stop after this many accepted events.
/// - `force_simulation`: `bool`
///   Simulate even when the branching ratio is ≥ 1.
///
/// Notes
/// -----
/// - An explosive network is only simulated when `force_simulation` is set
///   or `max_jumps` bounds the output.
#[derive(Debug, Clone, PartialEq)]
pub struct SimOpts {
    pub end_time: f64,
    pub seed: u64,
    pub track_intensity: Option<f64>,
    pub max_jumps: Option<usize>,
    pub force_simulation: bool,
}

impl SimOpts {
    /// Validated simulation options.
    ///
    /// # Errors
    /// - [`HawkesError::InvalidSimOption`] if `end_time` is negative or
    ///   non-finite, or if the tracking step is not finite and `> 0`.
    pub fn new(
        end_time: f64, seed: u64, track_intensity: Option<f64>, max_jumps: Option<usize>,
        force_simulation: bool,
    ) -> HawkesResult<Self> {
        if !end_time.is_finite() || end_time < 0.0 {
            return Err(HawkesError::InvalidSimOption {
                name: "end_time",
                value: end_time,
                reason: "must be finite and >= 0",
            });
        }
        if let Some(dt) = track_intensity {
            if !dt.is_finite() || dt <= 0.0 {
                return Err(HawkesError::InvalidSimOption {
                    name: "track_intensity",
                    value: dt,
                    reason: "must be finite and > 0",
                });
            }
        }
        Ok(Self { end_time, seed, track_intensity, max_jumps, force_simulation })
    }

    /// Options for a horizon and seed, without tracking or guards.
    pub fn with_horizon(end_time: f64, seed: u64) -> HawkesResult<Self> {
        Self::new(end_time, seed, None, None, false)
    }
}

impl Default for SimOpts {
    fn default() -> Self {
        Self { end_time: 0.0, seed: 42, track_intensity: None, max_jumps: None, force_simulation: false }
    }
}

/// Parallelism of model evaluation.
///
/// `n_threads` bounds the rayon pool that computes per-realization
/// contributions; results are always reduced in realization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelOptions {
    pub n_threads: usize,
}

impl ModelOptions {
    /// # Errors
    /// - [`HawkesError::InvalidThreads`] if `n_threads == 0`.
    pub fn new(n_threads: usize) -> HawkesResult<Self> {
        if n_threads == 0 {
            return Err(HawkesError::InvalidThreads { n_threads });
        }
        Ok(Self { n_threads })
    }
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self { n_threads: 1 }
    }
}
