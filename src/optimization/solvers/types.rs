//! solvers::types — shared numeric aliases and argmin state wiring.
//!
//! Parameters, gradients and objective values are `ndarray`/`f64`
//! containers; every solver in this module runs on the same argmin
//! [`IterState`] specialization, [`SolverState`].
use argmin::core::IterState;
use ndarray::Array1;
use std::collections::HashMap;

/// Coefficient vector `x` in the shared parameter layout.
pub type Theta = Array1<f64>;

/// Gradient of the smooth part of the objective, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value `F(x) = loss(x) + g(x)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by argmin.
///
/// Besides argmin's `cost_count`/`gradient_count`, solvers record
/// `loss_count`, `grad_i_count` and `prox_count`.
pub type FnEvalMap = HashMap<String, u64>;

/// argmin state shared by all proximal solvers.
pub type SolverState = IterState<Theta, Grad, (), (), (), Cost>;

/// Step growth applied before each backtracking line search.
pub const LINESEARCH_STEP_INCREASE: f64 = 2.0;

/// Step shrink factor of backtracking line searches and rollbacks.
pub const STEP_DECREASE: f64 = 0.5;

/// Maximum number of backtracking halvings per iteration.
pub const MAX_BACKTRACKS: usize = 60;

/// Relative slack on the sufficient-decrease test; absorbs rounding once
/// the iterates sit at the minimizer.
pub const LINESEARCH_SLACK: f64 = 1e-12;
