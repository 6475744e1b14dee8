//! solvers — argmin-powered proximal first-order solvers.
//!
//! Purpose
//! -------
//! Minimize `F(x) = loss(x) + g(x)` for a fitted Hawkes
//! [`Model`](crate::hawkes::models::traits::Model) and a
//! [`Prox`](crate::optimization::prox::Prox) penalty, from Rust or Python.
//! Callers configure a [`SolverOptions`], attach a model and a penalty to a
//! [`Solver`], and call [`Solver::solve`].
//!
//! Key behaviors
//! -------------
//! - Expose the model and penalty to argmin through
//!   [`adapter::ModelProblem`]; argmin tracks the composite objective.
//! - Five algorithms, each an argmin `Solver` over the shared
//!   [`types::SolverState`]:
//!   - [`gradient::ProxGd`] (ISTA) and [`gradient::ProxAgd`] (FISTA) with
//!     optional backtracking line search,
//!   - [`stochastic::ProxSgd`] and [`stochastic::ProxSvrg`] over the
//!     per-node samples,
//!   - [`sdca::ProxSdca`], dual-free SDCA with a ridge term.
//! - Run them through [`run::run_solver`], which attaches the optional slog
//!   observer and normalizes the final state into a [`SolveOutcome`].
//! - Cross-check analytic model gradients with [`finite_diff`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The stored iterate always has a finite objective. Trial points outside
//!   the model's domain are rejected by step halving, momentum restarts or
//!   epoch rollbacks rather than reported as errors.
//! - Options are validated on construction.
//!
//! Conventions
//! -----------
//! - The solution is the last iterate.
//! - Stopping is `max_iter` unless a relative objective tolerance is set.
//! - Evaluation counters: argmin's `cost_count` / `gradient_count` plus
//!   `loss_count`, `grad_i_count` and `prox_count`.
pub mod adapter;
pub mod api;
pub mod finite_diff;
pub mod gradient;
pub mod run;
pub mod sdca;
pub mod stochastic;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adapter::ModelProblem;
pub use self::api::Solver;
pub use self::traits::{SolveOutcome, SolverKind, SolverOptions, StepType};
pub use self::types::{Cost, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_hawkes::optimization::solvers::prelude::*;
//
// to import the main solver surface in a single line.

pub mod prelude {
    pub use super::api::Solver;
    pub use super::finite_diff::{fd_gradient, gradient_error};
    pub use super::traits::{SolveOutcome, SolverKind, SolverOptions, StepType};
    pub use super::types::{Cost, Grad, Theta};
}
