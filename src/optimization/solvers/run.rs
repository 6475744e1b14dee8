//! Execution helper that runs one of the proximal solvers through argmin's
//! [`Executor`] and returns a crate-friendly [`SolveOutcome`].
//!
//! Also hosts the bookkeeping every solver shares ([`Progress`]): objective
//! history, relative-tolerance convergence, and the current step size.
use crate::optimization::{
    errors::{OptError, OptResult},
    solvers::{
        adapter::ModelProblem,
        traits::{SolveOutcome, SolverOptions},
        types::{Cost, SolverState, Theta},
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State, TerminationReason, TerminationStatus};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Read access the runner needs on top of argmin's `Solver`.
pub trait ProxIteration {
    /// Objective values recorded so far.
    fn history(&self) -> &[Cost];

    /// Step size currently in use.
    fn current_step(&self) -> f64;
}

/// History, tolerance and step shared by all proximal solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub history: Vec<Cost>,
    pub record_every: usize,
    pub tol: Option<f64>,
    pub step: f64,
    last: Option<Cost>,
    converged: bool,
}

impl Progress {
    pub fn new(opts: &SolverOptions) -> Self {
        Self {
            history: Vec::new(),
            record_every: opts.record_every.max(1),
            tol: opts.tol,
            step: opts.step,
            last: None,
            converged: false,
        }
    }

    /// Record the objective at the starting point.
    pub fn start(&mut self, cost: Cost) {
        self.history.clear();
        self.history.push(cost);
        self.last = Some(cost);
        self.converged = false;
    }

    /// Record the objective after iteration `iter` (0-based) and update the
    /// convergence flag.
    pub fn finish_iter(&mut self, iter: u64, cost: Cost) {
        if (iter + 1) % self.record_every as u64 == 0 {
            self.history.push(cost);
        }
        if let (Some(tol), Some(prev)) = (self.tol, self.last) {
            let rel = (cost - prev).abs() / prev.abs().max(1.0);
            self.converged = rel < tol;
        }
        self.last = Some(cost);
    }

    /// Shrink the step after a rejected iteration.
    pub fn shrink_step(&mut self, factor: f64) {
        self.step *= factor;
    }

    pub fn termination(&self) -> TerminationStatus {
        if self.converged {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        } else {
            TerminationStatus::NotTerminated
        }
    }
}

/// Take the starting point out of a freshly configured state.
pub fn start_param(state: &SolverState) -> Result<&Theta, argmin::core::Error> {
    state.get_param().ok_or_else(|| {
        OptError::NotInitialized { text: "Starting point was not set on the solver state.".into() }
            .into()
    })
}

/// Run a proximal solver on `problem` from `x0`.
///
/// Wires up the problem, the solver, the starting point and `max_iter`,
/// attaches the slog observer when `opts.verbose` (feature `obs_slog`),
/// executes, and converts the final state into a [`SolveOutcome`] whose
/// `solution` is the last iterate.
///
/// # Errors
/// - Model errors at accepted points, line-search failures, and argmin
///   runtime errors, converted through `From<argmin::core::Error>`.
/// - Validation errors when building the outcome.
pub fn run_solver<'a, S>(
    x0: Theta, opts: &SolverOptions, problem: ModelProblem<'a>, solver: S,
) -> OptResult<SolveOutcome>
where
    S: argmin::core::Solver<ModelProblem<'a>, SolverState> + ProxIteration + Send + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&x0, &problem)?;
    }
    let max_iter = opts.max_iter as u64;
    #[cfg_attr(not(feature = "obs_slog"), allow(unused_mut))]
    let mut executor =
        Executor::new(problem, solver).configure(|state| state.param(x0).max_iters(max_iter));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        executor = executor.add_observer(
            observer,
            argmin::core::observers::ObserverMode::Every(opts.print_every as u64),
        );
    }

    let result = executor.run()?;
    let history = result.solver().history().to_vec();
    let step = result.solver().current_step();
    let state = result.state();
    SolveOutcome::new(
        state.get_param().cloned(),
        state.get_cost(),
        state.get_termination_status().clone(),
        state.get_iter(),
        state.get_func_counts().clone(),
        history,
        step,
    )
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state(x0: &Theta, problem: &ModelProblem<'_>) -> OptResult<()> {
    let f0 = problem.cost(x0)?;
    let g0n = problem.gradient(x0).ok().map(|g| g.l2_norm());

    eprintln!(
        "init: F(x0) = {:.6}{}",
        f0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // History honors record_every and the tolerance flag follows the
    // relative objective change.
    //
    // Given
    // -----
    // - record_every = 2, tol = 1e-3, costs 10 → 5 → 4.999.
    //
    // Expect
    // ------
    // - History [10, 4.999]; converged once the change drops below tol.
    fn progress_records_and_detects_convergence() {
        let opts = SolverOptions::default()
            .with_record_every(2)
            .and_then(|o| o.with_tol(1e-3))
            .expect("valid options");
        let mut progress = Progress::new(&opts);

        progress.start(10.0);
        progress.finish_iter(0, 5.0);
        assert_eq!(progress.termination(), TerminationStatus::NotTerminated);
        progress.finish_iter(1, 4.999);

        assert_eq!(progress.history, vec![10.0, 4.999]);
        assert_eq!(
            progress.termination(),
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        );
    }
}
