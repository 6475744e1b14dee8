//! Full-gradient proximal solvers: ISTA ([`ProxGd`]) and FISTA
//! ([`ProxAgd`]).
//!
//! Purpose
//! -------
//! Minimize `F(x) = loss(x) + g(x)` with steps
//! `x⁺ = prox_{s·g}(y − s ∇loss(y))`, where `y = x` for GD and an
//! extrapolated point for AGD.
//!
//! Key behaviors
//! -------------
//! - Optional backtracking line search: the step first grows by
//!   [`LINESEARCH_STEP_INCREASE`], then halves until
//!   `loss(x⁺) ≤ loss(y) + ∇loss(y)·(x⁺ − y) + ||x⁺ − y||² / (2s)`.
//! - Without line search, a step landing outside the model's domain is
//!   rejected: the iterate stays, the step halves, and AGD restarts its
//!   momentum.
//! - AGD with `monotone` keeps the previous iterate whenever the candidate
//!   increases `F` (MFISTA), so the recorded objective never increases.
//!
//! Invariants & assumptions
//! ------------------------
//! - The iterate stored in the argmin state is always a point where `F` is
//!   finite; its objective is the state's cost.
//! - An extrapolated AGD point outside the domain resets the momentum and
//!   restarts from the current iterate.
use argmin::core::{Error, KV, Problem, State, TerminationStatus};

use crate::optimization::{
    errors::OptError,
    solvers::{
        adapter::ModelProblem,
        run::{Progress, ProxIteration, start_param},
        traits::SolverOptions,
        types::{
            Cost, Grad, LINESEARCH_SLACK, LINESEARCH_STEP_INCREASE, MAX_BACKTRACKS, STEP_DECREASE,
            SolverState, Theta,
        },
    },
};

/// Point accepted by a backtracking search.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub point: Theta,
    pub objective: Cost,
    pub step: f64,
}

/// `prox_{s·g}(y − s·grad)`.
pub fn prox_step(
    problem: &mut Problem<ModelProblem<'_>>, y: &Theta, grad: &Grad, step: f64,
) -> Result<Theta, Error> {
    let mut z = y.clone();
    z.scaled_add(-step, grad);
    problem.problem("prox_count", |p| Ok(p.prox(&z, step)))
}

/// Backtracking search for the proximal-gradient step from `y`.
///
/// # Errors
/// [`OptError::LineSearchFailed`] after [`MAX_BACKTRACKS`] halvings.
pub fn backtrack(
    problem: &mut Problem<ModelProblem<'_>>, y: &Theta, fy: Cost, grad: &Grad, step: f64,
) -> Result<Trial, Error> {
    let mut step = step;
    for _ in 0..MAX_BACKTRACKS {
        let z = prox_step(problem, y, grad, step)?;
        let (fz, gz) = problem.problem("loss_count", |p| Ok((p.trial_loss(&z)?, p.penalty(&z))))?;
        let d = &z - y;
        let bound =
            fy + grad.dot(&d) + d.dot(&d) / (2.0 * step) + LINESEARCH_SLACK * fy.abs().max(1.0);
        if fz <= bound {
            return Ok(Trial { point: z, objective: fz + gz, step });
        }
        step *= STEP_DECREASE;
    }
    Err(OptError::LineSearchFailed { step }.into())
}

fn missing_param() -> Error {
    OptError::NotInitialized { text: "Solver state has no current iterate.".into() }.into()
}

/// Proximal gradient descent (ISTA).
#[derive(Debug, Clone, PartialEq)]
pub struct ProxGd {
    linesearch: bool,
    progress: Progress,
}

impl ProxGd {
    pub fn new(opts: &SolverOptions) -> Self {
        Self { linesearch: opts.linesearch, progress: Progress::new(opts) }
    }
}

impl ProxIteration for ProxGd {
    fn history(&self) -> &[Cost] {
        &self.progress.history
    }

    fn current_step(&self) -> f64 {
        self.progress.step
    }
}

impl<'a> argmin::core::Solver<ModelProblem<'a>, SolverState> for ProxGd {
    const NAME: &'static str = "Proximal gradient descent";

    fn init(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let cost = problem.cost(start_param(&state)?)?;
        self.progress.start(cost);
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, mut state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let iter = state.get_iter();
        let prev_cost = state.get_cost();
        let x = state.take_param().ok_or_else(missing_param)?;
        let grad = problem.gradient(&x)?;

        let (next, cost) = if self.linesearch {
            let fx = problem.problem("loss_count", |p| Ok(p.loss(&x)?))?;
            let trial =
                backtrack(problem, &x, fx, &grad, self.progress.step * LINESEARCH_STEP_INCREASE)?;
            self.progress.step = trial.step;
            (trial.point, trial.objective)
        } else {
            let z = prox_step(problem, &x, &grad, self.progress.step)?;
            let fz = problem.problem("loss_count", |p| Ok(p.trial_objective(&z)?))?;
            if fz.is_finite() {
                (z, fz)
            } else {
                self.progress.shrink_step(STEP_DECREASE);
                (x, prev_cost)
            }
        };

        self.progress.finish_iter(iter, cost);
        Ok((state.param(next).cost(cost), None))
    }

    fn terminate(&mut self, _state: &SolverState) -> TerminationStatus {
        self.progress.termination()
    }
}

/// Accelerated proximal gradient (FISTA), optionally monotone.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxAgd {
    linesearch: bool,
    monotone: bool,
    t: f64,
    y: Option<Theta>,
    progress: Progress,
}

impl ProxAgd {
    pub fn new(opts: &SolverOptions) -> Self {
        Self {
            linesearch: opts.linesearch,
            monotone: opts.monotone,
            t: 1.0,
            y: None,
            progress: Progress::new(opts),
        }
    }

    fn restart(&mut self) {
        self.t = 1.0;
        self.y = None;
    }
}

impl ProxIteration for ProxAgd {
    fn history(&self) -> &[Cost] {
        &self.progress.history
    }

    fn current_step(&self) -> f64 {
        self.progress.step
    }
}

impl<'a> argmin::core::Solver<ModelProblem<'a>, SolverState> for ProxAgd {
    const NAME: &'static str = "Accelerated proximal gradient";

    fn init(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let cost = problem.cost(start_param(&state)?)?;
        self.restart();
        self.progress.start(cost);
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, mut state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let iter = state.get_iter();
        let prev_cost = state.get_cost();
        let x = state.take_param().ok_or_else(missing_param)?;

        let mut y = self.y.take().unwrap_or_else(|| x.clone());
        let grad = match problem.problem("gradient_count", |p| Ok(p.trial_grad(&y)?))? {
            Some(g) => g,
            None => {
                self.restart();
                y = x.clone();
                problem.gradient(&y)?
            }
        };

        let (z, fz) = if self.linesearch {
            let fy = problem.problem("loss_count", |p| Ok(p.loss(&y)?))?;
            let trial =
                backtrack(problem, &y, fy, &grad, self.progress.step * LINESEARCH_STEP_INCREASE)?;
            self.progress.step = trial.step;
            (trial.point, trial.objective)
        } else {
            let z = prox_step(problem, &y, &grad, self.progress.step)?;
            let fz = problem.problem("loss_count", |p| Ok(p.trial_objective(&z)?))?;
            (z, fz)
        };

        if !fz.is_finite() {
            self.restart();
            self.progress.shrink_step(STEP_DECREASE);
            self.progress.finish_iter(iter, prev_cost);
            return Ok((state.param(x).cost(prev_cost), None));
        }

        let t_next = 0.5 * (1.0 + (1.0 + 4.0 * self.t * self.t).sqrt());
        let diff = &z - &x;
        let (next, cost, y_next) = if self.monotone && fz > prev_cost {
            let mut y_next = x.clone();
            y_next.scaled_add(self.t / t_next, &diff);
            (x, prev_cost, y_next)
        } else {
            let mut y_next = z.clone();
            y_next.scaled_add((self.t - 1.0) / t_next, &diff);
            (z, fz, y_next)
        };
        self.t = t_next;
        self.y = Some(y_next);

        self.progress.finish_iter(iter, cost);
        Ok((state.param(next).cost(cost), None))
    }

    fn terminate(&mut self, _state: &SolverState) -> TerminationStatus {
        self.progress.termination()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hawkes::{
            core::{data::HawkesData, options::ModelOptions},
            models::{leastsq::LeastSqModel, loglik::LogLikModel, traits::Model},
        },
        optimization::{
            prox::Prox,
            solvers::{run::run_solver, traits::SolverKind},
        },
    };
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Monotone decrease of GD with line search and of monotone AGD.
    // - Agreement of GD and AGD on a strongly convex least-squares problem.
    // - Rejection of steps that leave the log-likelihood's domain.
    // -------------------------------------------------------------------------

    fn data() -> HawkesData {
        HawkesData::single(
            vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]],
            Some(5.65),
        )
        .expect("valid data")
    }

    fn leastsq() -> LeastSqModel {
        let mut model = LeastSqModel::exp(2.0, ModelOptions::default()).expect("valid");
        model.fit(&data()).expect("fit succeeds");
        model
    }

    fn x0() -> Theta {
        array![0.5, 0.5, 0.1, 0.1, 0.1, 0.1]
    }

    fn non_increasing(history: &[f64]) -> bool {
        history.windows(2).all(|w| w[1] <= w[0] + 1e-10)
    }

    #[test]
    // Purpose
    // -------
    // ISTA with backtracking never increases the objective.
    //
    // Given
    // -----
    // - Exponential least squares, L1 penalty 1e-3, initial step 1.
    //
    // Expect
    // ------
    // - Non-increasing history of length max_iter + 1, final below initial.
    fn gd_with_linesearch_is_monotone() {
        let model = leastsq();
        let prox = Prox::l1(1e-3).expect("valid");
        let opts = SolverOptions::new(SolverKind::Gd, 1.0, 50).expect("valid").with_linesearch(true);

        let out = run_solver(x0(), &opts, ModelProblem::new(&model, &prox), ProxGd::new(&opts))
            .expect("solve succeeds");

        assert_eq!(out.history.len(), 51);
        assert!(non_increasing(&out.history));
        assert!(out.objective < out.history[0]);
        assert_eq!(out.iterations, 50);
    }

    #[test]
    // Purpose
    // -------
    // Monotone FISTA records a non-increasing objective even with a fixed
    // step.
    fn monotone_agd_never_increases() {
        let model = leastsq();
        let prox = Prox::zero();
        let opts = SolverOptions::new(SolverKind::Agd, 0.05, 80).expect("valid").with_monotone(true);

        let out = run_solver(x0(), &opts, ModelProblem::new(&model, &prox), ProxAgd::new(&opts))
            .expect("solve succeeds");

        assert!(non_increasing(&out.history));
        assert!(out.objective < out.history[0]);
    }

    #[test]
    // Purpose
    // -------
    // GD and AGD reach the same minimizer of a strongly convex quadratic.
    //
    // Given
    // -----
    // - Unpenalized exponential least squares, both with line search,
    //   500 iterations.
    //
    // Expect
    // ------
    // - Objectives within 1e-8 and gradients at the AGD solution below 1e-5.
    fn gd_and_agd_agree_on_least_squares() {
        let model = leastsq();
        let prox = Prox::zero();
        let gd_opts =
            SolverOptions::new(SolverKind::Gd, 1.0, 500).expect("valid").with_linesearch(true);
        let agd_opts =
            SolverOptions::new(SolverKind::Agd, 1.0, 500).expect("valid").with_linesearch(true);

        let gd = run_solver(x0(), &gd_opts, ModelProblem::new(&model, &prox), ProxGd::new(&gd_opts))
            .expect("gd succeeds");
        let agd =
            run_solver(x0(), &agd_opts, ModelProblem::new(&model, &prox), ProxAgd::new(&agd_opts))
                .expect("agd succeeds");

        assert!((gd.objective - agd.objective).abs() < 1e-8);
        let mut grad = Theta::zeros(6);
        model.grad(agd.solution.view(), &mut grad).expect("grad");
        assert!(grad.iter().all(|g| g.abs() < 1e-5));
    }

    #[test]
    // Purpose
    // -------
    // A fixed step that leaves the log-likelihood's domain is rejected and
    // halved instead of failing the solve.
    //
    // Given
    // -----
    // - Exponential log-likelihood, GD without line search, step 50.
    //
    // Expect
    // ------
    // - The solve succeeds with a finite objective and a reduced step.
    fn gd_rejects_steps_outside_domain() {
        let mut model = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid");
        model.fit(&data()).expect("fit succeeds");
        let prox = Prox::zero();
        let opts = SolverOptions::new(SolverKind::Gd, 50.0, 30).expect("valid");

        let out = run_solver(x0(), &opts, ModelProblem::new(&model, &prox), ProxGd::new(&opts))
            .expect("solve succeeds");

        assert!(out.step < 50.0);
        assert!(out.objective.is_finite());
        assert!(out.history.iter().all(|v| v.is_finite()));
    }
}
