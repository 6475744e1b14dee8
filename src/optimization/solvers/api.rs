//! Stateful solver facade.
//!
//! Purpose
//! -------
//! [`Solver`] bundles a [`SolverOptions`] with a fitted model and a
//! [`Prox`], runs the configured algorithm from a starting point, and keeps
//! the last [`SolveOutcome`].
//!
//! Key behaviors
//! -------------
//! - `set_model` and `set_prox` must both be called before `solve`;
//!   otherwise `solve` fails with [`OptError::ModelNotSet`] /
//!   [`OptError::ProxNotSet`].
//! - `solve` validates the starting point against the model dimension and
//!   the penalty's coordinate range, then dispatches on
//!   [`SolverKind`].
//! - The outcome of a solve replaces the previous one; a failed solve
//!   leaves no outcome behind.
//!
//! Invariants & assumptions
//! ------------------------
//! - SDCA options carry `l_l2sq > 0`; checked when the facade is built.
//! - The model is shared through an `Arc`, so one fitted model can back
//!   several solvers.
use std::sync::Arc;

use crate::{
    hawkes::models::traits::Model,
    optimization::{
        errors::{OptError, OptResult},
        prox::Prox,
        solvers::{
            adapter::ModelProblem,
            gradient::{ProxAgd, ProxGd},
            run::run_solver,
            sdca::ProxSdca,
            stochastic::{ProxSgd, ProxSvrg},
            traits::{SolveOutcome, SolverKind, SolverOptions},
            types::{Cost, Theta},
            validation::validate_start,
        },
    },
};

/// Proximal solver bound to a model and a penalty.
#[derive(Clone)]
pub struct Solver {
    options: SolverOptions,
    model: Option<Arc<dyn Model>>,
    prox: Option<Prox>,
    outcome: Option<SolveOutcome>,
}

impl Solver {
    /// # Errors
    /// [`OptError::MissingL2Sq`] for SDCA without a positive `l_l2sq`.
    pub fn new(options: SolverOptions) -> OptResult<Self> {
        if options.kind == SolverKind::Sdca && options.l_l2sq <= 0.0 {
            return Err(OptError::MissingL2Sq);
        }
        Ok(Self { options, model: None, prox: None, outcome: None })
    }

    /// Build from a solver name (`"gd"`, `"agd"`, `"sgd"`, `"svrg"`, `"sdca"`)
    /// with default options otherwise.
    pub fn from_name(name: &str, step: f64, max_iter: usize) -> OptResult<Self> {
        Self::new(SolverOptions::new(name.parse()?, step, max_iter)?)
    }

    pub fn set_model(&mut self, model: Arc<dyn Model>) -> &mut Self {
        self.model = Some(model);
        self
    }

    pub fn set_prox(&mut self, prox: Prox) -> &mut Self {
        self.prox = Some(prox);
        self
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    pub fn prox(&self) -> Option<&Prox> {
        self.prox.as_ref()
    }

    /// Minimize from `x0` and return the solution (the last iterate).
    ///
    /// # Errors
    /// - [`OptError::ModelNotSet`] / [`OptError::ProxNotSet`].
    /// - [`OptError::StartLengthMismatch`] / [`OptError::NonFiniteStart`].
    /// - [`OptError::InvalidRange`] if the penalty range exceeds the model
    ///   dimension.
    /// - Model errors at accepted points and line-search failures.
    pub fn solve(&mut self, x0: Theta) -> OptResult<&Theta> {
        self.outcome = None;
        let model = self.model.as_deref().ok_or(OptError::ModelNotSet)?;
        let prox = self.prox.as_ref().ok_or(OptError::ProxNotSet)?;
        let dim = model.n_coeffs()?;
        validate_start(&x0, dim)?;
        prox.check_dim(dim)?;
        let n_samples = model.n_samples()?;

        let opts = &self.options;
        let problem = ModelProblem::new(model, prox);
        let outcome = match opts.kind {
            SolverKind::Gd => run_solver(x0, opts, problem, ProxGd::new(opts)),
            SolverKind::Agd => run_solver(x0, opts, problem, ProxAgd::new(opts)),
            SolverKind::Sgd => run_solver(x0, opts, problem, ProxSgd::new(opts, n_samples)),
            SolverKind::Svrg => run_solver(x0, opts, problem, ProxSvrg::new(opts, n_samples)),
            SolverKind::Sdca => run_solver(x0, opts, problem, ProxSdca::new(opts, n_samples)?),
        }?;
        Ok(&self.outcome.insert(outcome).solution)
    }

    /// Solution of the last successful solve.
    pub fn solution(&self) -> Option<&Theta> {
        self.outcome.as_ref().map(|o| &o.solution)
    }

    /// Objective history of the last successful solve (empty before any).
    pub fn history(&self) -> &[Cost] {
        self.outcome.as_ref().map_or(&[], |o| o.history.as_slice())
    }

    pub fn outcome(&self) -> Option<&SolveOutcome> {
        self.outcome.as_ref()
    }

    /// Objective minimized by this solver at `x`: `loss + g`, plus the
    /// ridge term for SDCA.
    pub fn objective(&self, x: &Theta) -> OptResult<Cost> {
        let model = self.model.as_deref().ok_or(OptError::ModelNotSet)?;
        let prox = self.prox.as_ref().ok_or(OptError::ProxNotSet)?;
        let mut value = ModelProblem::new(model, prox).loss(x)? + prox.value(x.view());
        if self.options.kind == SolverKind::Sdca {
            value += 0.5 * self.options.l_l2sq * x.dot(x);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hawkes::{
        core::{data::HawkesData, options::ModelOptions},
        models::leastsq::LeastSqModel,
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The set_model / set_prox state machine and input validation.
    // - Dispatch to every solver kind.
    // - Retention and replacement of the last outcome.
    // -------------------------------------------------------------------------

    fn model() -> Arc<dyn Model> {
        let data = HawkesData::single(
            vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]],
            Some(5.65),
        )
        .expect("valid data");
        let mut model = LeastSqModel::exp(2.0, ModelOptions::default()).expect("valid");
        model.fit(&data).expect("fit succeeds");
        Arc::new(model)
    }

    fn x0() -> Theta {
        array![0.5, 0.5, 0.1, 0.1, 0.1, 0.1]
    }

    #[test]
    // Purpose
    // -------
    // solve refuses to run until both model and prox are set.
    fn solve_requires_model_and_prox() {
        let mut solver = Solver::from_name("agd", 0.1, 10).expect("valid");
        assert_eq!(solver.solve(x0()).expect_err("no model"), OptError::ModelNotSet);

        solver.set_model(model());
        assert_eq!(solver.solve(x0()).expect_err("no prox"), OptError::ProxNotSet);

        solver.set_prox(Prox::zero());
        assert!(solver.solve(x0()).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Construction and solve-time validation report descriptive errors.
    //
    // Expect
    // ------
    // - Unknown solver names, SDCA without ridge, wrong start length and an
    //   out-of-range penalty are all rejected.
    fn invalid_configurations_are_rejected() {
        assert!(matches!(
            Solver::from_name("bfgs", 0.1, 10),
            Err(OptError::InvalidSolver { .. })
        ));
        assert!(matches!(Solver::from_name("sdca", 0.1, 10), Err(OptError::MissingL2Sq)));

        let mut solver = Solver::from_name("gd", 0.1, 10).expect("valid");
        solver.set_model(model()).set_prox(Prox::zero());
        assert_eq!(
            solver.solve(array![0.5, 0.5]).expect_err("short start"),
            OptError::StartLengthMismatch { expected: 6, found: 2 }
        );

        let prox = Prox::l1(0.1).expect("valid").with_range(2, 8).expect("valid range");
        solver.set_prox(prox);
        assert_eq!(
            solver.solve(x0()).expect_err("range past dimension"),
            OptError::InvalidRange { start: 2, end: 8, dim: 6 }
        );
        assert!(solver.outcome().is_none());
    }

    #[test]
    // Purpose
    // -------
    // Every solver kind runs and lowers the objective on least squares.
    //
    // Given
    // -----
    // - GD/AGD with line search, SGD step 0.05, SVRG step 0.02, SDCA step
    //   0.02 with λ = 0.1; 100 iterations each; L1 penalty 1e-3.
    //
    // Expect
    // ------
    // - Final objective below the recorded starting value, and equal to
    //   `objective(solution)`.
    fn every_kind_lowers_the_objective() {
        let shared = model();
        let configs = [
            SolverOptions::new(SolverKind::Gd, 1.0, 100).map(|o| o.with_linesearch(true)),
            SolverOptions::new(SolverKind::Agd, 1.0, 100).map(|o| o.with_linesearch(true)),
            SolverOptions::new(SolverKind::Sgd, 0.05, 100),
            SolverOptions::new(SolverKind::Svrg, 0.02, 100),
            SolverOptions::new(SolverKind::Sdca, 0.02, 100).and_then(|o| o.with_l_l2sq(0.1)),
        ];
        for opts in configs {
            let opts = opts.expect("valid options");
            let kind = opts.kind;
            let mut solver = Solver::new(opts).expect("valid solver");
            solver.set_model(Arc::clone(&shared)).set_prox(Prox::l1(1e-3).expect("valid"));

            let solution = solver.solve(x0()).expect("solve succeeds").clone();
            let outcome = solver.outcome().expect("outcome kept");

            assert!(outcome.objective < outcome.history[0], "{kind:?}");
            assert_relative_eq!(
                solver.objective(&solution).expect("objective"),
                outcome.objective,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // The last outcome is kept and replaced by the next solve.
    fn outcome_is_replaced_by_next_solve() {
        let mut solver = Solver::from_name("gd", 0.05, 5).expect("valid");
        solver.set_model(model()).set_prox(Prox::zero());
        assert!(solver.solution().is_none());
        assert!(solver.history().is_empty());

        let first = solver.solve(x0()).expect("first solve").clone();
        assert_eq!(solver.history().len(), 6);

        let second = solver.solve(first.clone()).expect("second solve").clone();
        assert_ne!(first, second);
        assert_eq!(solver.solution(), Some(&second));
    }
}
