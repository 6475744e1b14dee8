//! Dual-free proximal SDCA.
//!
//! Minimizes `F(x) = (1/n) Σ_i loss_i(x) + (λ/2)||x||² + g(x)` where `λ` is
//! the solver's `l_l2sq`. Each node keeps a pseudo-dual vector `α_i`; the
//! primal point is `x = prox_{g/λ}(v)` with `v = (1/(λn)) Σ_i α_i`.
//!
//! One sampled update on node `i` with step `η`:
//!
//! ```text
//! u    = ∇loss_i(x) + α_i
//! α_i ← α_i − η λ n · u
//! v   ← v − η · u
//! x   ← prox_{g/λ}(v)
//! ```
//!
//! Duals start at `α_i = λ x0`, so `v = x0`. An epoch that leaves the
//! model's domain restores `α` and `v` and halves `η`. The recorded
//! objective includes the ridge term.
use argmin::core::{Error, KV, Problem, State, TerminationStatus};
use ndarray::{Array2, Axis};
use rand::Rng;
use rand_xoshiro::{Xoshiro256PlusPlus, rand_core::SeedableRng};

use crate::optimization::{
    errors::OptError,
    solvers::{
        adapter::ModelProblem,
        run::{Progress, ProxIteration, start_param},
        traits::SolverOptions,
        types::{Cost, Grad, STEP_DECREASE, SolverState, Theta},
    },
};

#[derive(Debug, Clone)]
pub struct ProxSdca {
    l_l2sq: f64,
    n_samples: usize,
    epoch_size: usize,
    rng: Xoshiro256PlusPlus,
    alpha: Array2<f64>,
    v: Theta,
    progress: Progress,
}

impl ProxSdca {
    /// # Errors
    /// [`OptError::MissingL2Sq`] unless `opts.l_l2sq > 0`.
    pub fn new(opts: &SolverOptions, n_samples: usize) -> Result<Self, OptError> {
        if opts.l_l2sq <= 0.0 {
            return Err(OptError::MissingL2Sq);
        }
        Ok(Self {
            l_l2sq: opts.l_l2sq,
            n_samples,
            epoch_size: opts.epoch_size.unwrap_or(n_samples),
            rng: Xoshiro256PlusPlus::seed_from_u64(opts.seed),
            alpha: Array2::zeros((0, 0)),
            v: Theta::zeros(0),
            progress: Progress::new(opts),
        })
    }

    fn ridge(&self, x: &Theta) -> Cost {
        0.5 * self.l_l2sq * x.dot(x)
    }

    fn primal(&self, problem: &mut Problem<ModelProblem<'_>>) -> Result<Theta, Error> {
        let inv = 1.0 / self.l_l2sq;
        problem.problem("prox_count", |p| Ok(p.prox(&self.v, inv)))
    }

    /// Run one epoch in place; `None` when a sample's gradient is undefined.
    fn epoch(
        &mut self, problem: &mut Problem<ModelProblem<'_>>, x: &Theta, eta: f64,
    ) -> Result<Option<Theta>, Error> {
        let scale = eta * self.l_l2sq * self.n_samples as f64;
        let mut x = x.clone();
        let mut g = Grad::zeros(x.len());
        for _ in 0..self.epoch_size {
            let i = self.rng.gen_range(0..self.n_samples);
            let ok = problem.problem("grad_i_count", |p| Ok(p.trial_grad_i(i, &x, &mut g)?))?;
            if !ok {
                return Ok(None);
            }
            let mut alpha_i = self.alpha.index_axis_mut(Axis(0), i);
            let u = &g + &alpha_i;
            alpha_i.scaled_add(-scale, &u);
            self.v.scaled_add(-eta, &u);
            x = self.primal(problem)?;
        }
        Ok(Some(x))
    }
}

impl ProxIteration for ProxSdca {
    fn history(&self) -> &[Cost] {
        &self.progress.history
    }

    fn current_step(&self) -> f64 {
        self.progress.step
    }
}

impl<'a> argmin::core::Solver<ModelProblem<'a>, SolverState> for ProxSdca {
    const NAME: &'static str = "Dual-free proximal SDCA";

    fn init(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let x0 = start_param(&state)?.clone();
        self.alpha = Array2::zeros((self.n_samples, x0.len()));
        for mut row in self.alpha.rows_mut() {
            row.assign(&(&x0 * self.l_l2sq));
        }
        self.v = x0;
        let x = self.primal(problem)?;
        let cost = problem.cost(&x)? + self.ridge(&x);
        self.progress.start(cost);
        Ok((state.param(x).cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, mut state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let iter = state.get_iter();
        let prev_cost = state.get_cost();
        let x = state.take_param().ok_or_else(|| {
            Error::from(OptError::NotInitialized {
                text: "Solver state has no current iterate.".into(),
            })
        })?;
        let saved = (self.alpha.clone(), self.v.clone());

        let accepted = match self.epoch(problem, &x, self.progress.step)? {
            Some(z) => {
                let fz = problem.problem("loss_count", |p| Ok(p.trial_objective(&z)?))?;
                let fz = fz + self.ridge(&z);
                fz.is_finite().then_some((z, fz))
            }
            None => None,
        };
        let (next, cost) = match accepted {
            Some(found) => found,
            None => {
                (self.alpha, self.v) = saved;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hawkes::{
            core::{data::HawkesData, options::ModelOptions},
            models::leastsq::LeastSqModel,
        },
        optimization::{
            prox::Prox,
            solvers::{gradient::ProxAgd, run::run_solver, traits::SolverKind},
        },
    };
    use argmin::core::CostFunction;
    use ndarray::array;

    fn leastsq() -> LeastSqModel {
        let data = HawkesData::single(
            vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]],
            Some(5.65),
        )
        .expect("valid data");
        let mut model = LeastSqModel::exp(2.0, ModelOptions::default()).expect("valid");
        model.fit(&data).expect("fit succeeds");
        model
    }

    fn x0() -> Theta {
        array![0.5, 0.5, 0.1, 0.1, 0.1, 0.1]
    }

    #[test]
    // Purpose
    // -------
    // SDCA needs a positive ridge strength.
    fn sdca_requires_l2sq() {
        let opts = SolverOptions::new(SolverKind::Sdca, 0.02, 10).expect("valid");
        assert_eq!(ProxSdca::new(&opts, 2).expect_err("no ridge"), OptError::MissingL2Sq);
    }

    #[test]
    // Purpose
    // -------
    // SDCA reaches the minimum of the ridge-regularized objective.
    //
    // Given
    // -----
    // - Exponential least squares, λ = 0.1, step 0.02, 400 epochs.
    // - Reference: AGD on the same loss with an L2Sq(0.1) penalty.
    //
    // Expect
    // ------
    // - Objectives agree within 1e-3; history starts at F(x0) with the
    //   ridge term included.
    fn sdca_matches_ridge_reference() {
        let model = leastsq();
        let zero = Prox::zero();
        let ridge = Prox::l2sq(0.1).expect("valid");
        let agd_opts =
            SolverOptions::new(SolverKind::Agd, 1.0, 500).expect("valid").with_linesearch(true);
        let best =
            run_solver(x0(), &agd_opts, ModelProblem::new(&model, &ridge), ProxAgd::new(&agd_opts))
                .expect("reference solve")
                .objective;
        let opts = SolverOptions::new(SolverKind::Sdca, 0.02, 400)
            .expect("valid")
            .with_l_l2sq(0.1)
            .expect("valid ridge")
            .with_seed(5);

        let out = run_solver(
            x0(),
            &opts,
            ModelProblem::new(&model, &zero),
            ProxSdca::new(&opts, 2).expect("valid"),
        )
        .expect("solve succeeds");

        let start = ModelProblem::new(&model, &ridge).cost(&x0()).expect("cost");
        assert!((out.history[0] - start).abs() < 1e-12);
        assert!((out.objective - best).abs() < 1e-3);
    }
}
