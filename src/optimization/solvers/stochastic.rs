//! Stochastic proximal solvers over the per-node decomposition
//! `loss(x) = (1/n) Σ_i loss_i(x)`.
//!
//! Purpose
//! -------
//! - [`ProxSgd`]: proximal SGD with a `step / (k + 1)` schedule.
//! - [`ProxSvrg`]: proximal SVRG with an optional Barzilai–Borwein step.
//!
//! Key behaviors
//! -------------
//! - One argmin iteration is one epoch of `epoch_size` sampled updates
//!   (defaults to the number of nodes). Samples are drawn uniformly with a
//!   `Xoshiro256PlusPlus` generator seeded from the options, so runs are
//!   reproducible.
//! - An epoch that hits a point outside the model's domain, or ends with a
//!   non-finite objective, is rolled back to its starting iterate and the
//!   step is halved.
//!
//! Conventions
//! -----------
//! - The objective recorded per epoch is the full `F` at the epoch's last
//!   iterate.
use argmin::core::{Error, KV, Problem, State, TerminationStatus};
use ndarray::Zip;
use rand::Rng;
use rand_xoshiro::{Xoshiro256PlusPlus, rand_core::SeedableRng};

use crate::optimization::{
    errors::OptError,
    solvers::{
        adapter::ModelProblem,
        run::{Progress, ProxIteration, start_param},
        traits::{SolverOptions, StepType},
        types::{Cost, Grad, STEP_DECREASE, SolverState, Theta},
    },
};

/// Result of one pass of sampled updates.
enum Epoch {
    Accepted(Theta, Cost),
    Rejected,
}

fn missing_param() -> Error {
    OptError::NotInitialized { text: "Solver state has no current iterate.".into() }.into()
}

/// Evaluate `F` at the end of an epoch; `Rejected` outside the domain.
fn close_epoch(problem: &mut Problem<ModelProblem<'_>>, z: Theta) -> Result<Epoch, Error> {
    let fz = problem.problem("loss_count", |p| Ok(p.trial_objective(&z)?))?;
    Ok(if fz.is_finite() { Epoch::Accepted(z, fz) } else { Epoch::Rejected })
}

/// Proximal stochastic gradient descent.
#[derive(Debug, Clone)]
pub struct ProxSgd {
    n_samples: usize,
    epoch_size: usize,
    rng: Xoshiro256PlusPlus,
    progress: Progress,
}

impl ProxSgd {
    pub fn new(opts: &SolverOptions, n_samples: usize) -> Self {
        Self {
            n_samples,
            epoch_size: opts.epoch_size.unwrap_or(n_samples),
            rng: Xoshiro256PlusPlus::seed_from_u64(opts.seed),
            progress: Progress::new(opts),
        }
    }

    fn epoch(
        &mut self, problem: &mut Problem<ModelProblem<'_>>, x: &Theta, eta: f64,
    ) -> Result<Epoch, Error> {
        let mut z = x.clone();
        let mut g = Grad::zeros(x.len());
        for _ in 0..self.epoch_size {
            let i = self.rng.gen_range(0..self.n_samples);
            let ok = problem.problem("grad_i_count", |p| Ok(p.trial_grad_i(i, &z, &mut g)?))?;
            if !ok {
                return Ok(Epoch::Rejected);
            }
            z.scaled_add(-eta, &g);
            z = problem.problem("prox_count", |p| Ok(p.prox(&z, eta)))?;
        }
        close_epoch(problem, z)
    }
}

impl ProxIteration for ProxSgd {
    fn history(&self) -> &[Cost] {
        &self.progress.history
    }

    fn current_step(&self) -> f64 {
        self.progress.step
    }
}

impl<'a> argmin::core::Solver<ModelProblem<'a>, SolverState> for ProxSgd {
    const NAME: &'static str = "Proximal SGD";

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
        let eta = self.progress.step / (iter as f64 + 1.0);

        let (next, cost) = match self.epoch(problem, &x, eta)? {
            Epoch::Accepted(z, fz) => (z, fz),
            Epoch::Rejected => {
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

/// Snapshot of the variance-reduction anchor: `(x̃, ∇loss(x̃))`.
type Snapshot = (Theta, Grad);

/// Proximal stochastic variance-reduced gradient.
#[derive(Debug, Clone)]
pub struct ProxSvrg {
    n_samples: usize,
    epoch_size: usize,
    step_type: StepType,
    rng: Xoshiro256PlusPlus,
    previous: Option<Snapshot>,
    progress: Progress,
}

impl ProxSvrg {
    pub fn new(opts: &SolverOptions, n_samples: usize) -> Self {
        Self {
            n_samples,
            epoch_size: opts.epoch_size.unwrap_or(n_samples),
            step_type: opts.step_type,
            rng: Xoshiro256PlusPlus::seed_from_u64(opts.seed),
            previous: None,
            progress: Progress::new(opts),
        }
    }

    /// `||s||² / (m · s·y)` between consecutive snapshots, when the
    /// curvature estimate is positive.
    fn barzilai_borwein(&self, anchor: &Snapshot) -> Option<f64> {
        let (prev_x, prev_mu) = self.previous.as_ref()?;
        let s = &anchor.0 - prev_x;
        let y = &anchor.1 - prev_mu;
        let sy = s.dot(&y);
        let step = s.dot(&s) / (self.epoch_size as f64 * sy);
        (sy > 0.0 && step.is_finite() && step > 0.0).then_some(step)
    }

    fn epoch(
        &mut self, problem: &mut Problem<ModelProblem<'_>>, anchor: &Snapshot, step: f64,
    ) -> Result<Epoch, Error> {
        let (x_tilde, mu) = anchor;
        let mut z = x_tilde.clone();
        let mut g_z = Grad::zeros(z.len());
        let mut g_tilde = Grad::zeros(z.len());
        for _ in 0..self.epoch_size {
            let i = self.rng.gen_range(0..self.n_samples);
            let ok = problem.problem("grad_i_count", |p| {
                Ok(p.trial_grad_i(i, &z, &mut g_z)? && p.trial_grad_i(i, x_tilde, &mut g_tilde)?)
            })?;
            if !ok {
                return Ok(Epoch::Rejected);
            }
            Zip::from(&mut z).and(&g_z).and(&g_tilde).and(mu).for_each(|z, &a, &b, &m| {
                *z -= step * (a - b + m);
            });
            z = problem.problem("prox_count", |p| Ok(p.prox(&z, step)))?;
        }
        close_epoch(problem, z)
    }
}

impl ProxIteration for ProxSvrg {
    fn history(&self) -> &[Cost] {
        &self.progress.history
    }

    fn current_step(&self) -> f64 {
        self.progress.step
    }
}

impl<'a> argmin::core::Solver<ModelProblem<'a>, SolverState> for ProxSvrg {
    const NAME: &'static str = "Proximal SVRG";

    fn init(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let cost = problem.cost(start_param(&state)?)?;
        self.previous = None;
        self.progress.start(cost);
        Ok((state.cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<ModelProblem<'a>>, mut state: SolverState,
    ) -> Result<(SolverState, Option<KV>), Error> {
        let iter = state.get_iter();
        let prev_cost = state.get_cost();
        let x = state.take_param().ok_or_else(missing_param)?;
        let mu = problem.gradient(&x)?;
        let anchor = (x, mu);

        if self.step_type == StepType::BarzilaiBorwein {
            if let Some(step) = self.barzilai_borwein(&anchor) {
                self.progress.step = step;
            }
        }

        let (next, cost) = match self.epoch(problem, &anchor, self.progress.step)? {
            Epoch::Accepted(z, fz) => {
                self.previous = Some(anchor);
                (z, fz)
            }
            Epoch::Rejected => {
                self.previous = None;
                self.progress.shrink_step(STEP_DECREASE);
                (anchor.0, prev_cost)
            }
        };

        self.progress.finish_iter(iter, cost);
        Ok((state.param(next).cost(cost), None))
    }

    fn terminate(&mut self, _state: &SolverState) -> TerminationStatus {
        self.progress.termination()
    }
}
