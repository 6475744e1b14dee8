//! Adapter that exposes a fitted [`Model`] plus a [`Prox`] as an argmin
//! problem.
//!
//! - `CostFunction::cost` returns the composite objective
//!   `F(x) = loss(x) + g(x)`, which is what argmin tracks and the observer
//!   prints.
//! - `Gradient::gradient` returns the gradient of the smooth part only.
//! - Inherent methods give the solvers access to the smooth loss, the
//!   per-node terms and the proximal operator; solvers call them through
//!   `Problem::problem` so each kind of evaluation is counted.
//!
//! Points where a log-likelihood is undefined (non-positive intensity or
//! multiplier) are not errors for trial evaluations: [`ModelProblem::trial_loss`]
//! reports them as `+∞` so line searches and rollbacks can step back.
use argmin::core::{CostFunction, Error, Gradient};

use crate::{
    hawkes::{errors::HawkesError, models::traits::Model},
    optimization::{
        errors::{OptError, OptResult},
        prox::Prox,
        solvers::{
            types::{Cost, Grad, Theta},
            validation::validate_grad,
        },
    },
};

/// Bridges a fitted model and a penalty to argmin.
#[derive(Clone, Copy)]
pub struct ModelProblem<'a> {
    pub model: &'a dyn Model,
    pub prox: &'a Prox,
}

impl<'a> ModelProblem<'a> {
    pub fn new(model: &'a dyn Model, prox: &'a Prox) -> Self {
        Self { model, prox }
    }

    pub fn dim(&self) -> OptResult<usize> {
        Ok(self.model.n_coeffs()?)
    }

    pub fn n_samples(&self) -> OptResult<usize> {
        Ok(self.model.n_samples()?)
    }

    /// Smooth part `loss(x)`.
    pub fn loss(&self, x: &Theta) -> OptResult<Cost> {
        let value = self.model.loss(x.view())?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        Ok(value)
    }

    /// Smooth part at a trial point; domain violations map to `+∞`.
    pub fn trial_loss(&self, x: &Theta) -> OptResult<Cost> {
        match self.model.loss(x.view()) {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(_) => Ok(f64::INFINITY),
            Err(err) if is_domain_error(&err) => Ok(f64::INFINITY),
            Err(err) => Err(err.into()),
        }
    }

    /// Penalty value `g(x)`.
    pub fn penalty(&self, x: &Theta) -> Cost {
        self.prox.value(x.view())
    }

    /// Composite objective at a trial point; `+∞` outside the domain.
    pub fn trial_objective(&self, x: &Theta) -> OptResult<Cost> {
        Ok(self.trial_loss(x)? + self.penalty(x))
    }

    /// Gradient of the smooth part.
    pub fn grad(&self, x: &Theta) -> OptResult<Grad> {
        let mut out = Grad::zeros(x.len());
        self.model.grad(x.view(), &mut out)?;
        validate_grad(&out, x.len())?;
        Ok(out)
    }

    /// Gradient of the smooth part, or `None` outside the domain.
    pub fn trial_grad(&self, x: &Theta) -> OptResult<Option<Grad>> {
        match self.grad(x) {
            Ok(g) => Ok(Some(g)),
            Err(OptError::Hawkes(err)) if is_domain_error(&err) => Ok(None),
            Err(OptError::InvalidGradient { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Gradient of per-node term `i` written into `out`, or `false` outside
    /// the domain.
    pub fn trial_grad_i(&self, i: usize, x: &Theta, out: &mut Grad) -> OptResult<bool> {
        match self.model.grad_i(i, x.view(), out) {
            Ok(_) => Ok(out.iter().all(|v| v.is_finite())),
            Err(err) if is_domain_error(&err) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Proximal step `prox_{step·g}(x)`.
    pub fn prox(&self, x: &Theta, step: f64) -> Theta {
        self.prox.call(x.view(), step)
    }
}

impl<'a> CostFunction for ModelProblem<'a> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `F(x) = loss(x) + g(x)`.
    ///
    /// # Errors
    /// Model errors (including domain violations) propagate; this is only
    /// called on points the solver has accepted.
    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.loss(x)? + self.prox.value(x.view()))
    }
}

impl<'a> Gradient for ModelProblem<'a> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.grad(x)?)
    }
}

/// Model errors that mean "this point is outside the model's domain".
pub fn is_domain_error(err: &HawkesError) -> bool {
    matches!(
        err,
        HawkesError::NonPositiveIntensity { .. } | HawkesError::NonPositiveMarkFactor { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hawkes::{
        core::{data::HawkesData, options::ModelOptions},
        models::loglik::LogLikModel,
    };
    use approx::assert_relative_eq;
    use ndarray::array;

    fn fitted() -> LogLikModel {
        let data = HawkesData::single(
            vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]],
            None,
        )
        .expect("valid data");
        let mut model = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid");
        model.fit(&data).expect("fit succeeds");
        model
    }

    #[test]
    // Purpose
    // -------
    // The argmin cost is the smooth loss plus the penalty.
    fn cost_adds_penalty_to_loss() {
        let model = fitted();
        let prox = Prox::l1(0.1).expect("valid");
        let problem = ModelProblem::new(&model, &prox);
        let x = array![1.0, 3.0, 2.0, 3.0, 4.0, 1.0];

        let cost = problem.cost(&x).expect("cost");

        assert_relative_eq!(cost, model.loss(x.view()).expect("loss") + 0.1 * 14.0);
    }

    #[test]
    // Purpose
    // -------
    // Trial evaluations map domain violations to +∞ / None while plain
    // evaluations keep the model error.
    fn trial_evaluations_absorb_domain_errors() {
        let model = fitted();
        let prox = Prox::zero();
        let problem = ModelProblem::new(&model, &prox);
        let bad = array![-1.0, 0.5, 0.0, 0.0, 0.0, 0.0];

        assert_eq!(problem.trial_loss(&bad), Ok(f64::INFINITY));
        assert_eq!(problem.trial_grad(&bad), Ok(None));
        assert!(matches!(
            problem.loss(&bad),
            Err(OptError::Hawkes(HawkesError::NonPositiveIntensity { node: 0, .. }))
        ));
        assert!(matches!(
            problem.trial_loss(&array![1.0]),
            Err(OptError::Hawkes(HawkesError::CoeffsLengthMismatch { .. }))
        ));
    }
}
