//! Central finite-difference gradients of model losses.
//!
//! Used to cross-check analytic gradients: [`fd_gradient`] differentiates
//! `Model::loss` numerically and [`gradient_error`] reports the largest
//! deviation from `Model::grad`. Loss errors raised inside the
//! finite-difference closure are captured in a `RefCell` and returned after
//! the sweep instead of being swallowed as `NaN`.
use crate::{
    hawkes::models::traits::Model,
    optimization::{
        errors::{OptError, OptResult},
        solvers::{
            types::{Grad, Theta},
            validation::validate_grad,
        },
    },
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// Central-difference gradient of `model.loss` at `coeffs`.
///
/// # Errors
/// - The first model error raised while evaluating the loss (for example a
///   domain violation near the boundary).
/// - [`OptError::InvalidGradient`] if a difference quotient is non-finite.
pub fn fd_gradient(model: &dyn Model, coeffs: &Theta) -> OptResult<Grad> {
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let loss = |x: &Theta| -> f64 {
        match model.loss(x.view()) {
            Ok(value) => value,
            Err(err) => {
                closure_err.borrow_mut().get_or_insert(err.into());
                f64::NAN
            }
        }
    };
    let fd_grad = coeffs.central_diff(&loss);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, coeffs.len())?;
    Ok(fd_grad)
}

/// Largest absolute difference between the analytic and the
/// finite-difference gradient, scaled by `max(1, |fd|)` per coordinate.
pub fn gradient_error(model: &dyn Model, coeffs: &Theta) -> OptResult<f64> {
    let numeric = fd_gradient(model, coeffs)?;
    let mut analytic = Grad::zeros(coeffs.len());
    model.grad(coeffs.view(), &mut analytic)?;
    validate_grad(&analytic, coeffs.len())?;
    Ok(analytic
        .iter()
        .zip(numeric.iter())
        .map(|(a, n)| (a - n).abs() / n.abs().max(1.0))
        .fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hawkes::{
        core::{data::HawkesData, options::ModelOptions},
        errors::HawkesError,
        models::{HawkesModel, ModelKind},
    };
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Analytic gradients of every model variant agree with central finite
    // differences on a marked two-node realization, and loss errors inside
    // the sweep surface as errors.
    // -------------------------------------------------------------------------

    fn marked_data() -> HawkesData {
        HawkesData::single_with_marks(
            vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]],
            vec![0, 1, 2, 2, 0, 1, 1, 0, 2, 1, 0, 2],
            3,
            Some(5.0),
        )
        .expect("valid marked data")
    }

    fn coeffs(len: usize) -> Theta {
        Array1::from_iter((0..len).map(|k| 0.4 + 0.1 * (k % 5) as f64))
    }

    #[test]
    // Purpose
    // -------
    // Every model variant's gradient matches central differences.
    //
    // Given
    // -----
    // - Decays [1.5, 3.0], three mark states, positive coefficients.
    //
    // Expect
    // ------
    // - Scaled deviation below 1e-6 for all four variants.
    fn analytic_gradients_match_finite_differences() {
        let data = marked_data();
        for kind in
            [ModelKind::LogLik, ModelKind::LeastSq, ModelKind::CustomLogLik, ModelKind::CustomLeastSq]
        {
            let mut model =
                HawkesModel::new(kind, vec![1.5, 3.0], ModelOptions::default()).expect("valid");
            model.fit(&data).expect("fit succeeds");
            let x = coeffs(model.n_coeffs().expect("fitted"));

            let err = gradient_error(&model, &x).expect("gradient check");

            assert!(err < 1e-6, "{kind:?}: deviation {err}");
        }
    }

    #[test]
    // Purpose
    // -------
    // A loss error raised inside the sweep is returned, not hidden as NaN.
    fn fd_gradient_reports_loss_errors() {
        let data = marked_data();
        let mut model =
            HawkesModel::new(ModelKind::LogLik, vec![2.0], ModelOptions::default()).expect("valid");
        model.fit(&data).expect("fit succeeds");
        let x = array![-1.0, 0.5, 0.0, 0.0, 0.0, 0.0];

        match fd_gradient(&model, &x).expect_err("negative baseline") {
            OptError::Hawkes(HawkesError::NonPositiveIntensity { .. }) => {}
            other => panic!("Unexpected error: {other:?}"),
        }
    }
}
