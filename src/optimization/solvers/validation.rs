//! Validation helpers for the proximal solvers.
//!
//! - **Option checks**: [`verify_step`], [`verify_tol`], [`verify_l2sq`].
//! - **Inputs**: [`validate_start`] for the starting point.
//! - **Derivatives**: [`validate_grad`] for dimension and finiteness.
//! - **Outputs**: [`validate_solution`], [`validate_value`].
//!
//! All helpers report through dedicated [`OptError`] variants.
use crate::optimization::{
    errors::{OptError, OptResult},
    solvers::types::{Grad, Theta},
};

/// Step sizes must be finite and strictly positive.
pub fn verify_step(step: f64) -> OptResult<()> {
    if !step.is_finite() {
        return Err(OptError::InvalidStep { step, reason: "Step must be finite." });
    }
    if step <= 0.0 {
        return Err(OptError::InvalidStep { step, reason: "Step must be positive." });
    }
    Ok(())
}

/// Validate the optional relative objective tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTol`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTol { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTol { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// The SDCA ridge strength must be finite and non-negative; `0` means unset.
pub fn verify_l2sq(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidL2Sq { value, reason: "Strength must be finite." });
    }
    if value < 0.0 {
        return Err(OptError::InvalidL2Sq { value, reason: "Strength must be non-negative." });
    }
    Ok(())
}

/// Starting point must match the model dimension and be finite.
pub fn validate_start(x0: &Theta, dim: usize) -> OptResult<()> {
    if x0.len() != dim {
        return Err(OptError::StartLengthMismatch { expected: dim, found: x0.len() });
    }
    for (index, &value) in x0.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::NonFiniteStart { index, value });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] for the first non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap the final solution.
///
/// # Errors
/// - [`OptError::MissingSolution`] if no vector was provided.
/// - [`OptError::InvalidSolution`] if any element is non-finite.
pub fn validate_solution(solution: Option<Theta>) -> OptResult<Theta> {
    match solution {
        Some(x) => {
            for (index, &value) in x.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidSolution {
                        index,
                        value,
                        reason: "Solution entries must be finite.",
                    });
                }
            }
            Ok(x)
        }
        None => Err(OptError::MissingSolution),
    }
}

/// Objective values must be finite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Starting points are checked for length before finiteness.
    fn validate_start_reports_length_then_values() {
        assert_eq!(
            validate_start(&array![1.0], 2),
            Err(OptError::StartLengthMismatch { expected: 2, found: 1 })
        );
        match validate_start(&array![1.0, f64::NAN], 2).expect_err("NaN start") {
            OptError::NonFiniteStart { index, value } => {
                assert_eq!(index, 1);
                assert!(value.is_nan());
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Gradient validation flags the first non-finite entry.
    fn validate_grad_flags_non_finite_entries() {
        assert_eq!(validate_grad(&array![0.0, 1.0], 2), Ok(()));
        assert!(matches!(
            validate_grad(&array![0.0, f64::INFINITY], 2),
            Err(OptError::InvalidGradient { index: 1, .. })
        ));
    }
}
