//! Errors for the proximal solver layer (configuration, solver state,
//! numerical failures, and wrapped argmin/model errors).
//!
//! [`OptError`] is the single error surface of `optimization`: solver and
//! prox configuration problems are reported at construction or parse time,
//! model failures arrive wrapped as [`OptError::Hawkes`], and argmin errors
//! are unwrapped back into `OptError` whenever they originated here.
use argmin::core::{ArgminError, Error};

use crate::hawkes::errors::HawkesError;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Crate-wide result alias for solver operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch { expected: usize, found: usize },

    /// Gradient elements need to be finite.
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- SolverOptions ----
    /// Unknown solver name.
    InvalidSolver { name: String, reason: &'static str },

    /// Unknown step-type name.
    InvalidStepType { name: String, reason: &'static str },

    /// Step size needs to be positive and finite.
    InvalidStep { step: f64, reason: &'static str },

    /// Maximum iterations needs to be positive.
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    /// Relative objective tolerance needs to be positive and finite.
    InvalidTol { tol: f64, reason: &'static str },

    /// Recording/printing periods and epoch sizes need to be positive.
    InvalidPeriod { name: &'static str, value: usize },

    /// L2 strength of SDCA needs to be finite and non-negative.
    InvalidL2Sq { value: f64, reason: &'static str },

    /// SDCA needs a strictly positive L2 strength.
    MissingL2Sq,

    // ---- Prox ----
    /// Unknown prox name.
    InvalidProx { name: String, reason: &'static str },

    /// Penalty strength needs to be finite and non-negative.
    InvalidStrength { strength: f64 },

    /// Elastic-net ratio must lie in [0, 1].
    InvalidRatio { ratio: f64 },

    /// Box bounds must satisfy lower <= upper and not be NaN.
    InvalidBox { lower: f64, upper: f64 },

    /// Coordinate range is empty or exceeds the parameter dimension.
    InvalidRange { start: usize, end: usize, dim: usize },

    // ---- Solver state ----
    /// `solve` was called before `set_model`.
    ModelNotSet,

    /// `solve` was called before `set_prox`.
    ProxNotSet,

    /// Starting point has the wrong length.
    StartLengthMismatch { expected: usize, found: usize },

    /// Starting point needs finite entries.
    NonFiniteStart { index: usize, value: f64 },

    // ---- Cost function ----
    /// Objective is not finite at a point the solver must evaluate.
    NonFiniteCost { value: f64 },

    /// Line search could not find an admissible step.
    LineSearchFailed { step: f64 },

    // ---- Solver outcome ----
    /// Solution entries must be finite.
    InvalidSolution { index: usize, value: f64, reason: &'static str },

    /// Solution is missing from the final solver state.
    MissingSolution,

    // ---- Model ----
    /// Error raised by the model during evaluation.
    Hawkes(HawkesError),

    // ---- Argmin ---
    /// Wrapper for argmin::InvalidParameter
    InvalidParameter { text: String },
    /// Wrapper for argmin::NotImplemented
    NotImplemented { text: String },
    /// Wrapper for argmin::NotInitialized
    NotInitialized { text: String },
    /// Wrapper for argmin::ConditionViolated
    ConditionViolated { text: String },
    /// Wrapper for argmin::CheckPointNotFound
    CheckPointNotFound { text: String },
    /// Wrapper for argmin::PotentialBug
    PotentialBug { text: String },
    /// Wrapper for argmin::ImpossibleError
    ImpossibleError { text: String },
    /// Wrapper for other argmin::Error types
    BackendError { text: String },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- SolverOptions ----
            OptError::InvalidSolver { name, reason } => {
                write!(f, "Invalid solver '{name}': {reason}")
            }
            OptError::InvalidStepType { name, reason } => {
                write!(f, "Invalid step type '{name}': {reason}")
            }
            OptError::InvalidStep { step, reason } => {
                write!(f, "Invalid step size {step}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::InvalidTol { tol, reason } => {
                write!(f, "Invalid relative objective tolerance {tol}: {reason}")
            }
            OptError::InvalidPeriod { name, value } => {
                write!(f, "Option {name} must be greater than zero; got {value}")
            }
            OptError::InvalidL2Sq { value, reason } => {
                write!(f, "Invalid L2 strength {value}: {reason}")
            }
            OptError::MissingL2Sq => {
                write!(f, "SDCA requires a strictly positive l_l2sq")
            }

            // ---- Prox ----
            OptError::InvalidProx { name, reason } => {
                write!(f, "Invalid prox '{name}': {reason}")
            }
            OptError::InvalidStrength { strength } => {
                write!(f, "Invalid penalty strength {strength}: must be finite and >= 0")
            }
            OptError::InvalidRatio { ratio } => {
                write!(f, "Invalid elastic-net ratio {ratio}: must lie in [0, 1]")
            }
            OptError::InvalidBox { lower, upper } => {
                write!(f, "Invalid box bounds [{lower}, {upper}]: need lower <= upper")
            }
            OptError::InvalidRange { start, end, dim } => {
                write!(f, "Invalid coordinate range [{start}, {end}) for dimension {dim}")
            }

            // ---- Solver state ----
            OptError::ModelNotSet => write!(f, "No model set; call set_model before solve"),
            OptError::ProxNotSet => write!(f, "No prox set; call set_prox before solve"),
            OptError::StartLengthMismatch { expected, found } => {
                write!(f, "Starting point has length {found}, expected {expected}")
            }
            OptError::NonFiniteStart { index, value } => {
                write!(f, "Starting point at index {index} must be finite; got {value}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite objective value: {value}")
            }
            OptError::LineSearchFailed { step } => {
                write!(f, "Line search failed; step shrank to {step}")
            }

            // ---- Solver outcome ----
            OptError::InvalidSolution { index, value, reason } => {
                write!(f, "Invalid solution at index {index}: {value}: {reason}")
            }
            OptError::MissingSolution => write!(f, "Missing solution in final solver state"),

            // ---- Model ----
            OptError::Hawkes(err) => write!(f, "Model error: {err}"),

            // ---- Argmin ----
            OptError::InvalidParameter { text } => {
                write!(f, "Invalid parameter: {text}")
            }
            OptError::NotImplemented { text } => {
                write!(f, "Not implemented: {text}")
            }
            OptError::NotInitialized { text } => {
                write!(f, "Not initialized: {text}")
            }
            OptError::ConditionViolated { text } => {
                write!(f, "Condition violated: {text}")
            }
            OptError::CheckPointNotFound { text } => {
                write!(f, "Checkpoint not found: {text}")
            }
            OptError::PotentialBug { text } => {
                write!(f, "Potential bug: {text}")
            }
            OptError::ImpossibleError { text } => {
                write!(f, "Impossible error: {text}")
            }
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Fallback ----
            OptError::UnknownError => {
                write!(f, "Unknown error")
            }
        }
    }
}

impl From<HawkesError> for OptError {
    fn from(err: HawkesError) -> Self {
        OptError::Hawkes(err)
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        let original_err = match original_err.downcast::<HawkesError>() {
            Ok(hawkes_err) => return OptError::Hawkes(hawkes_err),
            Err(err) => err,
        };
        match original_err.downcast() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

/// Convert an [`OptError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<OptError> for PyErr {
    fn from(err: OptError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Errors that travel through argmin come back as the original variant.
    //
    // Given
    // -----
    // - An `OptError` and a `HawkesError` boxed into `argmin::core::Error`.
    //
    // Expect
    // ------
    // - Both convert back without losing their payload.
    fn argmin_error_round_trips_to_original_variant() {
        let boxed: Error = OptError::MissingL2Sq.into();
        assert_eq!(OptError::from(boxed), OptError::MissingL2Sq);

        let model_err = HawkesError::NonPositiveIntensity { node: 1, value: -0.5 };
        let boxed: Error = model_err.clone().into();
        assert_eq!(OptError::from(boxed), OptError::Hawkes(model_err));
    }

    #[test]
    // Purpose
    // -------
    // Native argmin errors map onto their wrappers.
    fn argmin_native_error_maps_to_wrapper() {
        let boxed: Error = ArgminError::NotInitialized { text: "no param".to_string() }.into();

        assert_eq!(
            OptError::from(boxed),
            OptError::NotInitialized { text: "no param".to_string() }
        );
    }
}
