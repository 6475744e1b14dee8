//! Errors for Hawkes simulation and models (data validation, mark-state
//! checks, kernel construction, thinning failures, and model evaluation).
//!
//! This module defines a single error type, [`HawkesError`], used across the
//! Python-facing API and the internal Rust core. It implements
//! `Display`/`Error` and converts to `PyErr` for PyO3 when the
//! `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy). `realization` indexes the
//!   realization list, `node` the component, `index` the position inside the
//!   per-node timestamp array or the merged `global_n` sequence.
//! - Timestamps must be **finite, non-negative, and strictly increasing**
//!   within a node.
//! - Shape problems (ragged nodes, misaligned mark sequences, wrong parameter
//!   lengths) are always reported; nothing is truncated or padded.
use statrs::distribution::ExpError;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

/// Result alias for Hawkes operations that may produce [`HawkesError`].
pub type HawkesResult<T> = Result<T, HawkesError>;

/// Unified error type for Hawkes simulation, data handling, and models.
#[derive(Debug, Clone, PartialEq)]
pub enum HawkesError {
    // ---- Input/data validation ----
    /// A realization must have at least one node.
    NoNodes,

    /// A realization list must contain at least one realization.
    NoRealizations,

    /// A timestamp is NaN/±inf.
    NonFiniteTimestamp { realization: usize, node: usize, index: usize, value: f64 },

    /// A timestamp is negative.
    NegativeTimestamp { realization: usize, node: usize, index: usize, value: f64 },

    /// Timestamps of a node are not strictly increasing.
    NonIncreasingTimestamps {
        realization: usize,
        node: usize,
        index: usize,
        previous: f64,
        value: f64,
    },

    /// All realizations must share the same number of nodes.
    NodeCountMismatch { realization: usize, expected: usize, found: usize },

    /// Per-realization end times must match the number of realizations.
    EndTimesLengthMismatch { expected: usize, found: usize },

    /// End time must be finite and non-negative.
    InvalidEndTime { realization: usize, value: f64, reason: &'static str },

    /// An event occurs after the end time of its realization.
    EventAfterEndTime { realization: usize, node: usize, time: f64, end_time: f64 },

    /// Fitting requires at least one event across all realizations.
    NoEvents,

    // ---- Mark states ----
    /// Mark-aware models require a `global_n` sequence per realization.
    MissingMarks,

    /// Mark sequences must be provided for each realization.
    MarksCountMismatch { expected: usize, found: usize },

    /// `global_n` must have one entry per event plus the leading sentinel.
    MarksLengthMismatch { realization: usize, expected: usize, found: usize },

    /// A mark state is outside `[0, n_states)`.
    MarkStateOutOfRange { realization: usize, index: usize, state: usize, n_states: usize },

    /// The number of mark states must be at least one.
    InvalidNStates { n_states: usize },

    /// Mark table must have shape `(n_nodes, n_states)`.
    MarkTableShape { expected: (usize, usize), found: (usize, usize) },

    /// Mark factors must be finite and non-negative.
    InvalidMarkFactor { node: usize, state: usize, value: f64 },

    /// Transition table entries must be valid states.
    InvalidTransition { state: usize, node: usize, next: usize, n_states: usize },

    /// Transition table must have shape `(n_states, n_nodes)`.
    TransitionTableShape { expected: (usize, usize), found: (usize, usize) },

    /// Queue-size mark dynamics are misconfigured.
    InvalidQueueDynamics { value: f64, reason: &'static str },

    /// Queue-size order sizes must match the number of nodes.
    OrderSizesLengthMismatch { expected: usize, found: usize },

    // ---- Kernels ----
    /// A kernel parameter is invalid.
    InvalidKernelParam { param: &'static str, value: f64, reason: &'static str },

    /// Sum-of-exponentials kernels need as many intensities as decays.
    SumExpLengthMismatch { intensities: usize, decays: usize },

    /// Kernel matrix must be square with one row per node.
    KernelMatrixShape { expected: (usize, usize), found: (usize, usize) },

    /// Baselines must have one entry per node.
    BaselineLengthMismatch { expected: usize, found: usize },

    /// Baselines must be finite and non-negative.
    InvalidBaseline { node: usize, value: f64 },

    /// Model decays must be finite and strictly positive.
    InvalidDecay { index: usize, value: f64 },

    /// Models need at least one decay.
    NoDecays,

    // ---- Simulation ----
    /// A simulation option is invalid.
    InvalidSimOption { name: &'static str, value: f64, reason: &'static str },

    /// Thinning met a negative intensity.
    NegativeIntensity { node: usize, time: f64, value: f64 },

    /// The branching structure is explosive.
    Explosive { spectral_radius: f64 },

    /// Invalid exponential distribution parameter.
    InvalidExpParam,

    // ---- Models ----
    /// Model must be fitted before evaluation.
    ModelNotFitted,

    /// Coefficient vector has the wrong length.
    CoeffsLengthMismatch { expected: usize, found: usize },

    /// Output buffer has the wrong length.
    OutLengthMismatch { expected: usize, found: usize },

    /// A coefficient is NaN/±inf.
    NonFiniteCoeff { index: usize, value: f64 },

    /// Intensity inside a logarithm must be strictly positive.
    NonPositiveIntensity { node: usize, value: f64 },

    /// Mark multiplier for a visited state must be strictly positive.
    NonPositiveMarkFactor { node: usize, state: usize, value: f64 },

    /// Sample index for per-node losses is out of range.
    SampleOutOfRange { index: usize, n_samples: usize },

    /// Number of threads must be at least one.
    InvalidThreads { n_threads: usize },

    /// The worker pool could not be created.
    ThreadPool { text: String },

    /// Unrecognized model variant name.
    UnknownModel { name: String },

    // ---- Normalization ----
    /// Rescaling needs a non-zero multiplier for state 0.
    ZeroMarkMultiplier { node: usize },

    // ---- Fallback ----
    UnknownError,
}

impl std::error::Error for HawkesError {}

impl std::fmt::Display for HawkesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input/data validation ----
            HawkesError::NoNodes => write!(f, "A realization must contain at least one node."),
            HawkesError::NoRealizations => {
                write!(f, "At least one realization is required.")
            }
            HawkesError::NonFiniteTimestamp { realization, node, index, value } => {
                write!(
                    f,
                    "Non-finite timestamp in realization {realization}, node {node}, index {index}: {value}"
                )
            }
            HawkesError::NegativeTimestamp { realization, node, index, value } => {
                write!(
                    f,
                    "Negative timestamp in realization {realization}, node {node}, index {index}: {value}"
                )
            }
            HawkesError::NonIncreasingTimestamps { realization, node, index, previous, value } => {
                write!(
                    f,
                    "Timestamps must be strictly increasing; realization {realization}, node {node}, \
                     index {index}: {value} follows {previous}"
                )
            }
            HawkesError::NodeCountMismatch { realization, expected, found } => {
                write!(
                    f,
                    "Realization {realization} has {found} nodes, expected {expected}"
                )
            }
            HawkesError::EndTimesLengthMismatch { expected, found } => {
                write!(f, "Expected {expected} end times (one per realization), got {found}")
            }
            HawkesError::InvalidEndTime { realization, value, reason } => {
                write!(f, "Invalid end time {value} for realization {realization}: {reason}")
            }
            HawkesError::EventAfterEndTime { realization, node, time, end_time } => {
                write!(
                    f,
                    "Event at {time} on node {node} of realization {realization} is after end time {end_time}"
                )
            }
            HawkesError::NoEvents => {
                write!(f, "Cannot fit a model on realizations without any event.")
            }

            // ---- Mark states ----
            HawkesError::MissingMarks => {
                write!(f, "This model requires a global_n mark sequence for every realization.")
            }
            HawkesError::MarksCountMismatch { expected, found } => {
                write!(f, "Expected {expected} mark sequences (one per realization), got {found}")
            }
            HawkesError::MarksLengthMismatch { realization, expected, found } => {
                write!(
                    f,
                    "global_n of realization {realization} has length {found}, expected {expected} \
                     (number of events + 1)"
                )
            }
            HawkesError::MarkStateOutOfRange { realization, index, state, n_states } => {
                write!(
                    f,
                    "Mark state {state} at index {index} of realization {realization} is outside [0, {n_states})"
                )
            }
            HawkesError::InvalidNStates { n_states } => {
                write!(f, "Number of mark states must be >= 1; got {n_states}")
            }
            HawkesError::MarkTableShape { expected, found } => {
                write!(f, "Mark table shape mismatch: expected {expected:?}, found {found:?}")
            }
            HawkesError::InvalidMarkFactor { node, state, value } => {
                write!(
                    f,
                    "Mark factor for node {node}, state {state} must be finite and >= 0; got {value}"
                )
            }
            HawkesError::InvalidTransition { state, node, next, n_states } => {
                write!(
                    f,
                    "Transition from state {state} on node {node} leads to {next}, outside [0, {n_states})"
                )
            }
            HawkesError::TransitionTableShape { expected, found } => {
                write!(f, "Transition table shape mismatch: expected {expected:?}, found {found:?}")
            }
            HawkesError::InvalidQueueDynamics { value, reason } => {
                write!(f, "Invalid queue-size mark dynamics ({value}): {reason}")
            }
            HawkesError::OrderSizesLengthMismatch { expected, found } => {
                write!(f, "Expected {expected} order sizes (one per node), got {found}")
            }

            // ---- Kernels ----
            HawkesError::InvalidKernelParam { param, value, reason } => {
                write!(f, "Invalid kernel parameter {param} = {value}: {reason}")
            }
            HawkesError::SumExpLengthMismatch { intensities, decays } => {
                write!(
                    f,
                    "Sum-of-exponentials kernel has {intensities} intensities but {decays} decays"
                )
            }
            HawkesError::KernelMatrixShape { expected, found } => {
                write!(f, "Kernel matrix shape mismatch: expected {expected:?}, found {found:?}")
            }
            HawkesError::BaselineLengthMismatch { expected, found } => {
                write!(f, "Expected {expected} baselines (one per node), got {found}")
            }
            HawkesError::InvalidBaseline { node, value } => {
                write!(f, "Baseline of node {node} must be finite and >= 0; got {value}")
            }
            HawkesError::InvalidDecay { index, value } => {
                write!(f, "Decay at index {index} must be finite and > 0; got {value}")
            }
            HawkesError::NoDecays => write!(f, "At least one decay is required."),

            // ---- Simulation ----
            HawkesError::InvalidSimOption { name, value, reason } => {
                write!(f, "Invalid simulation option {name} = {value}: {reason}")
            }
            HawkesError::NegativeIntensity { node, time, value } => {
                write!(
                    f,
                    "Negative intensity {value} on node {node} at time {time}; check kernels and mark factors"
                )
            }
            HawkesError::Explosive { spectral_radius } => {
                write!(
                    f,
                    "Spectral radius of the kernel norms is {spectral_radius} >= 1; the process explodes. \
                     Set max_jumps or force_simulation to simulate anyway"
                )
            }
            HawkesError::InvalidExpParam => {
                write!(f, "Exponential distribution requires rate > 0.")
            }

            // ---- Models ----
            HawkesError::ModelNotFitted => write!(f, "Model hasn't been fitted yet."),
            HawkesError::CoeffsLengthMismatch { expected, found } => {
                write!(f, "Coefficient vector has length {found}, expected {expected}")
            }
            HawkesError::OutLengthMismatch { expected, found } => {
                write!(f, "Output buffer has length {found}, expected {expected}")
            }
            HawkesError::NonFiniteCoeff { index, value } => {
                write!(f, "Coefficient at index {index} must be finite; got {value}")
            }
            HawkesError::NonPositiveIntensity { node, value } => {
                write!(
                    f,
                    "Intensity of node {node} at one of its events is {value} <= 0; \
                     a positivity constraint on the prox is probably missing"
                )
            }
            HawkesError::NonPositiveMarkFactor { node, state, value } => {
                write!(
                    f,
                    "Mark multiplier of node {node} for visited state {state} is {value} <= 0"
                )
            }
            HawkesError::SampleOutOfRange { index, n_samples } => {
                write!(f, "Sample index {index} is outside [0, {n_samples})")
            }
            HawkesError::InvalidThreads { n_threads } => {
                write!(f, "Number of threads must be >= 1; got {n_threads}")
            }
            HawkesError::ThreadPool { text } => write!(f, "Failed to build thread pool: {text}"),
            HawkesError::UnknownModel { name } => write!(
                f,
                "Unknown model '{name}'; expected loglik, leastsq, custom_loglik or custom_leastsq"
            ),

            // ---- Normalization ----
            HawkesError::ZeroMarkMultiplier { node } => {
                write!(f, "Mark multiplier of node {node} at state 0 is zero; cannot rescale")
            }

            // ---- Fallback ----
            HawkesError::UnknownError => write!(f, "An unknown error occurred."),
        }
    }
}

impl From<ExpError> for HawkesError {
    fn from(_: ExpError) -> HawkesError {
        HawkesError::InvalidExpParam
    }
}

impl From<rayon::ThreadPoolBuildError> for HawkesError {
    fn from(err: rayon::ThreadPoolBuildError) -> HawkesError {
        HawkesError::ThreadPool { text: err.to_string() }
    }
}

/// Convert a [`HawkesError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<HawkesError> for PyErr {
    fn from(err: HawkesError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Check that shape errors carry their indices into the rendered message.
    //
    // Given
    // -----
    // - A `MarksLengthMismatch` for realization 2.
    //
    // Expect
    // ------
    // - The message mentions the realization and both lengths.
    fn marks_length_mismatch_message_mentions_lengths() {
        let err = HawkesError::MarksLengthMismatch { realization: 2, expected: 11, found: 10 };

        let msg = err.to_string();

        assert!(msg.contains("realization 2"));
        assert!(msg.contains("11"));
        assert!(msg.contains("10"));
    }

    #[test]
    // Purpose
    // -------
    // `statrs` exponential errors map onto the dedicated variant.
    fn exp_error_maps_to_invalid_exp_param() {
        let err: HawkesError = ExpError::RateInvalid.into();
        assert_eq!(err, HawkesError::InvalidExpParam);
    }
}
