//! Validation helpers for Hawkes data, parameters, and options.
//!
//! All checks return [`HawkesResult`] and never panic on invalid inputs.
use ndarray::{Array1, ArrayView1};

use crate::hawkes::errors::{HawkesError, HawkesResult};

/// Timestamps of one node must be finite, non-negative, and strictly
/// increasing.
///
/// # Errors
/// - [`HawkesError::NonFiniteTimestamp`], [`HawkesError::NegativeTimestamp`],
///   or [`HawkesError::NonIncreasingTimestamps`] for the first offending
///   entry.
pub fn validate_timestamps(
    timestamps: ArrayView1<f64>, realization: usize, node: usize,
) -> HawkesResult<()> {
    let mut previous = f64::NEG_INFINITY;
    for (index, &value) in timestamps.iter().enumerate() {
        if !value.is_finite() {
            return Err(HawkesError::NonFiniteTimestamp { realization, node, index, value });
        }
        if value < 0.0 {
            return Err(HawkesError::NegativeTimestamp { realization, node, index, value });
        }
        if value <= previous {
            return Err(HawkesError::NonIncreasingTimestamps {
                realization,
                node,
                index,
                previous,
                value,
            });
        }
        previous = value;
    }
    Ok(())
}

/// An end time must be finite, non-negative, and not precede the last event.
pub fn validate_end_time(end_time: f64, last_event: f64, realization: usize) -> HawkesResult<()> {
    if !end_time.is_finite() {
        return Err(HawkesError::InvalidEndTime {
            realization,
            value: end_time,
            reason: "must be finite",
        });
    }
    if end_time < 0.0 {
        return Err(HawkesError::InvalidEndTime {
            realization,
            value: end_time,
            reason: "must be non-negative",
        });
    }
    if last_event > end_time {
        return Err(HawkesError::InvalidEndTime {
            realization,
            value: end_time,
            reason: "must not precede the last event",
        });
    }
    Ok(())
}

/// `global_n` must hold `n_events + 1` states, each below `n_states`.
pub fn validate_global_n(
    global_n: &[usize], n_events: usize, n_states: usize, realization: usize,
) -> HawkesResult<()> {
    if global_n.len() != n_events + 1 {
        return Err(HawkesError::MarksLengthMismatch {
            realization,
            expected: n_events + 1,
            found: global_n.len(),
        });
    }
    if let Some((index, &state)) = global_n.iter().enumerate().find(|(_, s)| **s >= n_states) {
        return Err(HawkesError::MarkStateOutOfRange { realization, index, state, n_states });
    }
    Ok(())
}

/// Baselines must have one finite, non-negative entry per node.
pub fn validate_baselines(baselines: &Array1<f64>, n_nodes: usize) -> HawkesResult<()> {
    if baselines.len() != n_nodes {
        return Err(HawkesError::BaselineLengthMismatch {
            expected: n_nodes,
            found: baselines.len(),
        });
    }
    for (node, &value) in baselines.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(HawkesError::InvalidBaseline { node, value });
        }
    }
    Ok(())
}

/// Model decays must be non-empty, finite, and strictly positive.
pub fn validate_decays(decays: &[f64]) -> HawkesResult<()> {
    if decays.is_empty() {
        return Err(HawkesError::NoDecays);
    }
    for (index, &value) in decays.iter().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(HawkesError::InvalidDecay { index, value });
        }
    }
    Ok(())
}

/// Coefficient vector must have the model's length and finite entries.
pub fn validate_coeffs(coeffs: ArrayView1<f64>, expected: usize) -> HawkesResult<()> {
    if coeffs.len() != expected {
        return Err(HawkesError::CoeffsLengthMismatch { expected, found: coeffs.len() });
    }
    if let Some((index, &value)) = coeffs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(HawkesError::NonFiniteCoeff { index, value });
    }
    Ok(())
}
