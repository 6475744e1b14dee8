//! Model internals — worker pool, fitted state, and ordered reductions.
//!
//! Purpose
//! -------
//! Keep the plumbing shared by every contrast out of the formulas: building
//! the bounded rayon pool, holding the statistics computed by `fit`, checking
//! coefficient/output lengths, and summing per-realization contributions.
//!
//! Invariants & assumptions
//! ------------------------
//! - Per-realization contributions are computed in parallel but collected in
//!   realization order and summed sequentially, so `loss` and `grad` are
//!   bit-reproducible for any `n_threads`.
//! - The first failing realization (in order) determines the reported error.
use std::sync::Arc;

use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::hawkes::{
    core::{layout::ParamLayout, validation::validate_coeffs, weights::RealizationWeights},
    errors::{HawkesError, HawkesResult},
};

/// Statistics and layout captured by `fit`.
#[derive(Debug, Clone, PartialEq)]
pub struct FitState {
    pub layout: ParamLayout,
    pub weights: Vec<RealizationWeights>,
    pub n_total_jumps: usize,
}

impl FitState {
    /// Check a coefficient vector against the fitted layout.
    pub fn check_coeffs(&self, coeffs: ArrayView1<f64>) -> HawkesResult<()> {
        validate_coeffs(coeffs, self.layout.n_coeffs())
    }

    /// Check an output buffer against the fitted layout.
    pub fn check_out(&self, out: &Array1<f64>) -> HawkesResult<()> {
        let expected = self.layout.n_coeffs();
        if out.len() != expected {
            return Err(HawkesError::OutLengthMismatch { expected, found: out.len() });
        }
        Ok(())
    }

    /// Check a per-node sample index.
    pub fn check_sample(&self, i: usize) -> HawkesResult<()> {
        let n_samples = self.layout.n_nodes;
        if i >= n_samples {
            return Err(HawkesError::SampleOutOfRange { index: i, n_samples });
        }
        Ok(())
    }

    /// `1 / N`, with `N` the total number of events over all realizations.
    ///
    /// Losses are weighted by events rather than averaged over realizations,
    /// so a longer realization contributes proportionally more.
    pub fn norm(&self) -> f64 {
        1.0 / self.n_total_jumps as f64
    }
}

/// Rayon pool with exactly `n_threads` workers.
///
/// # Errors
/// - [`HawkesError::InvalidThreads`] if `n_threads == 0`.
/// - [`HawkesError::ThreadPool`] if the pool cannot be created.
pub fn build_pool(n_threads: usize) -> HawkesResult<Arc<ThreadPool>> {
    if n_threads == 0 {
        return Err(HawkesError::InvalidThreads { n_threads });
    }
    let pool = ThreadPoolBuilder::new().num_threads(n_threads).build()?;
    Ok(Arc::new(pool))
}

/// Sum `f(w)` over realizations in order.
pub fn sum_scalar<F>(pool: &ThreadPool, weights: &[RealizationWeights], f: F) -> HawkesResult<f64>
where
    F: Fn(&RealizationWeights) -> HawkesResult<f64> + Sync,
{
    let parts = pool.install(|| weights.par_iter().map(&f).collect::<HawkesResult<Vec<f64>>>())?;
    Ok(parts.into_iter().sum())
}

/// Sum per-realization gradients in order into `out` (which is overwritten).
///
/// `f` receives a zeroed buffer of `out`'s length to accumulate into.
pub fn sum_vector<F>(
    pool: &ThreadPool, weights: &[RealizationWeights], out: &mut Array1<f64>, f: F,
) -> HawkesResult<()>
where
    F: Fn(&RealizationWeights, &mut Array1<f64>) -> HawkesResult<()> + Sync,
{
    let dim = out.len();
    let parts = pool.install(|| {
        weights
            .par_iter()
            .map(|w| {
                let mut part = Array1::zeros(dim);
                f(w, &mut part)?;
                Ok(part)
            })
            .collect::<HawkesResult<Vec<Array1<f64>>>>()
    })?;
    out.fill(0.0);
    for part in &parts {
        *out += part;
    }
    Ok(())
}
