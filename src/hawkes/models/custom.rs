//! Custom-mark models — contrasts driven by the global mark state `global_n`.
//!
//! Purpose
//! -------
//! Fit Hawkes processes whose intensity depends on a discrete state carried
//! alongside the events (for instance an order-book queue size):
//!
//! - [`CustomLogLikModel`]: `λ_i(t) = f_i[state(t)] · (μ_i + α_i · g(t))`,
//!   learning the multipliers `f_i[·]` jointly with `(μ, α)`.
//!   Coefficients `[μ (n) | α (n²U) | f (n · MaxN)]`, i.e.
//!   `n + n² + n · MaxN` for a single decay.
//! - [`CustomLeastSqModel`]: least squares with state-dependent baselines
//!   `λ_i(t) = μ_i[state(t)] + α_i · g(t)`.
//!   Coefficients `[μ (n · MaxN) | α (n²U)]`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `fit` requires data built with `HawkesData::with_marks` (or a simulation
//!   result); otherwise it fails with [`HawkesError::MissingMarks`].
//! - `MaxN` is the `n_states` the data were built with.
//! - The log-likelihood is invariant under `f_i → f_i / m`,
//!   `(μ_i, α_i) → m (μ_i, α_i)`; use
//!   [`rescale_by_first_mark`](crate::hawkes::core::layout::rescale_by_first_mark)
//!   to fix `f_i[0] = 1` after solving.
use ndarray::{Array1, ArrayView1};

use crate::hawkes::{
    core::{layout::ParamLayout, options::ModelOptions, weights::RealizationWeights},
    errors::HawkesResult,
    models::{
        contrast::{Contrast, ContrastModel},
        leastsq::{leastsq_node_grad, leastsq_node_loss},
        loglik::{loglik_node_grad, loglik_node_loss},
    },
};

/// Log-likelihood with learned per-state multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomLogLik;

/// Least squares with per-state baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomLeastSq;

pub type CustomLogLikModel = ContrastModel<CustomLogLik>;

pub type CustomLeastSqModel = ContrastModel<CustomLeastSq>;

impl CustomLogLikModel {
    /// Exponential kernels sharing one decay.
    pub fn exp(decay: f64, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(vec![decay], options)
    }

    /// Sum-of-exponentials kernels sharing `decays`.
    pub fn sum_exp(decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(decays, options)
    }
}

impl CustomLeastSqModel {
    /// Exponential kernels sharing one decay.
    pub fn exp(decay: f64, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(vec![decay], options)
    }

    /// Sum-of-exponentials kernels sharing `decays`.
    pub fn sum_exp(decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(decays, options)
    }
}

impl Contrast for CustomLogLik {
    const NAME: &'static str = "custom_loglik";
    const USES_MARKS: bool = true;
    const NEEDS_CROSS: bool = false;

    fn layout(n_nodes: usize, n_decays: usize, n_states: usize) -> ParamLayout {
        ParamLayout::custom(n_nodes, n_decays, n_states)
    }

    fn node_loss(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
    ) -> HawkesResult<f64> {
        loglik_node_loss(w, layout, coeffs, i)
    }

    fn node_grad(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
        out: &mut Array1<f64>,
    ) -> HawkesResult<()> {
        loglik_node_grad(w, layout, coeffs, i, out)
    }
}

impl Contrast for CustomLeastSq {
    const NAME: &'static str = "custom_leastsq";
    const USES_MARKS: bool = true;
    const NEEDS_CROSS: bool = true;

    fn layout(n_nodes: usize, n_decays: usize, n_states: usize) -> ParamLayout {
        ParamLayout::per_state_baseline(n_nodes, n_decays, n_states)
    }

    fn node_loss(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
    ) -> HawkesResult<f64> {
        leastsq_node_loss(w, layout, coeffs, i)
    }

    fn node_grad(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
        out: &mut Array1<f64>,
    ) -> HawkesResult<()> {
        leastsq_node_grad(w, layout, coeffs, i, out)
    }
}
