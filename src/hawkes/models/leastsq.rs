//! Least-squares contrast of exponential-family Hawkes processes.
//!
//! The contrast of node `i` is `∫_0^T λ_i(t)² dt − 2 Σ_k λ_i(t_k^i)` with
//! `λ_i = μ_i[state(t)] + α_i · g(t)`. Expanding the square gives
//!
//! ```text
//! R_i = Σ_q (μ_q² L[q] + 2 μ_q α_i·G[q] − 2 μ_q C[i, q]) + α_iᵀ H α_i − 2 α_i · Σ_k g(t_k^i−)
//! ```
//!
//! which is quadratic in the coefficients. With a single state this is the
//! classical exponential / sum-of-exponentials least-squares contrast; with
//! several states the baseline depends on the mark state (see
//! [`CustomLeastSqModel`](crate::hawkes::models::custom::CustomLeastSqModel)).
use ndarray::{Array1, ArrayView1, s};

use crate::hawkes::{
    core::{layout::ParamLayout, options::ModelOptions, weights::RealizationWeights},
    errors::{HawkesError, HawkesResult},
    models::contrast::{Contrast, ContrastModel},
};

/// Least-squares contrast with one baseline per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeastSq;

/// Exponential or sum-of-exponentials least squares.
/// Coefficients `[μ (n) | α (n²U)]`.
pub type LeastSqModel = ContrastModel<LeastSq>;

impl LeastSqModel {
    pub fn exp(decay: f64, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(vec![decay], options)
    }

    pub fn sum_exp(decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(decays, options)
    }
}

impl Contrast for LeastSq {
    const NAME: &'static str = "leastsq";
    const USES_MARKS: bool = false;
    const NEEDS_CROSS: bool = true;

    fn layout(n_nodes: usize, n_decays: usize, _n_states: usize) -> ParamLayout {
        ParamLayout::hawkes(n_nodes, n_decays)
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

pub(crate) fn leastsq_node_loss(
    w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
) -> HawkesResult<f64> {
    let cross = w.cross.as_ref().ok_or(HawkesError::ModelNotFitted)?;
    let mus = layout.baselines(coeffs, i);
    let alpha = layout.alpha_row(coeffs, i);

    let mut r = 0.0;
    for (q, &mu) in mus.iter().enumerate() {
        r += mu * mu * w.length[q] + 2.0 * mu * alpha.dot(&w.big_g.row(q))
            - 2.0 * mu * w.counts[[i, q]];
    }
    r += alpha.dot(&cross.dot(&alpha));
    r -= 2.0 * alpha.dot(&w.node_g_sum.row(i));
    Ok(r)
}

pub(crate) fn leastsq_node_grad(
    w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
    out: &mut Array1<f64>,
) -> HawkesResult<()> {
    let cross = w.cross.as_ref().ok_or(HawkesError::ModelNotFitted)?;
    let mus = layout.baselines(coeffs, i);
    let alpha = layout.alpha_row(coeffs, i);

    let mut d_alpha = cross.dot(&alpha) * 2.0;
    d_alpha.scaled_add(-2.0, &w.node_g_sum.row(i));
    let mu_start = layout.baseline_range(i).start;
    for (q, &mu) in mus.iter().enumerate() {
        let g_q = w.big_g.row(q);
        out[mu_start + q] += 2.0 * (mu * w.length[q] + alpha.dot(&g_q) - w.counts[[i, q]]);
        d_alpha.scaled_add(2.0 * mu, &g_q);
    }
    let range = layout.alpha_range(i);
    let mut out_alpha = out.slice_mut(s![range.start..range.end]);
    out_alpha += &d_alpha;
    Ok(())
}
