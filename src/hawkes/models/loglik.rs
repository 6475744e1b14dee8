//! Negative log-likelihood of exponential-family Hawkes processes.
//!
//! Purpose
//! -------
//! Evaluate, for fixed decays `β_u`, the negative log-likelihood of
//!
//! ```text
//! λ_i(t) = f_i[state(t)] · (μ_i + Σ_{j,u} α_iju g_ju(t)),
//! g_ju(t) = Σ_{t_k^j < t} β_u e^{-β_u (t − t_k^j)}
//! ```
//!
//! and its gradient with respect to `(μ, α, f)`. Without mark multipliers
//! `f ≡ 1` and the usual exponential / sum-of-exponentials likelihood is
//! recovered.
//!
//! Key behaviors
//! -------------
//! - Node `i` contributes
//!   `−Σ_k [ln f_i[q_k] + ln s_k] + Σ_q f_i[q] (μ_i L[q] + α_i · G[q])`
//!   with `s_k = μ_i + α_i · g(t_k−)`.
//! - A non-positive `s_k` is reported as
//!   [`HawkesError::NonPositiveIntensity`]; a non-positive multiplier of a
//!   visited state as [`HawkesError::NonPositiveMarkFactor`]. Nothing is
//!   clamped.
//!
//! Conventions
//! -----------
//! - The loss is the plain negative log-likelihood divided by the total
//!   number of events `N`. Reference values computed with the `∫(λ − 1)`
//!   compensator convention are lower by the constant `n_nodes · T / N`:
//!   for two nodes, eleven events and `T = 4.25`, a reference loss of
//!   `2.9434509731246283` corresponds to
//!   `2.9434509731246283 + 2 · 4.25 / 11` here. The offset does not depend
//!   on the coefficients, so gradients and minimizers agree.
use ndarray::{Array1, ArrayView1, s};

use crate::hawkes::{
    core::{layout::ParamLayout, options::ModelOptions, weights::RealizationWeights},
    errors::{HawkesError, HawkesResult},
    models::contrast::{Contrast, ContrastModel},
};

/// Log-likelihood contrast without marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLik;

/// Exponential or sum-of-exponentials negative log-likelihood.
/// Coefficients `[μ (n) | α (n²U)]`.
pub type LogLikModel = ContrastModel<LogLik>;

impl LogLikModel {
    /// Exponential kernels `α β e^{-βt}` sharing one decay.
    pub fn exp(decay: f64, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(vec![decay], options)
    }

    /// Sum-of-exponentials kernels sharing `decays`.
    pub fn sum_exp(decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        Self::with_decays(decays, options)
    }
}

impl Contrast for LogLik {
    const NAME: &'static str = "loglik";
    const USES_MARKS: bool = false;
    const NEEDS_CROSS: bool = false;

    fn layout(n_nodes: usize, n_decays: usize, _n_states: usize) -> ParamLayout {
        ParamLayout::hawkes(n_nodes, n_decays)
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

// ---- Shared formulas (also used by the custom-mark contrast) ----

fn mark_factor(marks: &ArrayView1<f64>, layout: &ParamLayout, q: usize) -> f64 {
    if layout.has_mark_multipliers { marks[q] } else { 1.0 }
}

fn event_intensity(
    mu: f64, alpha: &ArrayView1<f64>, row: &ArrayView1<f64>, i: usize,
) -> HawkesResult<f64> {
    let s = mu + alpha.dot(row);
    if !s.is_finite() || s <= 0.0 {
        return Err(HawkesError::NonPositiveIntensity { node: i, value: s });
    }
    Ok(s)
}

fn checked_factor(f: f64, i: usize, q: usize) -> HawkesResult<f64> {
    if !f.is_finite() || f <= 0.0 {
        return Err(HawkesError::NonPositiveMarkFactor { node: i, state: q, value: f });
    }
    Ok(f)
}

pub(crate) fn loglik_node_loss(
    w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
) -> HawkesResult<f64> {
    let mu = coeffs[layout.baseline_range(i).start];
    let alpha = layout.alpha_row(coeffs, i);
    let marks = layout.marks(coeffs, i);

    let mut ll = 0.0;
    for row in w.node_g[i].outer_iter() {
        ll += event_intensity(mu, &alpha, &row, i)?.ln();
    }
    for q in 0..w.n_states {
        let f = mark_factor(&marks, layout, q);
        let count = w.counts[[i, q]];
        if count > 0.0 && layout.has_mark_multipliers {
            ll += count * checked_factor(f, i, q)?.ln();
        }
        ll -= f * (mu * w.length[q] + alpha.dot(&w.big_g.row(q)));
    }
    Ok(-ll)
}

pub(crate) fn loglik_node_grad(
    w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
    out: &mut Array1<f64>,
) -> HawkesResult<()> {
    let mu_idx = layout.baseline_range(i).start;
    let mu = coeffs[mu_idx];
    let alpha = layout.alpha_row(coeffs, i);
    let marks = layout.marks(coeffs, i);

    let mut d_mu = 0.0;
    let mut d_alpha = Array1::<f64>::zeros(alpha.len());
    for row in w.node_g[i].outer_iter() {
        let inv = 1.0 / event_intensity(mu, &alpha, &row, i)?;
        d_mu += inv;
        d_alpha.scaled_add(inv, &row);
    }
    let mark_start = layout.mark_range(i).start;
    for q in 0..w.n_states {
        let f = mark_factor(&marks, layout, q);
        let g_q = w.big_g.row(q);
        d_mu -= f * w.length[q];
        d_alpha.scaled_add(-f, &g_q);
        if layout.has_mark_multipliers {
            let count = w.counts[[i, q]];
            let mut d_f = -(mu * w.length[q] + alpha.dot(&g_q));
            if count > 0.0 {
                d_f += count / checked_factor(f, i, q)?;
            }
            out[mark_start + q] -= d_f;
        }
    }
    out[mu_idx] -= d_mu;
    let range = layout.alpha_range(i);
    let mut out_alpha = out.slice_mut(s![range.start..range.end]);
    out_alpha -= &d_alpha;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hawkes::{core::data::HawkesData, models::traits::Model};
    use approx::assert_relative_eq;
    use finitediff::FiniteDiff;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Loss values against reference values of the exponential and
    //   sum-of-exponentials likelihoods (shifted by n·T/N, see module docs).
    // - Analytic gradients against central finite differences.
    // - Per-node decomposition and domain errors.
    // -------------------------------------------------------------------------

    fn two_node_events() -> Vec<Array1<f64>> {
        vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]]
    }

    fn fitted_exp(end_time: Option<f64>) -> LogLikModel {
        let data = HawkesData::single(two_node_events(), end_time).expect("valid data");
        let mut model = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid model");
        model.fit(&data).expect("fit succeeds");
        model
    }

    #[test]
    // Purpose
    // -------
    // The exponential negative log-likelihood matches the reference value.
    //
    // Given
    // -----
    // - Two nodes, 11 events, end time 4.25, β = 2,
    //   coeffs [1, 3, 2, 3, 4, 1].
    //
    // Expect
    // ------
    // - loss = 2.9434509731246283 + 2 · 4.25 / 11.
    fn exp_loglik_matches_reference() {
        let model = fitted_exp(None);

        let loss = model.loss(array![1.0, 3.0, 2.0, 3.0, 4.0, 1.0].view()).expect("loss");

        assert_relative_eq!(loss, 2.9434509731246283 + 2.0 * 4.25 / 11.0, epsilon = 1e-12);
        assert_eq!(model.n_coeffs().expect("fitted"), 6);
    }

    #[test]
    // Purpose
    // -------
    // A node without events only contributes its compensator.
    //
    // Given
    // -----
    // - Node 1 empty, node 0 with 5 events, end time 4.25.
    //
    // Expect
    // ------
    // - loss = 5.9243119662517856 + 2 · 4.25 / 5.
    fn exp_loglik_with_empty_node_matches_reference() {
        let events = vec![two_node_events()[0].clone(), Array1::zeros(0)];
        let data = HawkesData::single(events, Some(4.25)).expect("valid data");
        let mut model = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid model");
        model.fit(&data).expect("fit succeeds");

        let loss = model.loss(array![1.0, 3.0, 2.0, 3.0, 4.0, 1.0].view()).expect("loss");

        assert_relative_eq!(loss, 5.9243119662517856 + 2.0 * 4.25 / 5.0, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The sum-of-exponentials likelihood matches the reference value.
    //
    // Given
    // -----
    // - Decays [1, 2, 3], end time 5.65, 14 coefficients.
    //
    // Expect
    // ------
    // - loss = 17.202925821121468 + 2 · 5.65 / 11.
    fn sum_exp_loglik_matches_reference() {
        let data = HawkesData::single(two_node_events(), Some(5.65)).expect("valid data");
        let mut model =
            LogLikModel::sum_exp(vec![1.0, 2.0, 3.0], ModelOptions::default()).expect("valid model");
        model.fit(&data).expect("fit succeeds");
        let coeffs = array![1.0, 3.0, 2.0, 3.0, 4.0, 1.0, 5.0, 3.0, 2.0, 4.0, 2.0, 3.0, 4.0, 5.0];

        let loss = model.loss(coeffs.view()).expect("loss");

        assert_relative_eq!(loss, 17.202925821121468 + 2.0 * 5.65 / 11.0, epsilon = 1e-11);
    }

    #[test]
    // Purpose
    // -------
    // Analytic gradient agrees with central finite differences.
    fn gradient_matches_finite_differences() {
        let data = HawkesData::new(
            vec![two_node_events(), vec![array![0.2, 1.7, 3.3], array![0.9, 2.8]]],
            5.0.into(),
        )
        .expect("valid data");
        let mut model =
            LogLikModel::sum_exp(vec![1.0, 2.5], ModelOptions::new(2).expect("valid"))
                .expect("valid model");
        model.fit(&data).expect("fit succeeds");
        let coeffs = array![0.4, 0.6, 0.1, 0.2, 0.05, 0.3, 0.25, 0.1, 0.15, 0.2];

        let mut grad = Array1::zeros(coeffs.len());
        model.grad(coeffs.view(), &mut grad).expect("grad");
        let fd = coeffs.central_diff(&|c: &Array1<f64>| model.loss(c.view()).expect("loss"));

        for (a, b) in grad.iter().zip(fd.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-6, max_relative = 1e-5);
        }
    }

    #[test]
    // Purpose
    // -------
    // Losses over several realizations are normalized by the total number
    // of events, not by the number of realizations.
    //
    // Given
    // -----
    // - Realization A with 11 events and realization B with 5 events, both
    //   ending at 5.0, fitted separately and together.
    //
    // Expect
    // ------
    // - loss(A, B) = (11 · loss(A) + 5 · loss(B)) / 16.
    fn multi_realization_loss_is_event_weighted() {
        let a = two_node_events();
        let b = vec![array![0.2, 1.7, 3.3], array![0.9, 2.8]];
        let coeffs = array![0.5, 0.8, 0.3, 0.1, 0.2, 0.4];
        let loss_of = |realizations: Vec<Vec<Array1<f64>>>| {
            let data = HawkesData::new(realizations, 5.0.into()).expect("valid data");
            let mut model = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid model");
            model.fit(&data).expect("fit succeeds");
            (model.loss(coeffs.view()).expect("loss"), model.n_total_jumps().expect("fitted"))
        };

        let (loss_a, n_a) = loss_of(vec![a.clone()]);
        let (loss_b, n_b) = loss_of(vec![b.clone()]);
        let (loss_ab, n_ab) = loss_of(vec![a, b]);

        assert_eq!((n_a, n_b, n_ab), (11, 5, 16));
        assert_relative_eq!(
            loss_ab,
            (11.0 * loss_a + 5.0 * loss_b) / 16.0,
            epsilon = 1e-12
        );
    }

    #[test]
    // Purpose
    // -------
    // Per-node losses and gradients average to the full ones.
    fn per_node_terms_average_to_full_objective() {
        let model = fitted_exp(Some(5.0));
        let coeffs = array![0.5, 0.8, 0.3, 0.1, 0.2, 0.4];

        let n = model.n_samples().expect("fitted");
        let mean_loss: f64 =
            (0..n).map(|i| model.loss_i(i, coeffs.view()).expect("loss_i")).sum::<f64>() / n as f64;
        let mut full = Array1::zeros(6);
        model.grad(coeffs.view(), &mut full).expect("grad");
        let mut mean_grad = Array1::<f64>::zeros(6);
        let mut part = Array1::zeros(6);
        for i in 0..n {
            model.grad_i(i, coeffs.view(), &mut part).expect("grad_i");
            mean_grad.scaled_add(1.0 / n as f64, &part);
        }

        assert_eq!(n, 2);
        assert_relative_eq!(mean_loss, model.loss(coeffs.view()).expect("loss"), epsilon = 1e-12);
        for (a, b) in mean_grad.iter().zip(full.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Non-positive intensities inside the log are reported, not clamped.
    fn non_positive_intensity_is_an_error() {
        let model = fitted_exp(None);

        let err = model
            .loss(array![-1.0, 0.5, 0.0, 0.0, 0.0, 0.0].view())
            .expect_err("negative baseline must fail");

        match err {
            HawkesError::NonPositiveIntensity { node, value } => {
                assert_eq!(node, 0);
                assert_relative_eq!(value, -1.0);
            }
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Evaluation before fit, wrong coefficient lengths, and bad samples are
    // rejected.
    fn shape_and_state_errors() {
        let unfitted = LogLikModel::exp(2.0, ModelOptions::default()).expect("valid model");
        assert_eq!(unfitted.loss(array![1.0].view()), Err(HawkesError::ModelNotFitted));

        let model = fitted_exp(None);
        assert_eq!(
            model.loss(array![1.0, 2.0].view()),
            Err(HawkesError::CoeffsLengthMismatch { expected: 6, found: 2 })
        );
        let mut out = Array1::zeros(5);
        assert_eq!(
            model.grad(Array1::ones(6).view(), &mut out).map(|_| ()),
            Err(HawkesError::OutLengthMismatch { expected: 6, found: 5 })
        );
        assert_eq!(
            model.loss_i(2, Array1::ones(6).view()),
            Err(HawkesError::SampleOutOfRange { index: 2, n_samples: 2 })
        );
    }
}
