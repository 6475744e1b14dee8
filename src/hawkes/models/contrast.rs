//! Contrast models — one generic fitted model per closed contrast variant.
//!
//! Purpose
//! -------
//! Every model in this crate is "fixed decays + a per-node contrast evaluated
//! from [`RealizationWeights`]". [`ContrastModel`] owns the parts that do not
//! depend on the formula (decays, worker pool, fitted statistics, the
//! [`Model`] plumbing) and delegates the per-node formula to a [`Contrast`].
//!
//! Key behaviors
//! -------------
//! - `fit` validates that mark-aware contrasts receive marks, recomputes the
//!   statistics of every realization on the pool, and replaces any previous
//!   fit.
//! - `loss = (1/N) Σ_r Σ_i c_i(r)` and
//!   `loss_i = (n/N) Σ_r c_i(r)`, with `N` the total number of events and
//!   `n` the number of nodes.
use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use ndarray::{Array1, ArrayView1};
use rayon::ThreadPool;

use crate::hawkes::{
    core::{
        data::HawkesData,
        layout::ParamLayout,
        options::ModelOptions,
        validation::validate_decays,
        weights::{RealizationWeights, compute_all},
    },
    errors::{HawkesError, HawkesResult},
    models::{
        model_internals::{FitState, build_pool, sum_scalar, sum_vector},
        traits::Model,
    },
};

/// Per-node formula of a Hawkes contrast.
pub trait Contrast: Debug + Clone + Send + Sync + 'static {
    /// Short identifier used in logs and errors.
    const NAME: &'static str;
    /// Whether `fit` requires `global_n` sequences.
    const USES_MARKS: bool;
    /// Whether the statistics need the `∫ g_a g_b` cross matrix.
    const NEEDS_CROSS: bool;

    /// Coefficient layout for the fitted dimensions.
    fn layout(n_nodes: usize, n_decays: usize, n_states: usize) -> ParamLayout;

    /// Contribution `c_i` of node `i` in one realization.
    fn node_loss(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
    ) -> HawkesResult<f64>;

    /// Add `∇ c_i` into `out`.
    fn node_grad(
        w: &RealizationWeights, layout: &ParamLayout, coeffs: ArrayView1<f64>, i: usize,
        out: &mut Array1<f64>,
    ) -> HawkesResult<()>;
}

/// Fixed-decay Hawkes model evaluated through contrast `C`.
#[derive(Debug, Clone)]
pub struct ContrastModel<C: Contrast> {
    decays: Vec<f64>,
    options: ModelOptions,
    pool: Arc<ThreadPool>,
    fitted: Option<FitState>,
    contrast: PhantomData<C>,
}

impl<C: Contrast> ContrastModel<C> {
    /// Unfitted model with the given decays.
    ///
    /// # Errors
    /// - [`HawkesError::NoDecays`] / [`HawkesError::InvalidDecay`] for empty
    ///   or non-positive decays.
    /// - [`HawkesError::InvalidThreads`] / [`HawkesError::ThreadPool`] if the
    ///   worker pool cannot be built.
    pub fn with_decays(decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        validate_decays(&decays)?;
        let pool = build_pool(options.n_threads)?;
        Ok(Self { decays, options, pool, fitted: None, contrast: PhantomData })
    }

    /// Ingest `data`, replacing any previous fit.
    ///
    /// # Errors
    /// - [`HawkesError::MissingMarks`] if the contrast needs `global_n` and
    ///   `data` has none.
    /// - [`HawkesError::NoEvents`] if no realization contains an event.
    pub fn fit(&mut self, data: &HawkesData) -> HawkesResult<()> {
        if C::USES_MARKS && !data.has_marks() {
            return Err(HawkesError::MissingMarks);
        }
        let n_total_jumps = data.n_total_jumps();
        if n_total_jumps == 0 {
            return Err(HawkesError::NoEvents);
        }
        let n_states = if C::USES_MARKS { data.n_states() } else { 1 };
        let weights = compute_all(data, &self.decays, C::USES_MARKS, C::NEEDS_CROSS, &self.pool);
        let layout = C::layout(data.n_nodes(), self.decays.len(), n_states);
        self.fitted = Some(FitState { layout, weights, n_total_jumps });
        Ok(())
    }

    pub fn decays(&self) -> &[f64] {
        &self.decays
    }

    pub fn n_threads(&self) -> usize {
        self.options.n_threads
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn name(&self) -> &'static str {
        C::NAME
    }

    /// Total number of events of the fitted data.
    pub fn n_total_jumps(&self) -> HawkesResult<usize> {
        Ok(self.state()?.n_total_jumps)
    }

    fn state(&self) -> HawkesResult<&FitState> {
        self.fitted.as_ref().ok_or(HawkesError::ModelNotFitted)
    }
}

impl<C: Contrast> Model for ContrastModel<C> {
    fn layout(&self) -> HawkesResult<ParamLayout> {
        Ok(self.state()?.layout)
    }

    fn loss(&self, coeffs: ArrayView1<f64>) -> HawkesResult<f64> {
        let state = self.state()?;
        state.check_coeffs(coeffs)?;
        let layout = state.layout;
        let total = sum_scalar(&self.pool, &state.weights, |w| {
            let mut acc = 0.0;
            for i in 0..layout.n_nodes {
                acc += C::node_loss(w, &layout, coeffs, i)?;
            }
            Ok(acc)
        })?;
        Ok(total * state.norm())
    }

    fn grad<'o>(
        &self, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>> {
        let state = self.state()?;
        state.check_coeffs(coeffs)?;
        state.check_out(out)?;
        let layout = state.layout;
        sum_vector(&self.pool, &state.weights, out, |w, part| {
            for i in 0..layout.n_nodes {
                C::node_grad(w, &layout, coeffs, i, part)?;
            }
            Ok(())
        })?;
        *out *= state.norm();
        Ok(out)
    }

    fn n_samples(&self) -> HawkesResult<usize> {
        Ok(self.state()?.layout.n_nodes)
    }

    fn loss_i(&self, i: usize, coeffs: ArrayView1<f64>) -> HawkesResult<f64> {
        let state = self.state()?;
        state.check_sample(i)?;
        state.check_coeffs(coeffs)?;
        let layout = state.layout;
        let total = sum_scalar(&self.pool, &state.weights, |w| C::node_loss(w, &layout, coeffs, i))?;
        Ok(total * state.norm() * layout.n_nodes as f64)
    }

    fn grad_i<'o>(
        &self, i: usize, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>> {
        let state = self.state()?;
        state.check_sample(i)?;
        state.check_coeffs(coeffs)?;
        state.check_out(out)?;
        let layout = state.layout;
        sum_vector(&self.pool, &state.weights, out, |w, part| {
            C::node_grad(w, &layout, coeffs, i, part)
        })?;
        *out *= state.norm() * layout.n_nodes as f64;
        Ok(out)
    }
}
