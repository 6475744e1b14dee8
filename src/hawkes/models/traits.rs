//! Model interface shared by every Hawkes contrast.
//!
//! A model is fitted once on [`HawkesData`](crate::hawkes::core::HawkesData)
//! and then evaluated many times at different coefficient vectors. Losses are
//! *minimized*: log-likelihood models return the negative log-likelihood.
//!
//! Every loss splits into one term per node, which is what stochastic solvers
//! sample: `n_samples()` is the number of nodes and
//! `loss = (1 / n_samples) Σ_i loss_i`.
use ndarray::{Array1, ArrayView1};

use crate::hawkes::{core::layout::ParamLayout, errors::HawkesResult};

/// Smooth objective evaluated by the solvers.
///
/// Every method errors with
/// [`HawkesError::ModelNotFitted`](crate::hawkes::errors::HawkesError::ModelNotFitted)
/// before the model has been fitted, and with
/// [`HawkesError::CoeffsLengthMismatch`](crate::hawkes::errors::HawkesError::CoeffsLengthMismatch)
/// for coefficient vectors of the wrong length.
pub trait Model: Send + Sync {
    /// Coefficient layout (depends on the fitted number of nodes).
    fn layout(&self) -> HawkesResult<ParamLayout>;

    /// Dimension of the coefficient vector.
    fn n_coeffs(&self) -> HawkesResult<usize> {
        Ok(self.layout()?.n_coeffs())
    }

    /// Objective at `coeffs`, normalized by the total number of events.
    fn loss(&self, coeffs: ArrayView1<f64>) -> HawkesResult<f64>;

    /// Write the gradient of [`Model::loss`] into `out` and hand it back.
    fn grad<'o>(
        &self, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>>;

    /// Number of per-node terms.
    fn n_samples(&self) -> HawkesResult<usize>;

    /// Term `i` of the per-node decomposition.
    fn loss_i(&self, i: usize, coeffs: ArrayView1<f64>) -> HawkesResult<f64>;

    /// Gradient of [`Model::loss_i`]; only node `i`'s coordinates are non-zero.
    fn grad_i<'o>(
        &self, i: usize, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>>;
}
