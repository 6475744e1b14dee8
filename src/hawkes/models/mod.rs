//! models — fixed-decay Hawkes contrasts and their closed variant set.
//!
//! Purpose
//! -------
//! Expose the objectives solvers minimize. Each model is fitted once on
//! [`HawkesData`] (statistics are precomputed), then evaluated through the
//! [`Model`] trait at arbitrary coefficient vectors.
//!
//! Key behaviors
//! -------------
//! - Four variants share one generic implementation, [`ContrastModel`]:
//!   - [`LogLikModel`]: exponential / sum-of-exponentials negative
//!     log-likelihood,
//!   - [`LeastSqModel`]: exponential / sum-of-exponentials least squares,
//!   - [`CustomLogLikModel`]: log-likelihood with learned mark multipliers,
//!   - [`CustomLeastSqModel`]: least squares with per-state baselines.
//! - [`HawkesModel`] is the tagged union over these variants, selected by
//!   [`ModelKind`] (parsable from a name) at construction.
//!
//! Invariants & assumptions
//! ------------------------
//! - Losses are normalized by the total number of events across
//!   realizations; per-node terms satisfy `loss = mean_i loss_i`.
//! - Per-realization contributions are reduced in realization order on a
//!   pool of `ModelOptions::n_threads` workers.
//! - Domain problems (non-positive intensity in a logarithm, non-positive
//!   multiplier of a visited state) are errors, never clamped.
//!
//! Downstream usage
//! ----------------
//! - Build a model, `fit` it, then hand it to
//!   [`Solver`](crate::optimization::solvers::Solver) via `set_model`.
use std::str::FromStr;

use ndarray::{Array1, ArrayView1};

use crate::hawkes::{
    core::{data::HawkesData, layout::ParamLayout, options::ModelOptions},
    errors::{HawkesError, HawkesResult},
};

pub mod contrast;
pub mod custom;
pub mod leastsq;
pub mod loglik;
pub mod model_internals;
pub mod traits;

pub use self::contrast::{Contrast, ContrastModel};
pub use self::custom::{CustomLeastSqModel, CustomLogLikModel};
pub use self::leastsq::LeastSqModel;
pub use self::loglik::LogLikModel;
pub use self::traits::Model;

/// Closed set of model variants, parsable from a case-insensitive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    LogLik,
    LeastSq,
    CustomLogLik,
    CustomLeastSq,
}

impl FromStr for ModelKind {
    type Err = HawkesError;

    /// Accepts `"loglik"`, `"leastsq"`, `"custom_loglik"`, `"custom_leastsq"`
    /// in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loglik" => Ok(ModelKind::LogLik),
            "leastsq" => Ok(ModelKind::LeastSq),
            "custom_loglik" => Ok(ModelKind::CustomLogLik),
            "custom_leastsq" => Ok(ModelKind::CustomLeastSq),
            _ => Err(HawkesError::UnknownModel { name: s.to_string() }),
        }
    }
}

/// Tagged union over the model variants.
#[derive(Debug, Clone)]
pub enum HawkesModel {
    LogLik(LogLikModel),
    LeastSq(LeastSqModel),
    CustomLogLik(CustomLogLikModel),
    CustomLeastSq(CustomLeastSqModel),
}

impl HawkesModel {
    /// Unfitted model of `kind` with the given decays (one decay for plain
    /// exponential kernels).
    pub fn new(kind: ModelKind, decays: Vec<f64>, options: ModelOptions) -> HawkesResult<Self> {
        Ok(match kind {
            ModelKind::LogLik => HawkesModel::LogLik(LogLikModel::with_decays(decays, options)?),
            ModelKind::LeastSq => HawkesModel::LeastSq(LeastSqModel::with_decays(decays, options)?),
            ModelKind::CustomLogLik => {
                HawkesModel::CustomLogLik(CustomLogLikModel::with_decays(decays, options)?)
            }
            ModelKind::CustomLeastSq => {
                HawkesModel::CustomLeastSq(CustomLeastSqModel::with_decays(decays, options)?)
            }
        })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            HawkesModel::LogLik(_) => ModelKind::LogLik,
            HawkesModel::LeastSq(_) => ModelKind::LeastSq,
            HawkesModel::CustomLogLik(_) => ModelKind::CustomLogLik,
            HawkesModel::CustomLeastSq(_) => ModelKind::CustomLeastSq,
        }
    }

    /// Ingest `data`, replacing any previous fit.
    pub fn fit(&mut self, data: &HawkesData) -> HawkesResult<()> {
        match self {
            HawkesModel::LogLik(m) => m.fit(data),
            HawkesModel::LeastSq(m) => m.fit(data),
            HawkesModel::CustomLogLik(m) => m.fit(data),
            HawkesModel::CustomLeastSq(m) => m.fit(data),
        }
    }

    pub fn decays(&self) -> &[f64] {
        match self {
            HawkesModel::LogLik(m) => m.decays(),
            HawkesModel::LeastSq(m) => m.decays(),
            HawkesModel::CustomLogLik(m) => m.decays(),
            HawkesModel::CustomLeastSq(m) => m.decays(),
        }
    }

    fn as_model(&self) -> &dyn Model {
        match self {
            HawkesModel::LogLik(m) => m,
            HawkesModel::LeastSq(m) => m,
            HawkesModel::CustomLogLik(m) => m,
            HawkesModel::CustomLeastSq(m) => m,
        }
    }
}

impl Model for HawkesModel {
    fn layout(&self) -> HawkesResult<ParamLayout> {
        self.as_model().layout()
    }

    fn loss(&self, coeffs: ArrayView1<f64>) -> HawkesResult<f64> {
        self.as_model().loss(coeffs)
    }

    fn grad<'o>(
        &self, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>> {
        self.as_model().grad(coeffs, out)
    }

    fn n_samples(&self) -> HawkesResult<usize> {
        self.as_model().n_samples()
    }

    fn loss_i(&self, i: usize, coeffs: ArrayView1<f64>) -> HawkesResult<f64> {
        self.as_model().loss_i(i, coeffs)
    }

    fn grad_i<'o>(
        &self, i: usize, coeffs: ArrayView1<f64>, out: &'o mut Array1<f64>,
    ) -> HawkesResult<&'o mut Array1<f64>> {
        self.as_model().grad_i(i, coeffs, out)
    }
}

pub mod prelude {
    pub use super::{HawkesModel, Model, ModelKind};
    pub use super::{CustomLeastSqModel, CustomLogLikModel, LeastSqModel, LogLikModel};
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Variant names parse case-insensitively; unknown names are errors.
    fn model_kind_parses_names() {
        assert_eq!("LogLik".parse::<ModelKind>(), Ok(ModelKind::LogLik));
        assert_eq!("CUSTOM_LEASTSQ".parse::<ModelKind>(), Ok(ModelKind::CustomLeastSq));
        assert_eq!(
            "glm".parse::<ModelKind>(),
            Err(HawkesError::UnknownModel { name: "glm".to_string() })
        );
    }

    #[test]
    // Purpose
    // -------
    // The tagged union dispatches to the selected variant.
    fn hawkes_model_dispatches_to_variant() {
        let data = HawkesData::single(vec![array![0.5, 1.5], array![1.0]], Some(3.0))
            .expect("valid data");
        let mut model =
            HawkesModel::new(ModelKind::LeastSq, vec![1.0], ModelOptions::default()).expect("valid");
        model.fit(&data).expect("fit succeeds");

        let coeffs = array![0.5, 0.5, 0.1, 0.1, 0.1, 0.1];
        let direct = {
            let mut m = LeastSqModel::exp(1.0, ModelOptions::default()).expect("valid");
            m.fit(&data).expect("fit succeeds");
            m.loss(coeffs.view()).expect("loss")
        };

        assert_eq!(model.kind(), ModelKind::LeastSq);
        assert_eq!(model.n_coeffs(), Ok(6));
        assert_eq!(model.loss(coeffs.view()), Ok(direct));
    }
}
