//! rust_hawkes — multivariate Hawkes simulation and penalized fitting with
//! custom mark states, with optional Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the simulator, the models and the proximal solvers to Python via
//! the `_rust_hawkes` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules: [`hawkes`] (kernels, simulation,
//!   models), [`optimization`] (penalties, solvers) and [`benchmark`].
//! - Define `#[pyclass]` wrappers ([`SimuHawkes`], [`HawkesCustomModel`],
//!   [`ProxSolver`]) and the `#[pymodule]` initializer when the
//!   `python-bindings` feature is enabled.
//! - Register Python submodules (`hawkes`, `solvers`) under `rust_hawkes`
//!   so that dot-notation imports work as expected.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file performs only
//!   FFI glue, input conversion and error mapping.
//! - Python-visible types keep the invariants of their Rust counterparts:
//!   a `ProxSolver` needs a fitted model and a penalty before `solve`.
//!
//! Conventions
//! -----------
//! - Coefficient vectors use the parameter layout of
//!   [`hawkes::core::layout::ParamLayout`]: baselines, then kernel
//!   intensities `α[i, j, u]`, then mark multipliers `f_i[q]` for custom
//!   models.
//! - Errors from core Rust code are converted to Python `ValueError`s at the
//!   PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code depends on the inner modules, typically through
//!   `hawkes::prelude::*` and `optimization::prelude::*`.
//! - The Python packaging layer imports `_rust_hawkes` and wraps its classes.

pub mod benchmark;
pub mod hawkes;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use std::sync::Arc;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyReadonlyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    hawkes::{
        core::{
            data::{EndTimes, HawkesData},
            layout::rescale_by_first_mark,
            marks::MarkTable,
            options::{ModelOptions, SimOpts},
        },
        models::{HawkesModel, Model, ModelKind},
        simulation::{HawkesSimulation, SimulationResult},
    },
    optimization::solvers::Solver,
    utils::{
        build_kernel_matrix, build_prox, build_solver_options, extract_mark_dynamics,
        extract_realizations, extract_vector,
    },
};

/// SimuHawkes — Python-facing Hawkes simulator with custom mark states.
///
/// Purpose
/// -------
/// Build a network of exponential or sum-of-exponential kernels from an
/// adjacency array, optionally attach mark factors `f_i[state]` and a
/// transition table, and simulate one realization by thinning.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `SimuHawkes(adjacency, decays, baseline, end_time, seed=0, ...)`:
/// - `adjacency`: `(n, n)` array with one decay, or `(n, n, U)` with `U`
///   decays.
/// - `baseline`: per-node baseline intensities.
/// - `max_jumps`, `force_simulation`: guards for explosive networks.
/// - `track_intensity`: optional sampling step of the intensity trace.
///
/// Notes
/// -----
/// - The last simulation is cached; `timestamps`, `global_n` and
///   `n_total_jumps` read from it.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hawkes.hawkes", unsendable)]
pub struct SimuHawkes {
    inner: HawkesSimulation,
    last: Option<SimulationResult>,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl SimuHawkes {
    #[new]
    #[pyo3(
        signature = (
            adjacency,
            decays,
            baseline,
            end_time,
            seed = 0,
            max_jumps = None,
            force_simulation = false,
            track_intensity = None,
        ),
        text_signature = "(adjacency, decays, baseline, end_time, /, seed=0, max_jumps=None, \
                          force_simulation=False, track_intensity=None)"
    )]
    pub fn new<'py>(
        py: Python<'py>, adjacency: &Bound<'py, PyAny>, decays: Vec<f64>,
        baseline: &Bound<'py, PyAny>, end_time: f64, seed: u64, max_jumps: Option<usize>,
        force_simulation: bool, track_intensity: Option<f64>,
    ) -> PyResult<Self> {
        let kernels = build_kernel_matrix(adjacency, &decays)?;
        let baselines = extract_vector(py, baseline, "baseline")?;
        let opts = SimOpts::new(end_time, seed, track_intensity, max_jumps, force_simulation)?;
        let inner = HawkesSimulation::new(kernels, baselines, opts)?;
        Ok(SimuHawkes { inner, last: None })
    }

    /// Attach mark factors `(n_nodes, n_states)` and an optional
    /// `(n_states, n_nodes)` transition table (uniform draws otherwise).
    #[pyo3(signature = (factors, transitions = None))]
    pub fn set_marks<'py>(
        &mut self, factors: PyReadonlyArray2<'py, f64>, transitions: Option<&Bound<'py, PyAny>>,
    ) -> PyResult<()> {
        let table = MarkTable::new(factors.as_array().to_owned())?;
        let dynamics = extract_mark_dynamics(transitions)?;
        self.inner = self.inner.clone().with_marks(table, dynamics)?;
        Ok(())
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.inner.set_seed(seed);
    }

    /// Run one simulation and cache it.
    pub fn simulate(&mut self) -> PyResult<()> {
        self.last = Some(self.inner.simulate()?);
        Ok(())
    }

    #[getter]
    pub fn n_nodes(&self) -> usize {
        self.inner.n_nodes()
    }

    #[getter]
    pub fn spectral_radius(&self) -> f64 {
        self.inner.spectral_radius()
    }

    #[getter]
    pub fn timestamps<'py>(&self, py: Python<'py>) -> PyResult<Vec<Bound<'py, PyArray1<f64>>>> {
        let result = self.result()?;
        Ok(result.timestamps().iter().map(|t| t.clone().into_pyarray(py)).collect())
    }

    #[getter]
    pub fn global_n(&self) -> PyResult<Vec<usize>> {
        Ok(self.result()?.global_n.clone())
    }

    #[getter]
    pub fn n_total_jumps(&self) -> PyResult<usize> {
        Ok(self.result()?.n_jumps())
    }
}

#[cfg(feature = "python-bindings")]
impl SimuHawkes {
    fn result(&self) -> PyResult<&SimulationResult> {
        self.last.as_ref().ok_or_else(|| PyValueError::new_err("call simulate() first"))
    }
}

/// HawkesCustomModel — Python-facing wrapper over [`HawkesModel`].
///
/// Purpose
/// -------
/// Fit one of the model variants (`loglik`, `leastsq`, `custom_loglik`,
/// `custom_leastsq`) to realizations and mark sequences, and expose `loss`,
/// `grad` and the post-fit mark rescaling.
///
/// Parameters
/// ----------
/// Constructed from Python via `HawkesCustomModel(model, decays, n_threads=1)`.
///
/// Notes
/// -----
/// - `fit` accepts a single realization (list of per-node arrays) or a list
///   of realizations; `global_n` is a list of mark sequences, one per
///   realization.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hawkes.hawkes", unsendable)]
pub struct HawkesCustomModel {
    inner: HawkesModel,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl HawkesCustomModel {
    #[new]
    #[pyo3(
        signature = (model, decays, n_threads = 1),
        text_signature = "(model, decays, /, n_threads=1)"
    )]
    pub fn new(model: &str, decays: Vec<f64>, n_threads: usize) -> PyResult<Self> {
        let kind: ModelKind = model.parse()?;
        let inner = HawkesModel::new(kind, decays, ModelOptions::new(n_threads)?)?;
        Ok(HawkesCustomModel { inner })
    }

    #[pyo3(signature = (timestamps, global_n = None, n_states = None, end_times = None))]
    pub fn fit<'py>(
        &mut self, py: Python<'py>, timestamps: &Bound<'py, PyAny>,
        global_n: Option<Vec<Vec<usize>>>, n_states: Option<usize>, end_times: Option<Vec<f64>>,
    ) -> PyResult<()> {
        let realizations = extract_realizations(py, timestamps)?;
        let end_times: EndTimes = match end_times {
            Some(values) if values.len() == 1 => values[0].into(),
            Some(values) => values.into(),
            None => EndTimes::Observed,
        };
        let data = match global_n {
            Some(marks) => {
                let n_states = n_states.unwrap_or_else(|| {
                    marks.iter().flatten().copied().max().map_or(1, |m| m + 1)
                });
                HawkesData::with_marks(realizations, marks, n_states, end_times)?
            }
            None => HawkesData::new(realizations, end_times)?,
        };
        self.inner.fit(&data)?;
        Ok(())
    }

    pub fn loss<'py>(&self, py: Python<'py>, coeffs: &Bound<'py, PyAny>) -> PyResult<f64> {
        let coeffs = extract_vector(py, coeffs, "coeffs")?;
        Ok(self.inner.loss(coeffs.view())?)
    }

    pub fn grad<'py>(
        &self, py: Python<'py>, coeffs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let coeffs = extract_vector(py, coeffs, "coeffs")?;
        let mut out = ndarray::Array1::zeros(coeffs.len());
        self.inner.grad(coeffs.view(), &mut out)?;
        Ok(out.into_pyarray(py))
    }

    /// Copy of `coeffs` with every node's first mark multiplier scaled to 1.
    pub fn rescale<'py>(
        &self, py: Python<'py>, coeffs: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let mut coeffs = extract_vector(py, coeffs, "coeffs")?;
        rescale_by_first_mark(&mut coeffs, &self.inner.layout()?)?;
        Ok(coeffs.into_pyarray(py))
    }

    #[getter]
    pub fn n_coeffs(&self) -> PyResult<usize> {
        Ok(self.inner.n_coeffs()?)
    }

    #[getter]
    pub fn n_samples(&self) -> PyResult<usize> {
        Ok(self.inner.n_samples()?)
    }

    #[getter]
    pub fn decays(&self) -> Vec<f64> {
        self.inner.decays().to_vec()
    }
}

/// ProxSolver — Python-facing proximal solver.
///
/// Purpose
/// -------
/// Configure one of `gd`, `agd`, `sgd`, `svrg`, `sdca`, attach a fitted
/// [`HawkesCustomModel`] and a penalty, and solve from a starting point.
///
/// Notes
/// -----
/// - `set_model` snapshots the model: refitting the Python model afterwards
///   requires calling `set_model` again.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_hawkes.solvers", unsendable)]
pub struct ProxSolver {
    inner: Solver,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl ProxSolver {
    #[new]
    #[pyo3(
        signature = (
            solver = "agd",
            step = 1e-2,
            max_iter = 100,
            tol = None,
            linesearch = true,
            monotone = false,
            step_type = "fixed",
            l_l2sq = 0.0,
            seed = 42,
            epoch_size = None,
            record_every = 1,
            print_every = 10,
            verbose = false,
        ),
        text_signature = "(solver='agd', step=0.01, max_iter=100, tol=None, linesearch=True, \
                          monotone=False, step_type='fixed', l_l2sq=0.0, seed=42, \
                          epoch_size=None, record_every=1, print_every=10, verbose=False)"
    )]
    pub fn new(
        solver: &str, step: f64, max_iter: usize, tol: Option<f64>, linesearch: bool,
        monotone: bool, step_type: &str, l_l2sq: f64, seed: u64, epoch_size: Option<usize>,
        record_every: usize, print_every: usize, verbose: bool,
    ) -> PyResult<Self> {
        let opts = build_solver_options(
            solver,
            step,
            max_iter,
            tol,
            linesearch,
            monotone,
            step_type,
            l_l2sq,
            seed,
            epoch_size,
            record_every,
            print_every,
            verbose,
        )?;
        Ok(ProxSolver { inner: Solver::new(opts)? })
    }

    pub fn set_model(&mut self, model: &HawkesCustomModel) {
        self.inner.set_model(Arc::new(model.inner.clone()));
    }

    #[pyo3(signature = (prox, strength = 0.0, range = None, positive = false, ratio = None, bounds = None))]
    pub fn set_prox(
        &mut self, prox: &str, strength: f64, range: Option<(usize, usize)>, positive: bool,
        ratio: Option<f64>, bounds: Option<(f64, f64)>,
    ) -> PyResult<()> {
        self.inner.set_prox(build_prox(prox, strength, range, positive, ratio, bounds)?);
        Ok(())
    }

    pub fn solve<'py>(
        &mut self, py: Python<'py>, x0: &Bound<'py, PyAny>,
    ) -> PyResult<Bound<'py, PyArray1<f64>>> {
        let x0 = extract_vector(py, x0, "x0")?;
        let solution = self.inner.solve(x0)?;
        Ok(solution.clone().into_pyarray(py))
    }

    pub fn objective<'py>(&self, py: Python<'py>, coeffs: &Bound<'py, PyAny>) -> PyResult<f64> {
        let coeffs = extract_vector(py, coeffs, "coeffs")?;
        Ok(self.inner.objective(&coeffs)?)
    }

    #[getter]
    pub fn solution<'py>(&self, py: Python<'py>) -> Option<Bound<'py, PyArray1<f64>>> {
        self.inner.solution().map(|x| x.clone().into_pyarray(py))
    }

    #[getter]
    pub fn history(&self) -> Vec<f64> {
        self.inner.history().to_vec()
    }

    #[getter]
    pub fn iterations(&self) -> Option<usize> {
        self.inner.outcome().map(|o| o.iterations)
    }

    #[getter]
    pub fn converged(&self) -> Option<bool> {
        self.inner.outcome().map(|o| o.converged)
    }
}

/// _rust_hawkes — PyO3 module initializer for the Python extension.
///
/// Creates the `hawkes` and `solvers` submodules, attaches them to
/// `_rust_hawkes`, and registers them in `sys.modules` so dotted imports
/// work from Python.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_hawkes<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    let hawkes_mod = PyModule::new(_py, "hawkes")?;
    let solvers_mod = PyModule::new(_py, "solvers")?;
    hawkes_models(_py, m, &hawkes_mod)?;
    solvers(_py, m, &solvers_mod)?;

    // Manually add submodules into sys.modules to allow for dot notation.
    _py.import("sys")?.getattr("modules")?.set_item("rust_hawkes.hawkes", hawkes_mod)?;
    _py.import("sys")?.getattr("modules")?.set_item("rust_hawkes.solvers", solvers_mod)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn hawkes_models<'py>(
    _py: Python, rust_hawkes: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<SimuHawkes>()?;
    m.add_class::<HawkesCustomModel>()?;
    rust_hawkes.add_submodule(m)?;
    Ok(())
}

#[cfg(feature = "python-bindings")]
fn solvers<'py>(
    _py: Python, rust_hawkes: &Bound<'py, PyModule>, m: &Bound<'py, PyModule>,
) -> PyResult<()> {
    m.add_class::<ProxSolver>()?;
    rust_hawkes.add_submodule(m)?;
    Ok(())
}
