//! utils — PyO3 extraction and builder helpers for the Python bindings.
//!
//! Converts Python inputs (NumPy arrays, pandas Series, nested lists) into
//! the validated Rust types of [`crate::hawkes`] and [`crate::optimization`].
//! Everything here is compiled only with the `python-bindings` feature.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2, Array3};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
    PyReadonlyArray2,
    PyReadonlyArray3,
};

#[cfg(feature = "python-bindings")]
use crate::{
    hawkes::core::{kernel_matrix::KernelMatrix, marks::MarkDynamics},
    optimization::{
        prox::{Prox, ProxKind},
        solvers::{SolverKind, SolverOptions, StepType},
    },
};

/// Read a 1-D float64 array from a NumPy array, a pandas Series, or a
/// sequence of floats.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        PyTypeError::new_err("expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64")
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// [`extract_f64_array`] copied into an owned `Array1`.
#[cfg(feature = "python-bindings")]
pub fn extract_vector<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>, name: &str,
) -> PyResult<Array1<f64>> {
    let arr = extract_f64_array(py, raw_data)?;
    let slice = arr.as_slice().map_err(|_| {
        PyValueError::new_err(format!("{name} must be a 1-D contiguous float64 array or sequence"))
    })?;
    Ok(Array1::from(slice.to_vec()))
}

/// One realization: a sequence of per-node timestamp arrays.
#[cfg(feature = "python-bindings")]
pub fn extract_realization<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>,
) -> PyResult<Vec<Array1<f64>>> {
    let nodes: Vec<Bound<'py, PyAny>> = raw.extract().map_err(|_| {
        PyTypeError::new_err("timestamps must be a list with one float64 array per node")
    })?;
    nodes.iter().map(|node| extract_vector(py, node, "timestamps")).collect()
}

/// Several realizations, or a single one wrapped into a list of one.
///
/// A single realization is recognized by its first element being a 1-D
/// array or a sequence of floats.
#[cfg(feature = "python-bindings")]
pub fn extract_realizations<'py>(
    py: Python<'py>, raw: &Bound<'py, PyAny>,
) -> PyResult<Vec<Vec<Array1<f64>>>> {
    let items: Vec<Bound<'py, PyAny>> = raw.extract().map_err(|_| {
        PyTypeError::new_err("timestamps must be a list of realizations or a single realization")
    })?;
    let single = match items.first() {
        Some(first) => extract_f64_array(py, first).is_ok(),
        None => true,
    };
    if single {
        return Ok(vec![extract_realization(py, raw)?]);
    }
    items.iter().map(|r| extract_realization(py, r)).collect()
}

/// Kernel matrix from a 2-D adjacency (one decay) or a 3-D adjacency
/// `(n, n, U)` with `U` decays.
#[cfg(feature = "python-bindings")]
pub fn build_kernel_matrix<'py>(
    adjacency: &Bound<'py, PyAny>, decays: &[f64],
) -> PyResult<KernelMatrix> {
    if let Ok(adj) = adjacency.extract::<PyReadonlyArray2<f64>>() {
        let adj: Array2<f64> = adj.as_array().to_owned();
        let decay = match decays {
            [decay] => *decay,
            _ => {
                return Err(PyValueError::new_err(
                    "a 2-D adjacency requires exactly one decay",
                ));
            }
        };
        return Ok(KernelMatrix::exp(&adj, decay)?);
    }
    if let Ok(adj) = adjacency.extract::<PyReadonlyArray3<f64>>() {
        let adj: Array3<f64> = adj.as_array().to_owned();
        return Ok(KernelMatrix::sum_exp(&adj, decays)?);
    }
    Err(PyTypeError::new_err("adjacency must be a 2-D or 3-D float64 numpy.ndarray"))
}

/// Mark transition rule: an explicit `(n_states, n_nodes)` table, or uniform
/// draws when `transitions` is `None`.
#[cfg(feature = "python-bindings")]
pub fn extract_mark_dynamics<'py>(
    transitions: Option<&Bound<'py, PyAny>>,
) -> PyResult<MarkDynamics> {
    match transitions {
        None => Ok(MarkDynamics::Uniform),
        Some(raw) => {
            let rows: Vec<Vec<usize>> = raw.extract().map_err(|_| {
                PyTypeError::new_err("transitions must be a 2-D sequence of state indices")
            })?;
            let n_cols = rows.first().map_or(0, Vec::len);
            if rows.iter().any(|r| r.len() != n_cols) {
                return Err(PyValueError::new_err("transitions rows must have equal lengths"));
            }
            let flat: Vec<usize> = rows.into_iter().flatten().collect();
            let next = Array2::from_shape_vec((flat.len() / n_cols.max(1), n_cols), flat)
                .map_err(|e| PyValueError::new_err(e.to_string()))?;
            Ok(MarkDynamics::Table { next })
        }
    }
}

/// Penalty from its name and parameters.
///
/// `ratio` applies to `elasticnet`, `bounds` to `box`; `range` restricts the
/// penalty to coordinates `[start, end)`.
#[cfg(feature = "python-bindings")]
pub fn build_prox(
    name: &str, strength: f64, range: Option<(usize, usize)>, positive: bool, ratio: Option<f64>,
    bounds: Option<(f64, f64)>,
) -> PyResult<Prox> {
    let kind = match name.parse::<ProxKind>()? {
        ProxKind::ElasticNet { ratio: default } => {
            ProxKind::ElasticNet { ratio: ratio.unwrap_or(default) }
        }
        ProxKind::Box { lower, upper } => {
            let (lower, upper) = bounds.unwrap_or((lower, upper));
            ProxKind::Box { lower, upper }
        }
        other => other,
    };
    let mut prox = Prox::new(kind, strength)?.with_positive(positive);
    if let Some((start, end)) = range {
        prox = prox.with_range(start, end)?;
    }
    Ok(prox)
}

/// Solver options from Python keyword arguments.
#[cfg(feature = "python-bindings")]
pub fn build_solver_options(
    solver: &str, step: f64, max_iter: usize, tol: Option<f64>, linesearch: bool, monotone: bool,
    step_type: &str, l_l2sq: f64, seed: u64, epoch_size: Option<usize>, record_every: usize,
    print_every: usize, verbose: bool,
) -> PyResult<SolverOptions> {
    let kind: SolverKind = solver.parse()?;
    let step_type: StepType = step_type.parse()?;
    let mut opts = SolverOptions::new(kind, step, max_iter)?
        .with_linesearch(linesearch)
        .with_monotone(monotone)
        .with_step_type(step_type)
        .with_l_l2sq(l_l2sq)?
        .with_seed(seed)
        .with_record_every(record_every)?
        .with_verbose(verbose, print_every)?;
    if let Some(tol) = tol {
        opts = opts.with_tol(tol)?;
    }
    if let Some(epoch_size) = epoch_size {
        opts = opts.with_epoch_size(epoch_size)?;
    }
    Ok(opts)
}
