//! Kernel matrix — the `n × n` excitation grid of a multivariate Hawkes process.
//!
//! Entry `(i, j)` is the kernel through which events of node `j` excite
//! node `i`. Kernels are stored row-major. Sum-of-exponentials grids share one
//! decay vector across all entries and carry a weight vector per edge.
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, Array3};

use crate::hawkes::{
    core::kernels::HawkesKernel,
    errors::{HawkesError, HawkesResult},
};

/// Square grid of [`HawkesKernel`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelMatrix {
    n_nodes: usize,
    kernels: Vec<HawkesKernel>,
}

impl KernelMatrix {
    /// Build from nested rows: `rows[i][j]` is the kernel from `j` onto `i`.
    ///
    /// # Errors
    /// - [`HawkesError::NoNodes`] for an empty grid.
    /// - [`HawkesError::KernelMatrixShape`] if any row is not of length `n`.
    pub fn new(rows: Vec<Vec<HawkesKernel>>) -> HawkesResult<Self> {
        let n_nodes = rows.len();
        if n_nodes == 0 {
            return Err(HawkesError::NoNodes);
        }
        let mut kernels = Vec::with_capacity(n_nodes * n_nodes);
        for row in rows {
            if row.len() != n_nodes {
                return Err(HawkesError::KernelMatrixShape {
                    expected: (n_nodes, n_nodes),
                    found: (n_nodes, row.len()),
                });
            }
            kernels.extend(row);
        }
        Ok(Self { n_nodes, kernels })
    }

    /// Exponential kernels sharing one decay; `adjacency[[i, j]]` is the L1
    /// norm of kernel `(i, j)`. Zero entries become null kernels.
    pub fn exp(adjacency: &Array2<f64>, decay: f64) -> HawkesResult<Self> {
        let (n, m) = adjacency.dim();
        if n != m {
            return Err(HawkesError::KernelMatrixShape { expected: (n, n), found: (n, m) });
        }
        let rows = adjacency
            .outer_iter()
            .map(|row| {
                row.iter()
                    .map(|&a| {
                        if a == 0.0 {
                            HawkesKernel::exp(a, decay).map(|_| HawkesKernel::Zero)
                        } else {
                            HawkesKernel::exp(a, decay)
                        }
                    })
                    .collect::<HawkesResult<Vec<_>>>()
            })
            .collect::<HawkesResult<Vec<_>>>()?;
        Self::new(rows)
    }

    /// Sum-of-exponentials kernels sharing `decays`; `adjacency[[i, j, u]]`
    /// is the weight of decay `u` on edge `(i, j)`.
    pub fn sum_exp(adjacency: &Array3<f64>, decays: &[f64]) -> HawkesResult<Self> {
        let (n, m, u) = adjacency.dim();
        if n != m {
            return Err(HawkesError::KernelMatrixShape { expected: (n, n), found: (n, m) });
        }
        if u != decays.len() {
            return Err(HawkesError::SumExpLengthMismatch { intensities: u, decays: decays.len() });
        }
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let mut row = Vec::with_capacity(n);
            for j in 0..n {
                let weights = adjacency.slice(ndarray::s![i, j, ..]).to_vec();
                row.push(HawkesKernel::sum_exp(weights, decays.to_vec())?);
            }
            rows.push(row);
        }
        Self::new(rows)
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Kernel from node `j` onto node `i`.
    pub fn get(&self, i: usize, j: usize) -> &HawkesKernel {
        &self.kernels[i * self.n_nodes + j]
    }

    /// Matrix of kernel L1 norms.
    pub fn norms(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.n_nodes, self.n_nodes), |(i, j)| self.get(i, j).norm())
    }

    /// Spectral radius of `diag(row_scale) · |norms|`.
    ///
    /// Largest modulus among the complex eigenvalues from nalgebra's real
    /// Schur decomposition, so non-normal and periodic grids are handled
    /// exactly rather than by iteration.
    pub fn spectral_radius(&self, row_scale: Option<&Array1<f64>>) -> f64 {
        let mut a = self.norms().mapv(f64::abs);
        if let Some(scale) = row_scale {
            for (mut row, &s) in a.outer_iter_mut().zip(scale.iter()) {
                row *= s.abs();
            }
        }
        to_dmatrix(&a).complex_eigenvalues().iter().map(|z| z.norm()).fold(0.0, f64::max)
    }
}

/// Copy a square `ndarray` matrix into a `nalgebra::DMatrix`.
fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    let (n_rows, n_cols) = a.dim();
    DMatrix::from_fn(n_rows, n_cols, |i, j| a[[i, j]])
}
