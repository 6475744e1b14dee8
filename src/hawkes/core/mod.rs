//! core — shared Hawkes data, kernels, marks, and sufficient statistics.
//!
//! Purpose
//! -------
//! Collect the building blocks shared by the simulator and the models:
//! validated event data, kernel definitions, mark-state tables and dynamics,
//! the coefficient layout, option structs, and the precomputed weights every
//! exponential-family loss is evaluated from.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; kernel `(i, j)` carries the influence of node `j`
//!   on node `i`.
//! - This module does no I/O and no logging. Errors are reported via
//!   [`HawkesResult`](crate::hawkes::errors::HawkesResult).
pub mod data;
pub mod kernel_matrix;
pub mod kernels;
pub mod layout;
pub mod marks;
pub mod options;
pub mod validation;
pub mod weights;

pub use self::data::{EndTimes, HawkesData, Realization};
pub use self::kernel_matrix::KernelMatrix;
pub use self::kernels::{ExcitationState, HawkesKernel};
pub use self::layout::{ParamLayout, rescale_by_first_mark};
pub use self::marks::{MarkDynamics, MarkProcess, MarkTable};
pub use self::options::{ModelOptions, SimOpts};
pub use self::weights::RealizationWeights;
