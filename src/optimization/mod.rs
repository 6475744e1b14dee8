//! optimization — penalties, proximal solvers, and a unified error surface.
//!
//! Purpose
//! -------
//! Fit Hawkes models by minimizing a penalized contrast
//! `F(x) = loss(x) + g(x)`. Callers pick a penalty ([`prox::Prox`]) and a
//! solver ([`solvers::Solver`]) and obtain the solution together with the
//! objective history and evaluation counters.
//!
//! Key behaviors
//! -------------
//! - [`prox`]: closed set of penalties with their values and proximal
//!   operators, optionally restricted to a coordinate range.
//! - [`solvers`]: GD, AGD, SGD, SVRG and SDCA on top of argmin.
//! - [`errors`]: configuration issues, solver-state misuse, numerical
//!   failures and backend errors normalized into [`errors::OptError`].
//!
//! Conventions
//! -----------
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw argmin errors. Model errors arrive wrapped as
//!   `OptError::Hawkes`.
//! - This module does no I/O; progress printing is left to the optional
//!   slog observer.
pub mod errors;
pub mod prox;
pub mod solvers;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_hawkes::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::prox::{Prox, ProxKind};
    pub use super::solvers::prelude::*;
}
