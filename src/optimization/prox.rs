//! prox — penalties and their proximal operators.
//!
//! Purpose
//! -------
//! Represent the non-smooth part `g(x)` of a composite objective
//! `F(x) = loss(x) + g(x)` and evaluate `prox_{s·g}(x) = argmin_z
//! { g(z) + ||z − x||² / (2s) }` for the proximal solvers.
//!
//! Key behaviors
//! -------------
//! - Closed set of penalties ([`ProxKind`]): `Zero`, `L1`, `L2Sq`,
//!   `ElasticNet { ratio }`, `Positive`, `Box { lower, upper }`.
//! - Every penalty carries a `strength`, an optional coordinate `range`
//!   `[start, end)` it applies to, and a `positive` flag that additionally
//!   projects the affected coordinates onto `[0, ∞)`.
//! - [`ProxKind`] parses from a case-insensitive name; parametric variants
//!   get default parameters (`ratio = 0.5`, box `[0, 1]`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Coordinates outside `range` are returned unchanged by [`Prox::call`]
//!   and do not contribute to [`Prox::value`].
//! - Indicator penalties (`Positive`, `Box`) have value 0 on their domain;
//!   `value` does not check feasibility.
//! - `range` is checked against the parameter dimension by
//!   [`Prox::check_dim`] before a solve.
//!
//! Conventions
//! -----------
//! - `value(x) = strength · p(x[range])` with
//!   `p = ||·||₁`, `½||·||²`, `ratio·||·||₁ + (1 − ratio)·½||·||²`.
use std::{ops::Range, str::FromStr};

use ndarray::{Array1, ArrayView1, s};

use crate::optimization::errors::{OptError, OptResult};

/// Penalty family of a [`Prox`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProxKind {
    Zero,
    L1,
    L2Sq,
    ElasticNet { ratio: f64 },
    Positive,
    Box { lower: f64, upper: f64 },
}

impl FromStr for ProxKind {
    type Err = OptError;

    /// Accepts `"zero"`, `"l1"`, `"l2sq"`, `"elasticnet"`, `"positive"`,
    /// `"box"` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zero" => Ok(ProxKind::Zero),
            "l1" => Ok(ProxKind::L1),
            "l2sq" => Ok(ProxKind::L2Sq),
            "elasticnet" => Ok(ProxKind::ElasticNet { ratio: 0.5 }),
            "positive" => Ok(ProxKind::Positive),
            "box" => Ok(ProxKind::Box { lower: 0.0, upper: 1.0 }),
            _ => Err(OptError::InvalidProx {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'zero', 'l1', 'l2sq', \
                         'elasticnet', 'positive' or 'box'.",
            }),
        }
    }
}

/// Penalty with strength, optional coordinate range, and positivity flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Prox {
    pub kind: ProxKind,
    pub strength: f64,
    pub range: Option<Range<usize>>,
    pub positive: bool,
}

impl Prox {
    /// Validated penalty applied to every coordinate.
    ///
    /// # Errors
    /// - [`OptError::InvalidStrength`] for negative or non-finite strength.
    /// - [`OptError::InvalidRatio`] for an elastic-net ratio outside `[0, 1]`.
    /// - [`OptError::InvalidBox`] for NaN bounds or `lower > upper`.
    pub fn new(kind: ProxKind, strength: f64) -> OptResult<Self> {
        if !strength.is_finite() || strength < 0.0 {
            return Err(OptError::InvalidStrength { strength });
        }
        match kind {
            ProxKind::ElasticNet { ratio } if !(0.0..=1.0).contains(&ratio) => {
                return Err(OptError::InvalidRatio { ratio });
            }
            ProxKind::Box { lower, upper } if lower.is_nan() || upper.is_nan() || lower > upper => {
                return Err(OptError::InvalidBox { lower, upper });
            }
            _ => {}
        }
        Ok(Self { kind, strength, range: None, positive: false })
    }

    pub fn zero() -> Self {
        Self { kind: ProxKind::Zero, strength: 0.0, range: None, positive: false }
    }

    pub fn l1(strength: f64) -> OptResult<Self> {
        Self::new(ProxKind::L1, strength)
    }

    pub fn l2sq(strength: f64) -> OptResult<Self> {
        Self::new(ProxKind::L2Sq, strength)
    }

    pub fn elastic_net(strength: f64, ratio: f64) -> OptResult<Self> {
        Self::new(ProxKind::ElasticNet { ratio }, strength)
    }

    pub fn positive_orthant() -> Self {
        Self { kind: ProxKind::Positive, strength: 0.0, range: None, positive: true }
    }

    pub fn boxed(lower: f64, upper: f64) -> OptResult<Self> {
        Self::new(ProxKind::Box { lower, upper }, 0.0)
    }

    /// Restrict the penalty to coordinates `[start, end)`.
    ///
    /// # Errors
    /// [`OptError::InvalidRange`] if `start >= end`; the upper bound is
    /// checked against the dimension by [`Prox::check_dim`].
    pub fn with_range(mut self, start: usize, end: usize) -> OptResult<Self> {
        if start >= end {
            return Err(OptError::InvalidRange { start, end, dim: end });
        }
        self.range = Some(start..end);
        Ok(self)
    }

    pub fn with_positive(mut self, positive: bool) -> Self {
        self.positive = positive;
        self
    }

    /// Check that `range` fits a parameter vector of length `dim`.
    pub fn check_dim(&self, dim: usize) -> OptResult<()> {
        if let Some(r) = &self.range {
            if r.end > dim {
                return Err(OptError::InvalidRange { start: r.start, end: r.end, dim });
            }
        }
        Ok(())
    }

    /// Penalty value `g(x)`.
    pub fn value(&self, x: ArrayView1<f64>) -> f64 {
        let x = self.restrict(x);
        match self.kind {
            ProxKind::Zero | ProxKind::Positive | ProxKind::Box { .. } => 0.0,
            ProxKind::L1 => self.strength * l1_norm(x),
            ProxKind::L2Sq => self.strength * 0.5 * x.dot(&x),
            ProxKind::ElasticNet { ratio } => {
                self.strength * (ratio * l1_norm(x) + (1.0 - ratio) * 0.5 * x.dot(&x))
            }
        }
    }

    /// Proximal operator `prox_{step·g}(x)`.
    pub fn call(&self, x: ArrayView1<f64>, step: f64) -> Array1<f64> {
        let mut out = x.to_owned();
        self.call_in_place(&mut out, step);
        out
    }

    /// [`Prox::call`] overwriting `x`.
    pub fn call_in_place(&self, x: &mut Array1<f64>, step: f64) {
        let (start, end) = clamp_range(self.range.as_ref(), x.len());
        let thresh = step * self.strength;
        let kind = self.kind;
        let positive = self.positive;
        x.slice_mut(s![start..end]).mapv_inplace(|v| {
            let v = match kind {
                ProxKind::Zero => v,
                ProxKind::L1 => soft_threshold(v, thresh),
                ProxKind::L2Sq => v / (1.0 + thresh),
                ProxKind::ElasticNet { ratio } => {
                    soft_threshold(v, thresh * ratio) / (1.0 + thresh * (1.0 - ratio))
                }
                ProxKind::Positive => v.max(0.0),
                ProxKind::Box { lower, upper } => v.clamp(lower, upper),
            };
            if positive { v.max(0.0) } else { v }
        });
    }

    fn restrict<'a>(&self, x: ArrayView1<'a, f64>) -> ArrayView1<'a, f64> {
        let (start, end) = clamp_range(self.range.as_ref(), x.len());
        x.slice_move(s![start..end])
    }
}

impl Default for Prox {
    fn default() -> Self {
        Self::zero()
    }
}

fn clamp_range(range: Option<&Range<usize>>, dim: usize) -> (usize, usize) {
    match range {
        Some(r) => {
            let end = r.end.min(dim);
            (r.start.min(end), end)
        }
        None => (0, dim),
    }
}

fn soft_threshold(v: f64, thresh: f64) -> f64 {
    if v > thresh {
        v - thresh
    } else if v < -thresh {
        v + thresh
    } else {
        0.0
    }
}

fn l1_norm(x: ArrayView1<f64>) -> f64 {
    x.iter().map(|v| v.abs()).sum()
}
