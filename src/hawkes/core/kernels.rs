//! Hawkes kernels — univariate time-decaying excitation functions.
//!
//! Purpose
//! -------
//! Represent the influence `φ(t)` that one event has on a node's intensity
//! `t ≥ 0` time units later, and provide the evaluation primitives used by the
//! thinning simulator.
//!
//! Key behaviors
//! -------------
//! - [`HawkesKernel`] is a closed set of variants: `Zero`, `Exp`
//!   (`φ(t) = α β e^{-βt}`), `SumExp` (`Σ_u α_u β_u e^{-β_u t}`) and
//!   `PowerLaw` (`φ(t) = m (c + t)^{-e}` truncated at a finite support).
//! - Every kernel supports point evaluation, its primitive `∫_0^t φ`, its
//!   L1 norm, and a brute-force convolution over an event history.
//! - [`ExcitationState`] tracks the contribution of one upstream node in an
//!   event-driven simulation; exponential kernels use an exact recursive
//!   update, other kernels fall back to the convolution.
//!
//! Invariants & assumptions
//! ------------------------
//! - `φ(t) = 0` for `t < 0` (strict causality) and for `t ≥ support`.
//! - Decays, cutoffs and exponents are finite and strictly positive;
//!   intensities and multipliers are finite but may be negative
//!   (inhibition). Negative contributions are allowed here; the simulator is
//!   responsible for rejecting negative total intensities.
//! - Each exponential component is monotone towards zero, so the positive
//!   part of a contribution can only decrease between events. The simulator
//!   relies on this to build its thinning envelope.
//!
//! Conventions
//! -----------
//! - `Exp { intensity, decay }` uses the "intensity = L1 norm" convention,
//!   i.e. `‖φ‖₁ = intensity`.
//! - History slices are sorted, strictly increasing timestamps of a single
//!   upstream node.
use crate::hawkes::errors::{HawkesError, HawkesResult};

/// Absolute level below which a power-law kernel is treated as zero when no
/// explicit support is given.
pub const POWER_LAW_ERROR: f64 = 1e-5;

/// Univariate Hawkes kernel.
#[derive(Debug, Clone, PartialEq)]
pub enum HawkesKernel {
    /// `φ ≡ 0`.
    Zero,
    /// `φ(t) = intensity · decay · e^{-decay·t}`.
    Exp { intensity: f64, decay: f64 },
    /// `φ(t) = Σ_u intensities[u] · decays[u] · e^{-decays[u]·t}`.
    SumExp { intensities: Vec<f64>, decays: Vec<f64> },
    /// `φ(t) = multiplier · (cutoff + t)^{-exponent}` for `t < support`.
    PowerLaw { multiplier: f64, cutoff: f64, exponent: f64, support: f64 },
}

impl HawkesKernel {
    /// Null kernel.
    pub fn zero() -> Self {
        HawkesKernel::Zero
    }

    /// Exponential kernel with L1 norm `intensity` and rate `decay`.
    ///
    /// # Errors
    /// - [`HawkesError::InvalidKernelParam`] if `intensity` is non-finite or
    ///   `decay` is non-finite or not strictly positive.
    pub fn exp(intensity: f64, decay: f64) -> HawkesResult<Self> {
        check_finite("intensity", intensity)?;
        check_positive("decay", decay)?;
        Ok(HawkesKernel::Exp { intensity, decay })
    }

    /// Sum-of-exponentials kernel; `intensities[u]` pairs with `decays[u]`.
    ///
    /// # Errors
    /// - [`HawkesError::SumExpLengthMismatch`] if lengths differ or are zero.
    /// - [`HawkesError::InvalidKernelParam`] for non-finite intensities or
    ///   non-positive decays.
    pub fn sum_exp(intensities: Vec<f64>, decays: Vec<f64>) -> HawkesResult<Self> {
        if intensities.len() != decays.len() || decays.is_empty() {
            return Err(HawkesError::SumExpLengthMismatch {
                intensities: intensities.len(),
                decays: decays.len(),
            });
        }
        for &a in &intensities {
            check_finite("intensity", a)?;
        }
        for &b in &decays {
            check_positive("decay", b)?;
        }
        Ok(HawkesKernel::SumExp { intensities, decays })
    }

    /// Power-law kernel `m (c + t)^{-e}`.
    ///
    /// When `support` is `None` the kernel is cut where `|φ|` drops below
    /// [`POWER_LAW_ERROR`].
    ///
    /// # Errors
    /// - [`HawkesError::InvalidKernelParam`] for a non-finite multiplier,
    ///   non-positive cutoff/exponent, or non-positive explicit support.
    pub fn power_law(
        multiplier: f64, cutoff: f64, exponent: f64, support: Option<f64>,
    ) -> HawkesResult<Self> {
        check_finite("multiplier", multiplier)?;
        check_positive("cutoff", cutoff)?;
        check_positive("exponent", exponent)?;
        let support = match support {
            Some(s) => {
                check_positive("support", s)?;
                s
            }
            None => {
                let s = (multiplier.abs() / POWER_LAW_ERROR).powf(1.0 / exponent) - cutoff;
                s.max(0.0)
            }
        };
        Ok(HawkesKernel::PowerLaw { multiplier, cutoff, exponent, support })
    }

    /// `true` for the null kernel or an exponential family kernel whose
    /// weights are all zero.
    pub fn is_zero(&self) -> bool {
        match self {
            HawkesKernel::Zero => true,
            HawkesKernel::Exp { intensity, .. } => *intensity == 0.0,
            HawkesKernel::SumExp { intensities, .. } => intensities.iter().all(|&a| a == 0.0),
            HawkesKernel::PowerLaw { multiplier, support, .. } => {
                *multiplier == 0.0 || *support == 0.0
            }
        }
    }

    /// Time after which the kernel is identically zero.
    pub fn support(&self) -> f64 {
        match self {
            HawkesKernel::Zero => 0.0,
            HawkesKernel::Exp { .. } | HawkesKernel::SumExp { .. } => f64::INFINITY,
            HawkesKernel::PowerLaw { support, .. } => *support,
        }
    }

    /// Evaluate `φ(t)`.
    pub fn value(&self, t: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        match self {
            HawkesKernel::Zero => 0.0,
            HawkesKernel::Exp { intensity, decay } => intensity * decay * (-decay * t).exp(),
            HawkesKernel::SumExp { intensities, decays } => intensities
                .iter()
                .zip(decays)
                .map(|(a, b)| a * b * (-b * t).exp())
                .sum(),
            HawkesKernel::PowerLaw { multiplier, cutoff, exponent, support } => {
                if t >= *support {
                    0.0
                } else {
                    multiplier * (cutoff + t).powf(-exponent)
                }
            }
        }
    }

    /// Evaluate `∫_0^t φ(s) ds`.
    pub fn primitive(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        match self {
            HawkesKernel::Zero => 0.0,
            HawkesKernel::Exp { intensity, decay } => intensity * (1.0 - (-decay * t).exp()),
            HawkesKernel::SumExp { intensities, decays } => intensities
                .iter()
                .zip(decays)
                .map(|(a, b)| a * (1.0 - (-b * t).exp()))
                .sum(),
            HawkesKernel::PowerLaw { multiplier, cutoff, exponent, support } => {
                let t = t.min(*support);
                if (exponent - 1.0).abs() < f64::EPSILON {
                    multiplier * ((cutoff + t) / cutoff).ln()
                } else {
                    let p = 1.0 - exponent;
                    multiplier / p * ((cutoff + t).powf(p) - cutoff.powf(p))
                }
            }
        }
    }

    /// L1 norm `∫_0^∞ φ`, the expected number of children per parent event.
    pub fn norm(&self) -> f64 {
        match self {
            HawkesKernel::Zero => 0.0,
            HawkesKernel::Exp { intensity, .. } => *intensity,
            HawkesKernel::SumExp { intensities, .. } => intensities.iter().sum(),
            HawkesKernel::PowerLaw { support, .. } => self.primitive(*support),
        }
    }

    /// `Σ_k φ(t - t_k)` over the events of `history` strictly before `t`.
    pub fn convolution(&self, t: f64, history: &[f64]) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let end = history.partition_point(|&s| s < t);
        let support = self.support();
        let start = if support.is_finite() {
            history[..end].partition_point(|&s| t - s >= support)
        } else {
            0
        };
        history[start..end].iter().map(|&s| self.value(t - s)).sum()
    }

    /// `(jump, decay)` pairs for exponential-family kernels, where `jump`
    /// is the increase of the contribution right after a parent event.
    /// `None` for kernels without a recursive form.
    pub fn exp_components(&self) -> Option<Vec<(f64, f64)>> {
        match self {
            HawkesKernel::Zero => Some(Vec::new()),
            HawkesKernel::Exp { intensity, decay } => Some(vec![(intensity * decay, *decay)]),
            HawkesKernel::SumExp { intensities, decays } => {
                Some(intensities.iter().zip(decays).map(|(a, b)| (a * b, *b)).collect())
            }
            HawkesKernel::PowerLaw { .. } => None,
        }
    }
}

/// Contribution of one upstream node to one downstream intensity during an
/// event-driven simulation.
///
/// The exponential family keeps one value per component at the time of the
/// last parent event and decays it lazily; other kernels re-run the
/// convolution over the upstream history on every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExcitationState {
    Zero,
    Recursive { jumps: Vec<f64>, decays: Vec<f64>, values: Vec<f64>, last_time: f64 },
    Convolution { kernel: HawkesKernel },
}

impl ExcitationState {
    /// Fresh state (no past events) for `kernel`.
    pub fn new(kernel: &HawkesKernel) -> Self {
        if kernel.is_zero() {
            return ExcitationState::Zero;
        }
        match kernel.exp_components() {
            Some(components) => {
                let (jumps, decays): (Vec<f64>, Vec<f64>) = components.into_iter().unzip();
                let values = vec![0.0; jumps.len()];
                ExcitationState::Recursive { jumps, decays, values, last_time: 0.0 }
            }
            None => ExcitationState::Convolution { kernel: kernel.clone() },
        }
    }

    /// Contribution at time `t` (no later than the next parent event).
    pub fn value_at(&self, t: f64, history: &[f64]) -> f64 {
        match self {
            ExcitationState::Zero => 0.0,
            ExcitationState::Recursive { decays, values, last_time, .. } => {
                let dt = t - last_time;
                values.iter().zip(decays).map(|(v, b)| v * (-b * dt).exp()).sum()
            }
            ExcitationState::Convolution { kernel } => kernel.convolution(t, history),
        }
    }

    /// Upper bound of the contribution on `[t, next parent event)`.
    pub fn positive_bound_at(&self, t: f64, history: &[f64]) -> f64 {
        match self {
            ExcitationState::Zero => 0.0,
            ExcitationState::Recursive { decays, values, last_time, .. } => {
                let dt = t - last_time;
                values.iter().zip(decays).map(|(v, b)| (v * (-b * dt).exp()).max(0.0)).sum()
            }
            ExcitationState::Convolution { kernel } => {
                // each term keeps the sign of the multiplier and shrinks in magnitude;
                // a parent at exactly `t` counts from `t` on
                let end = history.partition_point(|&s| s <= t);
                history[..end].iter().map(|&s| kernel.value(t - s)).sum::<f64>().max(0.0)
            }
        }
    }

    /// Register a parent event at time `t`.
    pub fn jump(&mut self, t: f64) {
        if let ExcitationState::Recursive { jumps, decays, values, last_time } = self {
            let dt = t - *last_time;
            for ((v, b), j) in values.iter_mut().zip(decays.iter()).zip(jumps.iter()) {
                *v = *v * (-b * dt).exp() + j;
            }
            *last_time = t;
        }
    }
}

// ---- Helpers ----

fn check_finite(param: &'static str, value: f64) -> HawkesResult<()> {
    if !value.is_finite() {
        return Err(HawkesError::InvalidKernelParam { param, value, reason: "must be finite" });
    }
    Ok(())
}

fn check_positive(param: &'static str, value: f64) -> HawkesResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(HawkesError::InvalidKernelParam {
            param,
            value,
            reason: "must be finite and > 0",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Evaluation, primitive and norm of every kernel variant.
    // - Agreement between the recursive exponential state and the brute-force
    //   convolution.
    // - Constructor validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The exponential kernel follows φ(t) = α β e^{-βt} with ‖φ‖₁ = α.
    //
    // Given
    // -----
    // - α = 0.7, β = 3.
    //
    // Expect
    // ------
    // - φ(0) = 2.1, φ(t < 0) = 0, primitive(∞) → α, norm = α.
    fn exp_kernel_value_primitive_norm() {
        let k = HawkesKernel::exp(0.7, 3.0).expect("valid kernel");

        assert_relative_eq!(k.value(0.0), 2.1, epsilon = 1e-14);
        assert_relative_eq!(k.value(0.5), 2.1 * (-1.5_f64).exp(), epsilon = 1e-14);
        assert_eq!(k.value(-0.1), 0.0);
        assert_relative_eq!(k.primitive(50.0), 0.7, epsilon = 1e-12);
        assert_relative_eq!(k.norm(), 0.7);
    }

    #[test]
    // Purpose
    // -------
    // A sum of exponentials is the sum of its components.
    fn sum_exp_matches_component_sum() {
        let k = HawkesKernel::sum_exp(vec![0.2, 0.3], vec![1.0, 4.0]).expect("valid kernel");
        let a = HawkesKernel::exp(0.2, 1.0).expect("valid kernel");
        let b = HawkesKernel::exp(0.3, 4.0).expect("valid kernel");

        for &t in &[0.0, 0.1, 1.3, 7.0] {
            assert_relative_eq!(k.value(t), a.value(t) + b.value(t), epsilon = 1e-14);
            assert_relative_eq!(k.primitive(t), a.primitive(t) + b.primitive(t), epsilon = 1e-14);
        }
        assert_relative_eq!(k.norm(), 0.5);
    }

    #[test]
    // Purpose
    // -------
    // The power-law kernel is truncated at its support and its primitive
    // matches a numerical quadrature.
    //
    // Given
    // -----
    // - m = 0.5, c = 1, e = 2, support = 10.
    //
    // Expect
    // ------
    // - φ(t ≥ 10) = 0.
    // - primitive(10) = 0.5 (1 - 1/11).
    fn power_law_support_and_primitive() {
        let k = HawkesKernel::power_law(0.5, 1.0, 2.0, Some(10.0)).expect("valid kernel");

        assert_eq!(k.value(10.0), 0.0);
        assert_relative_eq!(k.value(1.0), 0.125, epsilon = 1e-14);
        assert_relative_eq!(k.primitive(10.0), 0.5 * (1.0 - 1.0 / 11.0), epsilon = 1e-12);
        assert_relative_eq!(k.norm(), k.primitive(20.0), epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // Without explicit support, the power law is cut where it drops below the
    // error level.
    fn power_law_default_support_is_error_level() {
        let k = HawkesKernel::power_law(1.0, 1.0, 1.0, None).expect("valid kernel");

        let support = k.support();
        assert_relative_eq!(support, 1e5 - 1.0, epsilon = 1e-6);
        assert!(k.value(support - 1.0) >= POWER_LAW_ERROR * 0.99);
    }

    #[test]
    // Purpose
    // -------
    // The recursive exponential state reproduces the convolution exactly.
    //
    // Given
    // -----
    // - A sum-exp kernel and four parent events.
    //
    // Expect
    // ------
    // - `value_at(t)` equals `convolution(t, history)` between and after events.
    fn recursive_state_matches_convolution() {
        let k = HawkesKernel::sum_exp(vec![0.4, -0.1], vec![2.0, 5.0]).expect("valid kernel");
        let history = [0.3, 0.9, 1.0, 2.5];
        let mut state = ExcitationState::new(&k);

        for &t in &history {
            state.jump(t);
        }

        for &t in &[2.5001, 3.0, 4.7] {
            assert_relative_eq!(
                state.value_at(t, &history),
                k.convolution(t, &history),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    // Purpose
    // -------
    // The positive bound ignores inhibiting components.
    fn positive_bound_drops_negative_components() {
        let k = HawkesKernel::sum_exp(vec![0.4, -0.6], vec![2.0, 5.0]).expect("valid kernel");
        let mut state = ExcitationState::new(&k);
        state.jump(1.0);

        let bound = state.positive_bound_at(1.0, &[1.0]);
        let value = state.value_at(1.0, &[1.0]);

        assert_relative_eq!(bound, 0.8, epsilon = 1e-14);
        assert!(value < bound);
    }

    #[test]
    // Purpose
    // -------
    // The power-law bound includes a parent event at the evaluation time.
    fn power_law_bound_counts_parent_at_current_time() {
        let k = HawkesKernel::power_law(0.5, 1.0, 2.0, Some(10.0)).expect("valid kernel");
        let state = ExcitationState::new(&k);
        let history = [0.0, 1.0];

        let bound = state.positive_bound_at(1.0, &history);

        assert_relative_eq!(bound, 0.5 + 0.125, epsilon = 1e-14);
        assert_relative_eq!(state.value_at(1.0, &history), 0.125, epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // Invalid parameters are rejected at construction.
    fn constructors_reject_invalid_parameters() {
        let err = HawkesKernel::exp(0.5, 0.0).expect_err("zero decay must fail");
        match err {
            HawkesError::InvalidKernelParam { param, .. } => assert_eq!(param, "decay"),
            other => panic!("Unexpected error: {other:?}"),
        }

        let err = HawkesKernel::sum_exp(vec![0.1], vec![1.0, 2.0])
            .expect_err("length mismatch must fail");
        assert_eq!(err, HawkesError::SumExpLengthMismatch { intensities: 1, decays: 2 });

        assert!(HawkesKernel::exp(f64::NAN, 1.0).is_err());
        assert!(HawkesKernel::power_law(1.0, -1.0, 2.0, None).is_err());
    }
}
