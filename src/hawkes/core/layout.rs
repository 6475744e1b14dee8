//! Parameter layout — index map between flat coefficient vectors and Hawkes
//! parameters, plus the post-fit rescaling of mark multipliers.
//!
//! Purpose
//! -------
//! Every model, prox range and normalizer addresses the same flat vector, so
//! the block structure lives in one place.
//!
//! Conventions
//! -----------
//! - Baselines first: `n` entries, or `n · n_states` when baselines vary per
//!   mark state (index `i · n_states + q`).
//! - Kernel weights next, row-major over `(i, j, u)`:
//!   `alpha_offset + i · n · U + j · U + u`, where `U` is the number of decays
//!   and `(i, j)` is the influence of node `j` on node `i`.
//! - Mark multipliers last (custom-mark models only), grouped per node:
//!   `mark_offset + i · n_states + q`.
use ndarray::{Array1, ArrayView1, ArrayViewMut1, s};
use std::ops::Range;

use crate::hawkes::errors::{HawkesError, HawkesResult};

/// Block structure of a Hawkes coefficient vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamLayout {
    pub n_nodes: usize,
    pub n_decays: usize,
    pub n_states: usize,
    /// `true` when the intensity is scaled by learned mark multipliers.
    pub has_mark_multipliers: bool,
    /// `true` when baselines are indexed by mark state.
    pub per_state_baselines: bool,
}

impl ParamLayout {
    /// `[μ (n) | α (n²U)]`.
    pub fn hawkes(n_nodes: usize, n_decays: usize) -> Self {
        Self {
            n_nodes,
            n_decays,
            n_states: 1,
            has_mark_multipliers: false,
            per_state_baselines: false,
        }
    }

    /// `[μ (n) | α (n²U) | f (n · n_states)]`.
    pub fn custom(n_nodes: usize, n_decays: usize, n_states: usize) -> Self {
        Self {
            n_nodes,
            n_decays,
            n_states,
            has_mark_multipliers: true,
            per_state_baselines: false,
        }
    }

    /// `[μ (n · n_states) | α (n²U)]`.
    pub fn per_state_baseline(n_nodes: usize, n_decays: usize, n_states: usize) -> Self {
        Self {
            n_nodes,
            n_decays,
            n_states,
            has_mark_multipliers: false,
            per_state_baselines: true,
        }
    }

    /// Kernel weights per node row (`n · U`).
    pub fn row_width(&self) -> usize {
        self.n_nodes * self.n_decays
    }

    pub fn n_baselines(&self) -> usize {
        if self.per_state_baselines { self.n_nodes * self.n_states } else { self.n_nodes }
    }

    pub fn alpha_offset(&self) -> usize {
        self.n_baselines()
    }

    pub fn mark_offset(&self) -> usize {
        self.alpha_offset() + self.n_nodes * self.row_width()
    }

    pub fn n_coeffs(&self) -> usize {
        let marks = if self.has_mark_multipliers { self.n_nodes * self.n_states } else { 0 };
        self.mark_offset() + marks
    }

    /// Baseline coordinates of node `i` (one, or one per state).
    pub fn baseline_range(&self, i: usize) -> Range<usize> {
        if self.per_state_baselines {
            i * self.n_states..(i + 1) * self.n_states
        } else {
            i..i + 1
        }
    }

    /// Kernel weights `α_{i, ·, ·}` of node `i`.
    pub fn alpha_range(&self, i: usize) -> Range<usize> {
        let start = self.alpha_offset() + i * self.row_width();
        start..start + self.row_width()
    }

    pub fn alpha_index(&self, i: usize, j: usize, u: usize) -> usize {
        self.alpha_offset() + i * self.row_width() + j * self.n_decays + u
    }

    /// Mark multipliers `f_i[·]` of node `i` (empty without multipliers).
    pub fn mark_range(&self, i: usize) -> Range<usize> {
        if !self.has_mark_multipliers {
            return self.mark_offset()..self.mark_offset();
        }
        let start = self.mark_offset() + i * self.n_states;
        start..start + self.n_states
    }

    /// All coordinates tied to node `i`, in block order.
    pub fn node_ranges(&self, i: usize) -> [Range<usize>; 3] {
        [self.baseline_range(i), self.alpha_range(i), self.mark_range(i)]
    }

    pub fn baselines<'a>(&self, coeffs: ArrayView1<'a, f64>, i: usize) -> ArrayView1<'a, f64> {
        let r = self.baseline_range(i);
        coeffs.slice_move(s![r.start..r.end])
    }

    pub fn alpha_row<'a>(&self, coeffs: ArrayView1<'a, f64>, i: usize) -> ArrayView1<'a, f64> {
        let r = self.alpha_range(i);
        coeffs.slice_move(s![r.start..r.end])
    }

    pub fn marks<'a>(&self, coeffs: ArrayView1<'a, f64>, i: usize) -> ArrayView1<'a, f64> {
        let r = self.mark_range(i);
        coeffs.slice_move(s![r.start..r.end])
    }
}

/// Fix the scale ambiguity of custom-mark solutions in place.
///
/// The intensity `f_i[q] · (μ_i + Σ α_{i··} g)` is unchanged when `f_i` is
/// divided by a constant and `(μ_i, α_{i··})` multiplied by it. For each node
/// `i`, with `m = f_i[0]`, this multiplies `μ_i` and `α_{i··}` by `m` and
/// divides `f_i` by `m`, so that `f_i[0] = 1` afterwards.
///
/// # Errors
/// - [`HawkesError::CoeffsLengthMismatch`] if `coeffs` does not match the
///   layout.
/// - [`HawkesError::ZeroMarkMultiplier`] if some `f_i[0]` is zero.
pub fn rescale_by_first_mark(coeffs: &mut Array1<f64>, layout: &ParamLayout) -> HawkesResult<()> {
    if coeffs.len() != layout.n_coeffs() {
        return Err(HawkesError::CoeffsLengthMismatch {
            expected: layout.n_coeffs(),
            found: coeffs.len(),
        });
    }
    if !layout.has_mark_multipliers {
        return Ok(());
    }
    for i in 0..layout.n_nodes {
        let m = coeffs[layout.mark_range(i).start];
        if m == 0.0 {
            return Err(HawkesError::ZeroMarkMultiplier { node: i });
        }
        scale_block(coeffs.view_mut(), layout.baseline_range(i), m);
        scale_block(coeffs.view_mut(), layout.alpha_range(i), m);
        scale_block(coeffs.view_mut(), layout.mark_range(i), 1.0 / m);
    }
    Ok(())
}

fn scale_block(mut coeffs: ArrayViewMut1<f64>, range: Range<usize>, factor: f64) {
    coeffs.slice_mut(s![range.start..range.end]).mapv_inplace(|v| v * factor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Custom-mark layout has n + n² + n·MaxN coefficients for one decay.
    fn custom_layout_counts_coefficients() {
        let layout = ParamLayout::custom(2, 1, 5);

        assert_eq!(layout.n_coeffs(), 2 + 4 + 10);
        assert_eq!(layout.alpha_range(1), 4..6);
        assert_eq!(layout.mark_range(1), 11..16);
        assert_eq!(layout.alpha_index(1, 0, 0), 4);
    }

    #[test]
    // Purpose
    // -------
    // Sum-exp and per-state-baseline layouts follow the documented offsets.
    fn sum_exp_and_per_state_layouts() {
        let sum_exp = ParamLayout::hawkes(2, 3);
        assert_eq!(sum_exp.n_coeffs(), 14);
        assert_eq!(sum_exp.alpha_index(1, 1, 2), 2 + 6 + 3 + 2);

        let qrh = ParamLayout::per_state_baseline(2, 2, 3);
        assert_eq!(qrh.n_coeffs(), 6 + 8);
        assert_eq!(qrh.baseline_range(1), 3..6);
        assert_eq!(qrh.alpha_range(0), 6..10);
        assert!(qrh.mark_range(0).is_empty());
    }

    #[test]
    // Purpose
    // -------
    // Rescaling sets every f_i[0] to one and moves the scale onto μ and α.
    //
    // Given
    // -----
    // - Two nodes, one decay, two states; f_0 = [2, 1], f_1 = [0.5, 1].
    //
    // Expect
    // ------
    // - μ_0, α_0· doubled and f_0 = [1, 0.5].
    // - μ_1, α_1· halved and f_1 = [1, 2].
    fn rescale_moves_scale_onto_baseline_and_kernel_rows() {
        let layout = ParamLayout::custom(2, 1, 2);
        let mut coeffs = array![1.0, 1.0, 0.1, 0.2, 0.3, 0.4, 2.0, 1.0, 0.5, 1.0];

        rescale_by_first_mark(&mut coeffs, &layout).expect("rescale succeeds");

        let expected = array![2.0, 0.5, 0.2, 0.4, 0.15, 0.2, 1.0, 0.5, 1.0, 2.0];
        for (a, b) in coeffs.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // A zero state-0 multiplier cannot be normalized.
    fn rescale_rejects_zero_first_multiplier() {
        let layout = ParamLayout::custom(1, 1, 2);
        let mut coeffs = array![1.0, 0.5, 0.0, 1.0];

        let err = rescale_by_first_mark(&mut coeffs, &layout).expect_err("must fail");

        assert_eq!(err, HawkesError::ZeroMarkMultiplier { node: 0 });
    }
}
