//! Sufficient statistics of exponential-family Hawkes models.
//!
//! Purpose
//! -------
//! With decays fixed, every loss in this crate is a low-degree polynomial (or
//! a log of an affine form) in the coefficients. [`RealizationWeights`]
//! precomputes, once per `fit`, the quantities those losses need so that
//! `loss`/`grad` calls never walk the event list again.
//!
//! Key behaviors
//! -------------
//! - For each upstream coordinate `a = j · U + u` the excitation
//!   `g_a(t) = Σ_{t_k^j < t} β_u e^{-β_u (t - t_k^j)}` is propagated exactly
//!   between consecutive events of the merged sequence.
//! - Every inter-event interval is charged to the mark state in force on it,
//!   producing per-state integrals of `1`, `g_a` and (optionally) `g_a g_b`.
//! - Left limits `g(t_k-)` are stored per downstream node, together with the
//!   state in which each event occurred.
//!
//! Invariants & assumptions
//! ------------------------
//! - Input realizations and `global_n` sequences are already validated by
//!   [`HawkesData`].
//! - Event `k` of the merged sequence occurs in state `global_n[k]`; the state
//!   after it is `global_n[k + 1]`. Without marks every state is `0`.
//!
//! Conventions
//! -----------
//! - Column `a` of every `n · U` wide array is `j · U + u`, matching the
//!   kernel-weight block of [`ParamLayout`](crate::hawkes::core::layout::ParamLayout).
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::hawkes::core::data::{HawkesData, Realization};

/// Per-realization sufficient statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizationWeights {
    pub n_nodes: usize,
    pub n_decays: usize,
    pub n_states: usize,
    pub n_events: usize,
    pub end_time: f64,
    /// `L[q]`: time spent in state `q`.
    pub length: Array1<f64>,
    /// `G[q, a] = ∫_{state = q} g_a(t) dt`, shape `(n_states, n · U)`.
    pub big_g: Array2<f64>,
    /// `node_g[i]` row `k`: `g(t-)` at the `k`-th event of node `i`.
    pub node_g: Vec<Array2<f64>>,
    /// State in which each event of node `i` occurred.
    pub node_states: Vec<Vec<usize>>,
    /// `C[i, q]`: number of events of node `i` in state `q`.
    pub counts: Array2<f64>,
    /// Row `i`: `Σ_k g(t_k^i-)`.
    pub node_g_sum: Array2<f64>,
    /// `H[a, b] = ∫_0^T g_a g_b dt`, only for least-squares models.
    pub cross: Option<Array2<f64>>,
}

impl RealizationWeights {
    /// Walk one realization and accumulate its statistics.
    ///
    /// `global_n = None` puts every interval and event in state 0.
    pub fn compute(
        realization: &Realization, end_time: f64, decays: &[f64], global_n: Option<&[usize]>,
        n_states: usize, with_cross: bool,
    ) -> Self {
        let n = realization.n_nodes();
        let n_decays = decays.len();
        let width = n * n_decays;
        let betas: Vec<f64> = (0..width).map(|a| decays[a % n_decays]).collect();
        let per_node = realization.n_events_per_node();

        let mut acc = Accumulator {
            betas: &betas,
            length: Array1::zeros(n_states),
            big_g: Array2::zeros((n_states, width)),
            cross: with_cross.then(|| Array2::zeros((width, width))),
        };
        let mut node_g: Vec<Array2<f64>> =
            per_node.iter().map(|&k| Array2::zeros((k, width))).collect();
        let mut node_states: Vec<Vec<usize>> =
            per_node.iter().map(|&k| Vec::with_capacity(k)).collect();
        let mut counts = Array2::zeros((n, n_states));
        let mut node_g_sum = Array2::zeros((n, width));

        let state_at = |k: usize| global_n.map_or(0, |g| g[k]);
        let mut cur = Array1::<f64>::zeros(width);
        let mut last = 0.0;
        let mut state = state_at(0);
        let events = realization.merged();

        for (k, &(t, node)) in events.iter().enumerate() {
            let dt = t - last;
            acc.integrate(&cur, dt, state);
            for (c, b) in cur.iter_mut().zip(betas.iter()) {
                *c *= (-b * dt).exp();
            }

            let row = node_states[node].len();
            node_g[node].row_mut(row).assign(&cur);
            node_states[node].push(state);
            counts[[node, state]] += 1.0;
            let mut sum_row = node_g_sum.row_mut(node);
            sum_row += &cur;

            for u in 0..n_decays {
                cur[node * n_decays + u] += decays[u];
            }
            state = state_at(k + 1);
            last = t;
        }
        acc.integrate(&cur, end_time - last, state);

        Self {
            n_nodes: n,
            n_decays,
            n_states,
            n_events: events.len(),
            end_time,
            length: acc.length,
            big_g: acc.big_g,
            node_g,
            node_states,
            counts,
            node_g_sum,
            cross: acc.cross,
        }
    }

    /// Width of the kernel-weight row of one node (`n · U`).
    pub fn row_width(&self) -> usize {
        self.n_nodes * self.n_decays
    }
}

struct Accumulator<'a> {
    betas: &'a [f64],
    length: Array1<f64>,
    big_g: Array2<f64>,
    cross: Option<Array2<f64>>,
}

impl Accumulator<'_> {
    /// Charge `[t, t + dt)` to `state`, with `cur = g(t+)`.
    fn integrate(&mut self, cur: &Array1<f64>, dt: f64, state: usize) {
        if dt <= 0.0 {
            return;
        }
        self.length[state] += dt;
        let mut g_row = self.big_g.row_mut(state);
        for (a, (&c, &b)) in cur.iter().zip(self.betas.iter()).enumerate() {
            if c != 0.0 {
                g_row[a] += c * (1.0 - (-b * dt).exp()) / b;
            }
        }
        if let Some(h) = self.cross.as_mut() {
            for (a, (&ca, &ba)) in cur.iter().zip(self.betas.iter()).enumerate() {
                if ca == 0.0 {
                    continue;
                }
                for (b, (&cb, &bb)) in cur.iter().zip(self.betas.iter()).enumerate() {
                    if cb == 0.0 {
                        continue;
                    }
                    let rate = ba + bb;
                    h[[a, b]] += ca * cb * (1.0 - (-rate * dt).exp()) / rate;
                }
            }
        }
    }
}

/// Statistics of every realization of `data`, computed on `pool` and returned
/// in realization order.
pub fn compute_all(
    data: &HawkesData, decays: &[f64], use_marks: bool, with_cross: bool, pool: &ThreadPool,
) -> Vec<RealizationWeights> {
    let n_states = if use_marks { data.n_states() } else { 1 };
    pool.install(|| {
        data.realizations()
            .par_iter()
            .enumerate()
            .map(|(r, real)| {
                let global_n = if use_marks { data.global_n(r) } else { None };
                RealizationWeights::compute(
                    real,
                    data.end_times()[r],
                    decays,
                    global_n,
                    n_states,
                    with_cross,
                )
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn single_node() -> Realization {
        Realization::new(vec![array![1.0, 2.0]]).expect("valid realization")
    }

    #[test]
    // Purpose
    // -------
    // Integrals of a one-node, one-decay process match closed forms.
    //
    // Given
    // -----
    // - Events at 1 and 2, β = 1, end time 3.
    //
    // Expect
    // ------
    // - g(2-) = e^{-1}.
    // - ∫g = (1 - e^{-1}) + (1 + e^{-1})(1 - e^{-1}).
    // - length = 3, one count per event.
    fn one_node_integrals_match_closed_form() {
        let w = RealizationWeights::compute(&single_node(), 3.0, &[1.0], None, 1, true);
        let e1 = (-1.0_f64).exp();

        assert_relative_eq!(w.length[0], 3.0);
        assert_relative_eq!(w.node_g[0][[0, 0]], 0.0);
        assert_relative_eq!(w.node_g[0][[1, 0]], e1, epsilon = 1e-15);
        assert_relative_eq!(w.big_g[[0, 0]], (1.0 - e1) + (1.0 + e1) * (1.0 - e1), epsilon = 1e-14);
        assert_relative_eq!(w.counts[[0, 0]], 2.0);
        assert_relative_eq!(w.node_g_sum[[0, 0]], e1, epsilon = 1e-15);

        let h = w.cross.as_ref().expect("cross requested");
        let e2 = (-2.0_f64).exp();
        let expected = 0.5 * (1.0 - e2) + (1.0 + e1).powi(2) * 0.5 * (1.0 - e2);
        assert_relative_eq!(h[[0, 0]], expected, epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // Intervals and events are charged to the state in force.
    //
    // Given
    // -----
    // - Events at 1 and 2 with global_n = [1, 0, 2] and three states.
    //
    // Expect
    // ------
    // - [0, 1) in state 1, [1, 2) in state 0, [2, 3] in state 2.
    // - Events occur in states 1 and 0.
    fn intervals_follow_global_n() {
        let w = RealizationWeights::compute(&single_node(), 3.0, &[1.0], Some(&[1, 0, 2]), 3, false);

        assert_eq!(w.length, array![1.0, 1.0, 1.0]);
        assert_eq!(w.node_states[0], vec![1, 0]);
        assert_eq!(w.counts, array![[1.0, 1.0, 0.0]]);
        assert_eq!(w.big_g[[1, 0]], 0.0);
        assert!(w.big_g[[2, 0]] > 0.0);
        assert!(w.cross.is_none());
    }

    #[test]
    // Purpose
    // -------
    // Per-state integrals add up to the unmarked totals.
    fn state_split_preserves_totals() {
        let real = Realization::new(vec![array![0.3, 1.1, 2.7], array![0.5, 2.2]])
            .expect("valid realization");
        let plain = RealizationWeights::compute(&real, 4.0, &[1.5, 3.0], None, 1, false);
        let marked =
            RealizationWeights::compute(&real, 4.0, &[1.5, 3.0], Some(&[0, 1, 2, 1, 0, 2]), 3, false);

        assert_relative_eq!(marked.length.sum(), plain.length[0], epsilon = 1e-14);
        for a in 0..plain.row_width() {
            let total: f64 = marked.big_g.column(a).sum();
            assert_relative_eq!(total, plain.big_g[[0, a]], epsilon = 1e-13);
        }
        assert_eq!(marked.node_g, plain.node_g);
    }
}
