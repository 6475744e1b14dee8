//! Hawkes data — validated realizations, mark sequences, and end times.
//!
//! Purpose
//! -------
//! Provide the input container models are fitted on. A [`HawkesData`] is a
//! non-empty list of [`Realization`]s sharing the same number of nodes, an
//! end time per realization, and (for mark-aware models) one `global_n`
//! mark-state sequence per realization.
//!
//! Key behaviors
//! -------------
//! - Single realizations are wrapped into a one-element list by
//!   [`HawkesData::single`] / [`HawkesData::single_with_marks`].
//! - [`EndTimes`] resolves to one horizon per realization: the realization's
//!   own last timestamp (`Observed`), a broadcast scalar, or an explicit list.
//! - Every shape problem is reported as a [`HawkesError`] naming the
//!   offending realization; nothing is truncated or padded.
//!
//! Invariants & assumptions
//! ------------------------
//! - After construction:
//!   - every realization has `n_nodes ≥ 1` nodes,
//!   - per-node timestamps are finite, non-negative, and strictly increasing,
//!   - every timestamp is `≤` its realization's end time,
//!   - `global_n[r].len() == n_events(r) + 1` and every state is `< n_states`.
//! - Without marks, every event is treated as occurring in state 0 and
//!   `n_states == 1`.
//!
//! Conventions
//! -----------
//! - `global_n[r][0]` is the state before the first event; `global_n[r][k]`
//!   is the state right after the `k`-th event of the time-merged sequence.
//! - Events of different nodes are merged by time; equal times are ordered by
//!   node index.
use ndarray::Array1;

use crate::hawkes::{
    core::validation::{validate_end_time, validate_global_n, validate_timestamps},
    errors::{HawkesError, HawkesResult},
};

/// One realization: per-node sorted event timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Realization {
    timestamps: Vec<Array1<f64>>,
}

impl Realization {
    /// Validate and wrap per-node timestamps.
    ///
    /// # Errors
    /// - [`HawkesError::NoNodes`] if `timestamps` is empty.
    /// - Timestamp errors from [`validate_timestamps`].
    pub fn new(timestamps: Vec<Array1<f64>>) -> HawkesResult<Self> {
        Self::validated(timestamps, 0)
    }

    pub(crate) fn validated(timestamps: Vec<Array1<f64>>, realization: usize) -> HawkesResult<Self> {
        if timestamps.is_empty() {
            return Err(HawkesError::NoNodes);
        }
        for (node, ts) in timestamps.iter().enumerate() {
            validate_timestamps(ts.view(), realization, node)?;
        }
        Ok(Self { timestamps })
    }

    /// Wrap timestamps that are sorted by construction (simulator output).
    pub(crate) fn from_sorted(timestamps: Vec<Array1<f64>>) -> Self {
        Self { timestamps }
    }

    pub fn n_nodes(&self) -> usize {
        self.timestamps.len()
    }

    pub fn node(&self, i: usize) -> &Array1<f64> {
        &self.timestamps[i]
    }

    pub fn timestamps(&self) -> &[Array1<f64>] {
        &self.timestamps
    }

    /// Number of events on each node.
    pub fn n_events_per_node(&self) -> Vec<usize> {
        self.timestamps.iter().map(|t| t.len()).collect()
    }

    /// Total number of events.
    pub fn n_events(&self) -> usize {
        self.timestamps.iter().map(|t| t.len()).sum()
    }

    /// Last timestamp across nodes (0 for an empty realization).
    pub fn last_time(&self) -> f64 {
        self.timestamps.iter().filter_map(|t| t.last().copied()).fold(0.0, f64::max)
    }

    /// All events merged by time as `(time, node)`, ties ordered by node.
    pub fn merged(&self) -> Vec<(f64, usize)> {
        let mut events: Vec<(f64, usize)> = self
            .timestamps
            .iter()
            .enumerate()
            .flat_map(|(node, ts)| ts.iter().map(move |&t| (t, node)))
            .collect();
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        events
    }
}

/// Horizon specification for a realization list.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EndTimes {
    /// Each realization ends at its own last timestamp.
    #[default]
    Observed,
    /// Same end time for every realization.
    Scalar(f64),
    /// One end time per realization.
    PerRealization(Vec<f64>),
}

impl From<f64> for EndTimes {
    fn from(value: f64) -> Self {
        EndTimes::Scalar(value)
    }
}

impl From<Vec<f64>> for EndTimes {
    fn from(values: Vec<f64>) -> Self {
        EndTimes::PerRealization(values)
    }
}

impl From<Option<f64>> for EndTimes {
    fn from(value: Option<f64>) -> Self {
        value.map_or(EndTimes::Observed, EndTimes::Scalar)
    }
}

/// Validated realizations plus end times and optional mark sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct HawkesData {
    realizations: Vec<Realization>,
    end_times: Vec<f64>,
    global_n: Option<Vec<Vec<usize>>>,
    n_states: usize,
    n_nodes: usize,
}

impl HawkesData {
    /// Build from a list of realizations without marks.
    ///
    /// # Errors
    /// - [`HawkesError::NoRealizations`] for an empty list.
    /// - [`HawkesError::NodeCountMismatch`] for ragged node counts.
    /// - Timestamp and end-time errors from the validation helpers.
    pub fn new(realizations: Vec<Vec<Array1<f64>>>, end_times: EndTimes) -> HawkesResult<Self> {
        let (realizations, n_nodes) = build_realizations(realizations)?;
        let end_times = resolve_end_times(&realizations, end_times)?;
        Ok(Self { realizations, end_times, global_n: None, n_states: 1, n_nodes })
    }

    /// Build from a list of realizations with one `global_n` sequence each.
    ///
    /// # Errors
    /// - Everything [`HawkesData::new`] reports.
    /// - [`HawkesError::InvalidNStates`] if `n_states == 0`.
    /// - [`HawkesError::MarksCountMismatch`] if the number of sequences
    ///   differs from the number of realizations.
    /// - [`HawkesError::MarksLengthMismatch`] /
    ///   [`HawkesError::MarkStateOutOfRange`] for misaligned sequences.
    pub fn with_marks(
        realizations: Vec<Vec<Array1<f64>>>, global_n: Vec<Vec<usize>>, n_states: usize,
        end_times: EndTimes,
    ) -> HawkesResult<Self> {
        if n_states == 0 {
            return Err(HawkesError::InvalidNStates { n_states });
        }
        let (realizations, n_nodes) = build_realizations(realizations)?;
        if global_n.len() != realizations.len() {
            return Err(HawkesError::MarksCountMismatch {
                expected: realizations.len(),
                found: global_n.len(),
            });
        }
        for (r, (real, marks)) in realizations.iter().zip(global_n.iter()).enumerate() {
            validate_global_n(marks, real.n_events(), n_states, r)?;
        }
        let end_times = resolve_end_times(&realizations, end_times)?;
        Ok(Self { realizations, end_times, global_n: Some(global_n), n_states, n_nodes })
    }

    /// Wrap a single realization; `end_time = None` uses its last timestamp.
    pub fn single(realization: Vec<Array1<f64>>, end_time: Option<f64>) -> HawkesResult<Self> {
        Self::new(vec![realization], end_time.into())
    }

    /// Wrap a single realization and its mark sequence.
    pub fn single_with_marks(
        realization: Vec<Array1<f64>>, global_n: Vec<usize>, n_states: usize,
        end_time: Option<f64>,
    ) -> HawkesResult<Self> {
        Self::with_marks(vec![realization], vec![global_n], n_states, end_time.into())
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn n_realizations(&self) -> usize {
        self.realizations.len()
    }

    /// `MaxN_of_f` of the mark sequences (1 without marks).
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn has_marks(&self) -> bool {
        self.global_n.is_some()
    }

    pub fn realizations(&self) -> &[Realization] {
        &self.realizations
    }

    pub fn end_times(&self) -> &[f64] {
        &self.end_times
    }

    /// Mark sequence of realization `r`, if present.
    pub fn global_n(&self, r: usize) -> Option<&[usize]> {
        self.global_n.as_ref().map(|g| g[r].as_slice())
    }

    /// Total number of events across realizations.
    pub fn n_total_jumps(&self) -> usize {
        self.realizations.iter().map(Realization::n_events).sum()
    }
}

// ---- Helpers ----

fn build_realizations(raw: Vec<Vec<Array1<f64>>>) -> HawkesResult<(Vec<Realization>, usize)> {
    if raw.is_empty() {
        return Err(HawkesError::NoRealizations);
    }
    let n_nodes = raw[0].len();
    let mut realizations = Vec::with_capacity(raw.len());
    for (r, timestamps) in raw.into_iter().enumerate() {
        if timestamps.len() != n_nodes {
            return Err(HawkesError::NodeCountMismatch {
                realization: r,
                expected: n_nodes,
                found: timestamps.len(),
            });
        }
        realizations.push(Realization::validated(timestamps, r)?);
    }
    Ok((realizations, n_nodes))
}

fn resolve_end_times(realizations: &[Realization], end_times: EndTimes) -> HawkesResult<Vec<f64>> {
    let resolved = match end_times {
        EndTimes::Observed => realizations.iter().map(Realization::last_time).collect(),
        EndTimes::Scalar(t) => vec![t; realizations.len()],
        EndTimes::PerRealization(ts) => {
            if ts.len() != realizations.len() {
                return Err(HawkesError::EndTimesLengthMismatch {
                    expected: realizations.len(),
                    found: ts.len(),
                });
            }
            ts
        }
    };
    for (r, (real, &t)) in realizations.iter().zip(resolved.iter()).enumerate() {
        validate_end_time(t, real.last_time(), r)?;
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_node_events() -> Vec<Array1<f64>> {
        vec![array![0.31, 0.93, 1.29, 2.32, 4.25], array![0.12, 1.19, 2.12, 2.41, 3.35, 4.21]]
    }

    #[test]
    // Purpose
    // -------
    // A single realization is wrapped and its end time defaults to the last
    // timestamp.
    fn single_realization_defaults_end_time_to_last_event() {
        let data = HawkesData::single(two_node_events(), None).expect("valid data");

        assert_eq!(data.n_realizations(), 1);
        assert_eq!(data.n_nodes(), 2);
        assert_eq!(data.end_times(), &[4.25]);
        assert_eq!(data.n_total_jumps(), 11);
        assert!(!data.has_marks());
    }

    #[test]
    // Purpose
    // -------
    // A scalar end time is broadcast to all realizations.
    fn scalar_end_time_is_broadcast() {
        let data =
            HawkesData::new(vec![two_node_events(), two_node_events()], EndTimes::Scalar(6.0))
                .expect("valid data");

        assert_eq!(data.end_times(), &[6.0, 6.0]);
    }

    #[test]
    // Purpose
    // -------
    // Ragged node counts across realizations are rejected.
    fn ragged_realizations_are_rejected() {
        let err = HawkesData::new(
            vec![two_node_events(), vec![array![0.5]]],
            EndTimes::Observed,
        )
        .expect_err("must fail");

        assert_eq!(err, HawkesError::NodeCountMismatch { realization: 1, expected: 2, found: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Mark sequences must be aligned with the merged events.
    //
    // Given
    // -----
    // - 11 events and a global_n of length 11 (sentinel missing).
    //
    // Expect
    // ------
    // - `MarksLengthMismatch { expected: 12, found: 11 }`.
    fn misaligned_marks_are_rejected() {
        let err = HawkesData::single_with_marks(two_node_events(), vec![0; 11], 3, None)
            .expect_err("must fail");

        assert_eq!(err, HawkesError::MarksLengthMismatch { realization: 0, expected: 12, found: 11 });
    }

    #[test]
    // Purpose
    // -------
    // Explicit end times must match the realization count.
    fn end_time_list_length_is_checked() {
        let err = HawkesData::new(vec![two_node_events()], EndTimes::PerRealization(vec![5.0, 6.0]))
            .expect_err("must fail");

        assert_eq!(err, HawkesError::EndTimesLengthMismatch { expected: 1, found: 2 });
    }

    #[test]
    // Purpose
    // -------
    // Merged events are sorted by time with node labels.
    fn merged_events_are_time_ordered() {
        let real = Realization::new(two_node_events()).expect("valid realization");

        let merged = real.merged();

        assert_eq!(merged.len(), 11);
        assert_eq!(merged[0], (0.12, 1));
        assert_eq!(merged[1], (0.31, 0));
        assert!(merged.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
