//! Custom mark states — per-node intensity multipliers and state dynamics.
//!
//! Purpose
//! -------
//! Model the discrete "global state" `global_n` that modulates every node's
//! intensity through a learned multiplier `f_i[state]`, and the rule that
//! moves the state forward each time an event fires.
//!
//! Key behaviors
//! -------------
//! - [`MarkTable`] stores `f_i` as an `(n_nodes, n_states)` array of finite,
//!   non-negative factors (`n_states` is `MaxN_of_f`).
//! - [`MarkDynamics`] selects the transition rule:
//!   - `Uniform`: the next state is drawn uniformly in `[0, n_states)`,
//!   - `Table`: deterministic `next[state, node]` lookup,
//!   - `QueueSize`: a running quantity moves by a per-node order size and the
//!     state is the quantity measured in average sizes, capped at
//!     `n_states - 1`.
//! - [`MarkProcess`] is the mutable state machine the simulator drives.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every state produced lies in `[0, n_states)`.
//! - All randomness comes from the caller's RNG so simulations stay a pure
//!   function of the seed.
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::hawkes::errors::{HawkesError, HawkesResult};

/// Per-node multiplicative mark factors `f_i[state]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkTable {
    factors: Array2<f64>,
}

impl MarkTable {
    /// Validate and wrap an `(n_nodes, n_states)` factor array.
    ///
    /// # Errors
    /// - [`HawkesError::NoNodes`] / [`HawkesError::InvalidNStates`] for empty
    ///   dimensions.
    /// - [`HawkesError::InvalidMarkFactor`] for negative or non-finite entries.
    pub fn new(factors: Array2<f64>) -> HawkesResult<Self> {
        let (n_nodes, n_states) = factors.dim();
        if n_nodes == 0 {
            return Err(HawkesError::NoNodes);
        }
        if n_states == 0 {
            return Err(HawkesError::InvalidNStates { n_states });
        }
        for ((node, state), &value) in factors.indexed_iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(HawkesError::InvalidMarkFactor { node, state, value });
            }
        }
        Ok(Self { factors })
    }

    /// Single-state table of ones: a plain Hawkes process.
    pub fn neutral(n_nodes: usize) -> Self {
        Self { factors: Array2::ones((n_nodes, 1)) }
    }

    pub fn n_nodes(&self) -> usize {
        self.factors.nrows()
    }

    /// `MaxN_of_f`.
    pub fn n_states(&self) -> usize {
        self.factors.ncols()
    }

    pub fn factor(&self, node: usize, state: usize) -> f64 {
        self.factors[[node, state]]
    }

    /// Largest factor of every node.
    pub fn max_factors(&self) -> Array1<f64> {
        self.factors.map_axis(ndarray::Axis(1), |row| row.iter().cloned().fold(0.0, f64::max))
    }

    pub fn factors(&self) -> &Array2<f64> {
        &self.factors
    }
}

/// Transition rule for the global mark state.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkDynamics {
    /// Next state uniform in `[0, n_states)`.
    Uniform,
    /// `next[[state, node]]` is the state after `node` fires in `state`.
    Table { next: Array2<usize> },
    /// Queue quantity driven by signed per-node order sizes.
    QueueSize { initial_quantity: f64, average_size: f64, order_sizes: Vec<f64> },
}

impl MarkDynamics {
    /// Check the rule against the network dimensions.
    ///
    /// # Errors
    /// - [`HawkesError::TransitionTableShape`] / [`HawkesError::InvalidTransition`]
    ///   for malformed tables.
    /// - [`HawkesError::InvalidQueueDynamics`] /
    ///   [`HawkesError::OrderSizesLengthMismatch`] for malformed queue rules.
    pub fn validate(&self, n_nodes: usize, n_states: usize) -> HawkesResult<()> {
        match self {
            MarkDynamics::Uniform => Ok(()),
            MarkDynamics::Table { next } => {
                if next.dim() != (n_states, n_nodes) {
                    return Err(HawkesError::TransitionTableShape {
                        expected: (n_states, n_nodes),
                        found: next.dim(),
                    });
                }
                for ((state, node), &to) in next.indexed_iter() {
                    if to >= n_states {
                        return Err(HawkesError::InvalidTransition {
                            state,
                            node,
                            next: to,
                            n_states,
                        });
                    }
                }
                Ok(())
            }
            MarkDynamics::QueueSize { initial_quantity, average_size, order_sizes } => {
                if !initial_quantity.is_finite() {
                    return Err(HawkesError::InvalidQueueDynamics {
                        value: *initial_quantity,
                        reason: "initial quantity must be finite",
                    });
                }
                if !average_size.is_finite() || *average_size <= 0.0 {
                    return Err(HawkesError::InvalidQueueDynamics {
                        value: *average_size,
                        reason: "average size must be finite and > 0",
                    });
                }
                if order_sizes.len() != n_nodes {
                    return Err(HawkesError::OrderSizesLengthMismatch {
                        expected: n_nodes,
                        found: order_sizes.len(),
                    });
                }
                if let Some(&bad) = order_sizes.iter().find(|v| !v.is_finite()) {
                    return Err(HawkesError::InvalidQueueDynamics {
                        value: bad,
                        reason: "order sizes must be finite",
                    });
                }
                Ok(())
            }
        }
    }
}

/// Mutable mark state driven by the simulator.
#[derive(Debug, Clone)]
pub struct MarkProcess<'a> {
    dynamics: &'a MarkDynamics,
    n_states: usize,
    state: usize,
    quantity: Option<f64>,
}

impl<'a> MarkProcess<'a> {
    /// Start the process in its initial state: 0, or the queue state of the
    /// initial quantity.
    pub fn new(dynamics: &'a MarkDynamics, n_states: usize) -> Self {
        let (state, quantity) = match dynamics {
            MarkDynamics::QueueSize { initial_quantity, average_size, .. } => {
                let q = initial_quantity.max(0.0);
                (queue_state(q, *average_size, n_states), Some(q))
            }
            _ => (0, None),
        };
        Self { dynamics, n_states, state, quantity }
    }

    pub fn state(&self) -> usize {
        self.state
    }

    /// Current queue quantity, if the dynamics track one.
    pub fn quantity(&self) -> Option<f64> {
        self.quantity
    }

    /// Advance after `node` fired and return the new state.
    pub fn transition<R: Rng + ?Sized>(&mut self, node: usize, rng: &mut R) -> usize {
        self.state = match self.dynamics {
            MarkDynamics::Uniform => rng.gen_range(0..self.n_states),
            MarkDynamics::Table { next } => next[[self.state, node]],
            MarkDynamics::QueueSize { average_size, order_sizes, .. } => {
                let mut q = self.quantity.unwrap_or(0.0) + order_sizes[node];
                if q <= 0.0 {
                    q = 0.0;
                }
                self.quantity = Some(q);
                queue_state(q, *average_size, self.n_states)
            }
        };
        self.state
    }
}

fn queue_state(quantity: f64, average_size: f64, n_states: usize) -> usize {
    if quantity <= 0.0 {
        return 0;
    }
    let level = (quantity / average_size).ceil() as usize;
    level.min(n_states - 1)
}
