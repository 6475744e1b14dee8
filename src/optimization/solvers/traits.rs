//! Public configuration surface of the proximal solvers.
//!
//! - [`SolverKind`]: which algorithm runs (`gd`, `agd`, `sgd`, `svrg`, `sdca`).
//! - [`StepType`]: fixed or Barzilai–Borwein steps for SVRG.
//! - [`SolverOptions`]: validated step, stopping, sampling and logging
//!   configuration.
//! - [`SolveOutcome`]: normalized result of one `solve` call.
//!
//! Convention: solvers *minimize* `F(x) = loss(x) + g(x)` (plus
//! `l_l2sq/2 · ||x||²` for SDCA). The solution is the last iterate, not the
//! best one seen.
use std::str::FromStr;

use argmin::core::TerminationStatus;

use crate::optimization::{
    errors::{OptError, OptResult},
    solvers::{
        types::{Cost, FnEvalMap, Theta},
        validation::{validate_solution, validate_value, verify_l2sq, verify_step, verify_tol},
    },
};

/// Proximal algorithm selected by name.
///
/// Parsing is case-insensitive (`"GD"`, `"agd"`, ...). Unknown names return
/// [`OptError::InvalidSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Proximal gradient descent (ISTA).
    Gd,
    /// Accelerated proximal gradient (FISTA).
    Agd,
    /// Proximal stochastic gradient over per-node samples.
    Sgd,
    /// Stochastic variance-reduced gradient.
    Svrg,
    /// Dual-free proximal stochastic dual coordinate ascent.
    Sdca,
}

impl SolverKind {
    pub fn name(&self) -> &'static str {
        match self {
            SolverKind::Gd => "gd",
            SolverKind::Agd => "agd",
            SolverKind::Sgd => "sgd",
            SolverKind::Svrg => "svrg",
            SolverKind::Sdca => "sdca",
        }
    }

    /// Whether the solver samples per-node terms.
    pub fn is_stochastic(&self) -> bool {
        matches!(self, SolverKind::Sgd | SolverKind::Svrg | SolverKind::Sdca)
    }
}

impl FromStr for SolverKind {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gd" => Ok(SolverKind::Gd),
            "agd" => Ok(SolverKind::Agd),
            "sgd" => Ok(SolverKind::Sgd),
            "svrg" => Ok(SolverKind::Svrg),
            "sdca" => Ok(SolverKind::Sdca),
            _ => Err(OptError::InvalidSolver {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'gd', 'agd', 'sgd', 'svrg' or 'sdca'.",
            }),
        }
    }
}

/// Step-size rule of SVRG, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepType {
    Fixed,
    BarzilaiBorwein,
}

impl FromStr for StepType {
    type Err = OptError;

    /// Accepts `"fixed"` and `"bb"` / `"barzilaiborwein"` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(StepType::Fixed),
            "bb" | "barzilaiborwein" => Ok(StepType::BarzilaiBorwein),
            _ => Err(OptError::InvalidStepType {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'fixed' or 'bb'.",
            }),
        }
    }
}

/// Solver configuration.
///
/// Fields:
/// - `kind`: algorithm.
/// - `step`: initial (or fixed) step size; SGD uses `step / (k + 1)` at
///   epoch `k`.
/// - `max_iter`: number of iterations (epochs for stochastic solvers); the
///   default stopping rule.
/// - `tol`: optional relative objective change
///   `|F_k − F_{k−1}| / max(|F_{k−1}|, 1)` below which the run stops.
/// - `linesearch`: backtracking line search for GD/AGD.
/// - `monotone`: AGD only; reject extrapolated iterates that increase `F`.
/// - `step_type`: SVRG step rule.
/// - `l_l2sq`: strength of the `½||x||²` term SDCA adds to the objective.
/// - `seed`: seed of the sampling RNG of stochastic solvers.
/// - `epoch_size`: inner steps per epoch (default: number of samples).
/// - `record_every`: record `F` in the history every this many iterations.
/// - `print_every`: observer period when `verbose` (feature `obs_slog`).
/// - `verbose`: attach the slog observer.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub kind: SolverKind,
    pub step: f64,
    pub max_iter: usize,
    pub tol: Option<f64>,
    pub linesearch: bool,
    pub monotone: bool,
    pub step_type: StepType,
    pub l_l2sq: f64,
    pub seed: u64,
    pub epoch_size: Option<usize>,
    pub record_every: usize,
    pub print_every: usize,
    pub verbose: bool,
}

impl SolverOptions {
    /// Validated options with defaults for everything but the essentials.
    ///
    /// # Errors
    /// - [`OptError::InvalidStep`] for non-finite or non-positive `step`.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(kind: SolverKind, step: f64, max_iter: usize) -> OptResult<Self> {
        verify_step(step)?;
        if max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        Ok(Self { kind, step, max_iter, ..Self::default() })
    }

    pub fn with_tol(mut self, tol: f64) -> OptResult<Self> {
        verify_tol(Some(tol))?;
        self.tol = Some(tol);
        Ok(self)
    }

    pub fn with_linesearch(mut self, linesearch: bool) -> Self {
        self.linesearch = linesearch;
        self
    }

    pub fn with_monotone(mut self, monotone: bool) -> Self {
        self.monotone = monotone;
        self
    }

    pub fn with_step_type(mut self, step_type: StepType) -> Self {
        self.step_type = step_type;
        self
    }

    pub fn with_l_l2sq(mut self, l_l2sq: f64) -> OptResult<Self> {
        verify_l2sq(l_l2sq)?;
        self.l_l2sq = l_l2sq;
        Ok(self)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_epoch_size(mut self, epoch_size: usize) -> OptResult<Self> {
        if epoch_size == 0 {
            return Err(OptError::InvalidPeriod { name: "epoch_size", value: epoch_size });
        }
        self.epoch_size = Some(epoch_size);
        Ok(self)
    }

    pub fn with_record_every(mut self, record_every: usize) -> OptResult<Self> {
        if record_every == 0 {
            return Err(OptError::InvalidPeriod { name: "record_every", value: record_every });
        }
        self.record_every = record_every;
        Ok(self)
    }

    pub fn with_verbose(mut self, verbose: bool, print_every: usize) -> OptResult<Self> {
        if print_every == 0 {
            return Err(OptError::InvalidPeriod { name: "print_every", value: print_every });
        }
        self.verbose = verbose;
        self.print_every = print_every;
        Ok(self)
    }
}

impl Default for SolverOptions {
    /// AGD, step 1e-2, 100 iterations, no tolerance, no line search,
    /// fixed steps, seed 42, history recorded every iteration.
    fn default() -> Self {
        Self {
            kind: SolverKind::Agd,
            step: 1e-2,
            max_iter: 100,
            tol: None,
            linesearch: false,
            monotone: false,
            step_type: StepType::Fixed,
            l_l2sq: 0.0,
            seed: 42,
            epoch_size: None,
            record_every: 1,
            print_every: 10,
            verbose: false,
        }
    }
}

/// Canonical result of `solve`.
///
/// - `solution`: last iterate.
/// - `objective`: `F(solution)`.
/// - `converged`: `true` if the relative tolerance stopped the run.
/// - `status`: argmin termination status rendered as text.
/// - `iterations`: iterations performed.
/// - `fn_evals`: evaluation counters.
/// - `history`: `F` at iteration 0 and every `record_every` iterations.
/// - `step`: step size in use when the run ended (after line searches,
///   rollbacks or Barzilai–Borwein updates).
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub solution: Theta,
    pub objective: Cost,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub history: Vec<Cost>,
    pub step: f64,
}

impl SolveOutcome {
    /// Build a validated outcome from the final solver state.
    ///
    /// # Errors
    /// - [`OptError::MissingSolution`] / [`OptError::InvalidSolution`] for a
    ///   missing or non-finite solution.
    /// - [`OptError::NonFiniteCost`] for a non-finite objective.
    pub fn new(
        solution: Option<Theta>, objective: Cost, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, history: Vec<Cost>, step: f64,
    ) -> OptResult<Self> {
        let solution = validate_solution(solution)?;
        validate_value(objective)?;
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(argmin::core::TerminationReason::SolverConverged)
        );
        let status = match termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            other => format!("{other:?}"),
        };
        Ok(Self {
            solution,
            objective,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            history,
            step,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argmin::core::TerminationReason;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Solver and step-type names parse case-insensitively.
    fn kinds_parse_case_insensitively() {
        assert_eq!("SVRG".parse::<SolverKind>(), Ok(SolverKind::Svrg));
        assert_eq!("bb".parse::<StepType>(), Ok(StepType::BarzilaiBorwein));
        assert!(matches!(
            "newton".parse::<SolverKind>(),
            Err(OptError::InvalidSolver { .. })
        ));
        assert!(SolverKind::Sdca.is_stochastic());
        assert!(!SolverKind::Agd.is_stochastic());
    }

    #[test]
    // Purpose
    // -------
    // Option constructors reject invalid values.
    //
    // Given
    // -----
    // - A zero step, zero iterations, negative tol/l_l2sq, zero periods.
    //
    // Expect
    // ------
    // - The dedicated error variant for each.
    fn options_validate_inputs() {
        assert!(matches!(
            SolverOptions::new(SolverKind::Gd, 0.0, 10),
            Err(OptError::InvalidStep { .. })
        ));
        assert!(matches!(
            SolverOptions::new(SolverKind::Gd, 0.1, 0),
            Err(OptError::InvalidMaxIter { .. })
        ));
        let opts = SolverOptions::new(SolverKind::Sdca, 0.1, 10).expect("valid");
        assert!(matches!(opts.clone().with_tol(-1.0), Err(OptError::InvalidTol { .. })));
        assert!(matches!(opts.clone().with_l_l2sq(-1.0), Err(OptError::InvalidL2Sq { .. })));
        assert_eq!(
            opts.clone().with_record_every(0),
            Err(OptError::InvalidPeriod { name: "record_every", value: 0 })
        );
        assert_eq!(opts.with_l_l2sq(0.5).expect("valid").l_l2sq, 0.5);
    }

    #[test]
    // Purpose
    // -------
    // Outcomes report convergence only for the tolerance-based stop.
    fn outcome_maps_termination_status() {
        let converged = SolveOutcome::new(
            Some(array![1.0]),
            0.5,
            TerminationStatus::Terminated(TerminationReason::SolverConverged),
            3,
            FnEvalMap::new(),
            vec![1.0, 0.5],
            0.1,
        )
        .expect("valid outcome");
        let capped = SolveOutcome::new(
            Some(array![1.0]),
            0.5,
            TerminationStatus::Terminated(TerminationReason::MaxItersReached),
            3,
            FnEvalMap::new(),
            vec![],
            0.1,
        )
        .expect("valid outcome");

        assert!(converged.converged);
        assert!(!capped.converged);
        assert_eq!(
            SolveOutcome::new(
                None,
                0.0,
                TerminationStatus::NotTerminated,
                0,
                FnEvalMap::new(),
                vec![],
                0.1
            ),
            Err(OptError::MissingSolution)
        );
    }
}
