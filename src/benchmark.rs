//! benchmark — typed result table and timed solver jobs.
//!
//! Purpose
//! -------
//! Compare solver configurations by running independent fitting jobs under a
//! wall-clock budget and collecting `(elapsed_time, objective, auc)` per
//! configuration in an ordered table.
//!
//! Key behaviors
//! -------------
//! - [`BenchKey`] names one configuration: penalty, C-formula, library,
//!   solver and iteration budget. [`BenchTable`] maps keys to
//!   [`BenchRecord`]s in key order.
//! - [`run_with_timeout`] runs jobs on worker threads, at most `workers` at a
//!   time. A job that fails, panics or exceeds its budget is recorded as a
//!   missing record (all fields `NaN`); the run itself never fails.
//! - [`timed_solve`] times one [`Solver::solve`] call and scores the
//!   solution.
//!
//! Conventions
//! -----------
//! - The penalty strength of a configuration is `1 / C` with
//!   `C = CFormula::apply(n_samples)`.
//! - Threads cannot be killed: an abandoned job keeps running detached
//!   until it returns, and its result is dropped. Jobs built for
//!   [`run_cancellable`] receive a [`CancelFlag`] that is raised when they
//!   are abandoned and should return early once it is set.
use std::{
    collections::BTreeMap,
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

use crate::optimization::{
    errors::{OptError, OptResult},
    solvers::{Solver, Theta},
};

/// How the inverse penalty strength `C` scales with the sample count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CFormula {
    /// `C = n`
    N,
    /// `C = √n`
    SqrtN,
}

impl CFormula {
    pub fn apply(self, n_samples: usize) -> f64 {
        let n = n_samples as f64;
        match self {
            CFormula::N => n,
            CFormula::SqrtN => n.sqrt(),
        }
    }

    /// Penalty strength `1 / C`.
    pub fn strength(self, n_samples: usize) -> f64 {
        1.0 / self.apply(n_samples)
    }
}

impl fmt::Display for CFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CFormula::N => write!(f, "n"),
            CFormula::SqrtN => write!(f, "sqrt(n)"),
        }
    }
}

impl FromStr for CFormula {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "n" => Ok(CFormula::N),
            "sqrt(n)" | "sqrtn" => Ok(CFormula::SqrtN),
            _ => Err(OptError::InvalidParameter {
                text: format!("Unknown C formula '{s}'; expected 'n' or 'sqrt(n)'."),
            }),
        }
    }
}

/// One benchmark configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BenchKey {
    pub penalty: String,
    pub c_formula: CFormula,
    pub library: String,
    pub solver: String,
    pub max_iter: usize,
}

impl BenchKey {
    pub fn new(
        penalty: impl Into<String>, c_formula: CFormula, library: impl Into<String>,
        solver: impl Into<String>, max_iter: usize,
    ) -> Self {
        Self {
            penalty: penalty.into(),
            c_formula,
            library: library.into(),
            solver: solver.into(),
            max_iter,
        }
    }
}

/// Measurements of one configuration; `NaN` everywhere when missing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchRecord {
    pub elapsed_time: f64,
    pub objective: f64,
    pub auc: f64,
}

impl BenchRecord {
    pub fn new(elapsed_time: f64, objective: f64, auc: f64) -> Self {
        Self { elapsed_time, objective, auc }
    }

    /// Record of a job that timed out or failed.
    pub fn missing() -> Self {
        Self { elapsed_time: f64::NAN, objective: f64::NAN, auc: f64::NAN }
    }

    pub fn is_missing(&self) -> bool {
        self.elapsed_time.is_nan() && self.objective.is_nan() && self.auc.is_nan()
    }
}

/// Results keyed by configuration, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchTable {
    records: BTreeMap<BenchKey, BenchRecord>,
}

impl BenchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record of `key`.
    pub fn insert(&mut self, key: BenchKey, record: BenchRecord) -> Option<BenchRecord> {
        self.records.insert(key, record)
    }

    pub fn get(&self, key: &BenchKey) -> Option<&BenchRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BenchKey, &BenchRecord)> {
        self.records.iter()
    }

    /// Number of configurations with a recorded (non-missing) result.
    pub fn n_completed(&self) -> usize {
        self.records.values().filter(|r| !r.is_missing()).count()
    }

    /// Records sharing `penalty` and `c_formula`, in key order.
    pub fn slice<'t>(
        &'t self, penalty: &'t str, c_formula: CFormula,
    ) -> impl Iterator<Item = (&'t BenchKey, &'t BenchRecord)> + 't {
        self.records.iter().filter(move |(k, _)| k.penalty == penalty && k.c_formula == c_formula)
    }
}

/// A benchmark job: produces the record of one configuration.
pub type BenchJob = Box<dyn FnOnce() -> OptResult<BenchRecord> + Send + 'static>;

/// Raised by the runner when a job exceeds its budget.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// A benchmark job that polls a [`CancelFlag`] to stop early.
pub type CancellableJob = Box<dyn FnOnce(&CancelFlag) -> OptResult<BenchRecord> + Send + 'static>;

/// Run `jobs` with a per-job wall-clock budget, `workers` at a time.
///
/// Every key ends up in the returned table. Jobs that return an error, panic
/// or exceed `timeout` are recorded as [`BenchRecord::missing`].
///
/// A timed-out job is leaked: its thread stays detached and runs to
/// completion in the background, and whatever it returns is dropped. Use
/// [`run_cancellable`] for jobs that can stop early.
pub fn run_with_timeout(
    jobs: Vec<(BenchKey, BenchJob)>, timeout: Duration, workers: usize,
) -> BenchTable {
    let jobs = jobs
        .into_iter()
        .map(|(key, job)| {
            let job: CancellableJob = Box::new(move |_: &CancelFlag| job());
            (key, job)
        })
        .collect();
    run_cancellable(jobs, timeout, workers)
}

/// [`run_with_timeout`] for jobs that observe a [`CancelFlag`].
///
/// When a job exceeds `timeout` its flag is raised before the runner moves
/// on; the job is expected to poll the flag and return promptly. Its
/// thread is not joined.
pub fn run_cancellable(
    jobs: Vec<(BenchKey, CancellableJob)>, timeout: Duration, workers: usize,
) -> BenchTable {
    let workers = workers.max(1);
    let mut table = BenchTable::new();
    let mut jobs = jobs.into_iter().peekable();

    while jobs.peek().is_some() {
        let batch: Vec<_> = jobs
            .by_ref()
            .take(workers)
            .map(|(key, job)| {
                let (tx, rx) = mpsc::channel();
                let flag = CancelFlag::new();
                let job_flag = flag.clone();
                thread::spawn(move || {
                    // Sending fails only after the runner has abandoned the
                    // job, in which case the record is not wanted.
                    let _ = tx.send(job(&job_flag));
                });
                (key, rx, flag)
            })
            .collect();

        let started = Instant::now();
        for (key, rx, flag) in batch {
            let remaining = timeout.saturating_sub(started.elapsed());
            let record = match rx.recv_timeout(remaining) {
                Ok(Ok(record)) => record,
                Ok(Err(_)) | Err(RecvTimeoutError::Disconnected) => BenchRecord::missing(),
                Err(RecvTimeoutError::Timeout) => {
                    flag.cancel();
                    BenchRecord::missing()
                }
            };
            table.insert(key, record);
        }
    }
    table
}

/// Time one solve from `x0` and score its solution.
///
/// `score` maps the solution to the evaluation metric stored as `auc`
/// (for example [`roc_auc`] on held-out data).
pub fn timed_solve<F>(solver: &mut Solver, x0: Theta, score: F) -> OptResult<BenchRecord>
where
    F: FnOnce(&Theta) -> f64,
{
    let start = Instant::now();
    solver.solve(x0)?;
    let elapsed = start.elapsed().as_secs_f64();
    let outcome = solver.outcome().ok_or(OptError::MissingSolution)?;
    Ok(BenchRecord::new(elapsed, outcome.objective, score(&outcome.solution)))
}

/// Area under the ROC curve of `scores` against binary `labels`.
///
/// Computed as the Mann–Whitney statistic with ties counted as one half.
/// Returns `NaN` when the lengths differ or one class is empty.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> f64 {
    if scores.len() != labels.len() {
        return f64::NAN;
    }
    let n_pos = labels.iter().filter(|&&l| l).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return f64::NAN;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // Average ranks (1-based) over tied groups.
    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        let avg_rank = (start + end + 1) as f64 / 2.0;
        rank_sum += avg_rank * order[start..end].iter().filter(|&&k| labels[k]).count() as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    (rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64)
}
