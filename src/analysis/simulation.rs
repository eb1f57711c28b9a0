/// Monte Carlo sub-sampling of the annual peak record.
///
/// Each run draws `sample_size` peaks without replacement from the full
/// record, re-ranks them, refits LP3 and projects the fit onto the shared
/// return-period grid. Runs are independent, so they are spread over a
/// thread pool; every worker owns its own ChaCha stream seeded from one
/// master generator, and results are concatenated in worker order after
/// the pool joins. A seeded runner with a fixed worker count is therefore
/// reproducible.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};

use rand::seq::index;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use threadpool::ThreadPool;

use crate::analysis::lp3;
use crate::analysis::ranking::{self, MIN_SAMPLE_SIZE};
use crate::model::{
    ConfigurationOutOfRange, FfaError, PeakRecord, QuantileCurve, RankedSample,
    ReturnPeriodGrid, SimulationEnsemble,
};

/// Upper bound on simulation runs per analysis.
pub const MAX_SIMULATIONS: usize = 1000;

/// Worker threads used when the caller does not say otherwise.
pub const DEFAULT_WORKERS: usize = 4;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked before every simulation run.
///
/// Clones share the same flag, so one handle can be given to the runner
/// and another kept by whoever may want to abort it.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Plan resolution
// ---------------------------------------------------------------------------

/// Effective sample size and run count after clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationPlan {
    pub sample_size: usize,
    pub n_simulations: usize,
    pub warnings: Vec<ConfigurationOutOfRange>,
}

/// Clamps the requested configuration against the record length.
///
/// A sample size at or above the record length becomes `n_years - 1`, and
/// the run count is held to `1..=cap`. Both clamps are reported as
/// warnings. Too little data for a two-point sub-sample is a hard failure.
pub fn resolve_plan(
    n_years: usize,
    sample_size: usize,
    n_simulations: usize,
    cap: usize,
) -> Result<SimulationPlan, FfaError> {
    if n_years < MIN_SAMPLE_SIZE {
        return Err(FfaError::InsufficientData { n: n_years, min: MIN_SAMPLE_SIZE });
    }

    let mut warnings = Vec::new();

    let effective_sample = if sample_size >= n_years {
        let effective = n_years - 1;
        warnings.push(ConfigurationOutOfRange::SampleSize {
            requested: sample_size,
            effective,
            n_years,
        });
        effective
    } else {
        sample_size
    };

    if effective_sample < MIN_SAMPLE_SIZE {
        return Err(FfaError::InsufficientData { n: effective_sample, min: MIN_SAMPLE_SIZE });
    }

    let cap = cap.max(1);
    let effective_runs = n_simulations.clamp(1, cap);
    if effective_runs != n_simulations {
        warnings.push(ConfigurationOutOfRange::SimulationCount {
            requested: n_simulations,
            effective: effective_runs,
            cap,
        });
    }

    Ok(SimulationPlan {
        sample_size: effective_sample,
        n_simulations: effective_runs,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Single run
// ---------------------------------------------------------------------------

/// Draws one sub-sample without replacement and returns its LP3 curve.
pub fn run_once<R: Rng + ?Sized>(
    records: &[PeakRecord],
    sample_size: usize,
    grid: &[f64],
    rng: &mut R,
) -> Result<QuantileCurve, FfaError> {
    let drawn: Vec<PeakRecord> = index::sample(rng, records.len(), sample_size)
        .into_iter()
        .map(|i| records[i].clone())
        .collect();

    let ranked = ranking::rank(&drawn)?;
    let params = lp3::fit(&ranked)?;
    lp3::project(&params, grid)
}

/// Curves produced by one worker, plus the failure that stopped it early.
struct BatchOutcome {
    curves: Vec<QuantileCurve>,
    error: Option<FfaError>,
}

fn run_batch<R: Rng + ?Sized>(
    records: &[PeakRecord],
    sample_size: usize,
    runs: usize,
    grid: &[f64],
    rng: &mut R,
    stop: &[&CancellationToken],
) -> BatchOutcome {
    let mut curves = Vec::with_capacity(runs);
    for _ in 0..runs {
        if stop.iter().any(|t| t.is_cancelled()) {
            break;
        }
        match run_once(records, sample_size, grid, rng) {
            Ok(curve) => curves.push(curve),
            Err(e) => return BatchOutcome { curves, error: Some(e) },
        }
    }
    BatchOutcome { curves, error: None }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs the sub-sampling simulation on a fixed-size worker pool.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    workers: usize,
    max_simulations: usize,
    seed: Option<u64>,
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_simulations: MAX_SIMULATIONS,
            seed: None,
        }
    }
}

impl SimulationRunner {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            ..Self::default()
        }
    }

    /// Fixes the master seed; without one every run draws from OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_simulations(mut self, cap: usize) -> Self {
        self.max_simulations = cap.max(1);
        self
    }

    fn master_rng(&self) -> ChaCha8Rng {
        match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Builds the simulation ensemble for `full_sample`.
    ///
    /// Out-of-range `sample_size` / `n_simulations` are clamped and listed
    /// in `SimulationEnsemble::warnings`. The first run that fails (for
    /// example with `DegenerateSkew`) stops the remaining workers and its
    /// error is returned.
    pub fn simulate(
        &self,
        full_sample: &RankedSample,
        sample_size: usize,
        n_simulations: usize,
        grid: &ReturnPeriodGrid,
        cancel: &CancellationToken,
    ) -> Result<SimulationEnsemble, FfaError> {
        let plan = resolve_plan(full_sample.len(), sample_size, n_simulations, self.max_simulations)?;
        let workers = self.workers.clamp(1, plan.n_simulations);
        let mut master = self.master_rng();

        let records = Arc::new(full_sample.peak_records());
        let grid_values = Arc::new(grid.values().to_vec());
        let abort = CancellationToken::new();

        let pool = ThreadPool::new(workers);
        let (tx, rx) = mpsc::channel();

        for (worker, runs) in partition(plan.n_simulations, workers).into_iter().enumerate() {
            let seed = master.next_u64();
            let tx = tx.clone();
            let records = Arc::clone(&records);
            let grid_values = Arc::clone(&grid_values);
            let cancel = cancel.clone();
            let abort = abort.clone();
            let sample_size = plan.sample_size;

            pool.execute(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let outcome = run_batch(
                    &records,
                    sample_size,
                    runs,
                    &grid_values,
                    &mut rng,
                    &[&cancel, &abort],
                );
                if outcome.error.is_some() {
                    abort.cancel();
                }
                // receiver outlives the pool; a failed send only means the caller is gone
                let _ = tx.send((worker, outcome));
            });
        }
        drop(tx);
        pool.join();

        let mut slots: Vec<Option<BatchOutcome>> = (0..workers).map(|_| None).collect();
        for (worker, outcome) in rx.iter() {
            slots[worker] = Some(outcome);
        }

        let mut curves = Vec::with_capacity(plan.n_simulations);
        let mut first_error = None;
        for (worker, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(outcome) => {
                    if first_error.is_none() {
                        first_error = outcome.error;
                    }
                    curves.extend(outcome.curves);
                }
                None => {
                    if first_error.is_none() {
                        first_error = Some(FfaError::Numerical(format!(
                            "simulation worker {} exited without a result",
                            worker
                        )));
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if curves.len() < plan.n_simulations {
            return Err(FfaError::Cancelled {
                completed: curves.len(),
                requested: plan.n_simulations,
            });
        }

        Ok(SimulationEnsemble {
            grid: grid.clone(),
            curves,
            sample_size: plan.sample_size,
            warnings: plan.warnings,
        })
    }
}

/// Single-threaded simulation driven by a caller-supplied generator.
pub fn simulate_with_rng<R: Rng + ?Sized>(
    full_sample: &RankedSample,
    sample_size: usize,
    n_simulations: usize,
    grid: &ReturnPeriodGrid,
    rng: &mut R,
    cancel: &CancellationToken,
) -> Result<SimulationEnsemble, FfaError> {
    let plan = resolve_plan(full_sample.len(), sample_size, n_simulations, MAX_SIMULATIONS)?;
    let records = full_sample.peak_records();

    let outcome = run_batch(
        &records,
        plan.sample_size,
        plan.n_simulations,
        grid.values(),
        rng,
        &[cancel],
    );
    if let Some(e) = outcome.error {
        return Err(e);
    }
    if outcome.curves.len() < plan.n_simulations {
        return Err(FfaError::Cancelled {
            completed: outcome.curves.len(),
            requested: plan.n_simulations,
        });
    }

    Ok(SimulationEnsemble {
        grid: grid.clone(),
        curves: outcome.curves,
        sample_size: plan.sample_size,
        warnings: plan.warnings,
    })
}

/// Runs the simulation with the default pool and an unseeded generator.
pub fn simulate(
    full_sample: &RankedSample,
    sample_size: usize,
    n_simulations: usize,
    grid: &ReturnPeriodGrid,
) -> Result<SimulationEnsemble, FfaError> {
    SimulationRunner::default().simulate(
        full_sample,
        sample_size,
        n_simulations,
        grid,
        &CancellationToken::new(),
    )
}

/// Splits `total` runs across `workers` as evenly as possible.
fn partition(total: usize, workers: usize) -> Vec<usize> {
    let base = total / workers;
    let extra = total % workers;
    (0..workers).map(|w| base + usize::from(w < extra)).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
