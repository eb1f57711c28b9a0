/// Shared data types for the flood-frequency explorer.
///
/// Everything here is owned by a single analysis invocation: a station's
/// annual peaks come in as `PeakRecord`s, get ranked into a `RankedSample`,
/// fitted into `LP3FitParameters`, and projected onto a `ReturnPeriodGrid`
/// as `QuantileCurve`s. Nothing is shared or mutated across invocations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Peak records
// ---------------------------------------------------------------------------

/// One annual maximum instantaneous flow observation.
///
/// `month` and `day` are 0 when the source only knows the year of the peak
/// (common for pre-1900 records in the USGS peak database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakRecord {
    pub station_id: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Peak flow in the station's flow units (cfs for USGS, m³/s for HYDAT).
    pub peak_flow: f64,
    /// QA/QC qualification symbol(s), if any.
    pub flag: Option<String>,
}

impl PeakRecord {
    pub fn new(station_id: &str, year: i32, month: u32, day: u32, peak_flow: f64) -> Self {
        Self {
            station_id: station_id.to_string(),
            year,
            month,
            day,
            peak_flow,
            flag: None,
        }
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flag = Some(flag.to_string());
        self
    }

    /// Calendar date of the peak, when month and day are known.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// A peak can be log-transformed only if it is finite and positive.
    pub fn is_valid(&self) -> bool {
        self.peak_flow.is_finite() && self.peak_flow > 0.0
    }
}

/// A peak record annotated with its descending rank and plotting position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRecord {
    pub record: PeakRecord,
    /// 1 for the largest peak, n for the smallest.
    pub rank: usize,
    /// Empirical return period (n + 1) / rank, in years.
    pub return_period: f64,
}

/// A sample ranked in descending order of peak flow.
///
/// Records are stored in rank order (rank 1 first), so `records()[i].rank`
/// is always `i + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSample {
    records: Vec<RankedRecord>,
}

impl RankedSample {
    pub(crate) fn from_ranked(records: Vec<RankedRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RankedRecord] {
        &self.records
    }

    /// Underlying peak records in rank order, for re-sampling.
    pub fn peak_records(&self) -> Vec<PeakRecord> {
        self.records.iter().map(|r| r.record.clone()).collect()
    }

    /// Plotting-position probability rank / (n + 1) for a given rank.
    pub fn empirical_cdf(&self, rank: usize) -> f64 {
        rank as f64 / (self.records.len() + 1) as f64
    }
}

// ---------------------------------------------------------------------------
// LP3 model
// ---------------------------------------------------------------------------

/// Moments of the log10-transformed peaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LP3FitParameters {
    pub log_skew: f64,
    pub log_mean: f64,
    pub log_stdev: f64,
    /// Number of peaks the fit was computed from.
    pub sample_size: usize,
}

/// Ordered return periods (years) at which curves are evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPeriodGrid {
    values: Vec<f64>,
}

impl ReturnPeriodGrid {
    /// Validates a caller-supplied grid: non-empty, finite, positive and
    /// strictly increasing.
    pub fn new(values: Vec<f64>) -> Result<Self, FfaError> {
        if values.is_empty() {
            return Err(FfaError::InvalidReturnPeriodGrid("grid is empty".to_string()));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
            return Err(FfaError::InvalidReturnPeriodGrid(format!(
                "return period {} is not a positive finite number",
                bad
            )));
        }
        if values.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FfaError::InvalidReturnPeriodGrid(
                "return periods must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { values })
    }

    /// Geometric sequence of `points` values from `start` to `end` inclusive.
    pub fn geometric(start: f64, end: f64, points: usize) -> Result<Self, FfaError> {
        if points < 2 {
            return Err(FfaError::InvalidReturnPeriodGrid(format!(
                "a geometric grid needs at least 2 points, got {}",
                points
            )));
        }
        if !(start > 0.0 && end > start && end.is_finite()) {
            return Err(FfaError::InvalidReturnPeriodGrid(format!(
                "geometric grid bounds must satisfy 0 < start < end, got {} .. {}",
                start, end
            )));
        }

        let ratio = (end / start).ln() / (points - 1) as f64;
        let mut values: Vec<f64> = (0..points)
            .map(|i| start * (ratio * i as f64).exp())
            .collect();
        // pin the endpoints so rounding never drifts past the requested bounds
        values[0] = start;
        values[points - 1] = end;

        Self::new(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for ReturnPeriodGrid {
    /// 500 points spaced geometrically between 0.01 and 1000 years.
    ///
    /// Roughly the first 200 points lie at or below one year; they all map
    /// to the Tr = 1 quantile, so curves over this grid are flat there.
    fn default() -> Self {
        let ratio = (1000.0f64 / 0.01).ln() / 499.0;
        let mut values: Vec<f64> = (0..500).map(|i| 0.01 * (ratio * i as f64).exp()).collect();
        values[499] = 1000.0;
        Self { values }
    }
}

/// Flow quantiles evaluated over a return-period grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileCurve {
    pub return_periods: Vec<f64>,
    pub flows: Vec<f64>,
}

impl QuantileCurve {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// One quantile curve per simulation run, all over the same grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationEnsemble {
    pub grid: ReturnPeriodGrid,
    pub curves: Vec<QuantileCurve>,
    /// Effective sub-sample size after clamping.
    pub sample_size: usize,
    pub warnings: Vec<ConfigurationOutOfRange>,
}

impl SimulationEnsemble {
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

/// Spread of the simulated quantiles at one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UncertaintyBand {
    pub return_period: f64,
    pub mean: f64,
    pub stdev: f64,
    pub lower_1_sigma: f64,
    pub upper_1_sigma: f64,
    pub lower_2_sigma: f64,
    pub upper_2_sigma: f64,
}

/// Q-Q and P-P coordinates for one observed peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDiagnostics {
    pub year: i32,
    pub peak_flow: f64,
    pub rank: usize,
    pub return_period: f64,
    /// Fitted LP3 flow at this record's empirical return period.
    pub theoretical_quantile: f64,
    /// rank / (n + 1).
    pub empirical_cdf: f64,
    /// Pearson III CDF at the standard-normal quantile, aligned by order
    /// statistic with `empirical_cdf`.
    pub theoretical_cdf: f64,
}

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// Failures raised by the estimation core and its input collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum FfaError {
    /// Fewer than `min` valid peaks were available.
    InsufficientData { n: usize, min: usize },
    /// Log-skew of a sample is exactly zero; the LP3 frequency factor divides by it.
    DegenerateSkew,
    /// A peak cannot be log-transformed (zero, negative or non-finite).
    InvalidPeakValue { year: i32, value: f64 },
    /// The return-period grid is empty, unordered or contains non-positive values.
    InvalidReturnPeriodGrid(String),
    /// A distribution could not be constructed or evaluated.
    Numerical(String),
    /// The simulation was aborted between iterations.
    Cancelled { completed: usize, requested: usize },
    /// No peak records exist for the requested station.
    StationNotFound(String),
    /// Peak records could not be read from their source.
    Source(String),
}

impl fmt::Display for FfaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FfaError::InsufficientData { n, min } => write!(
                f,
                "Insufficient data: {} valid annual peak(s), at least {} required",
                n, min
            ),
            FfaError::DegenerateSkew => write!(
                f,
                "Log-skew of the sample is exactly zero; the LP3 fit is undefined"
            ),
            FfaError::InvalidPeakValue { year, value } => write!(
                f,
                "Peak flow {} for year {} cannot be log-transformed",
                value, year
            ),
            FfaError::InvalidReturnPeriodGrid(msg) => {
                write!(f, "Invalid return period grid: {}", msg)
            }
            FfaError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
            FfaError::Cancelled { completed, requested } => write!(
                f,
                "Simulation cancelled after {} of {} runs",
                completed, requested
            ),
            FfaError::StationNotFound(station) => {
                write!(f, "No annual peak records found for station '{}'", station)
            }
            FfaError::Source(msg) => write!(f, "Failed to read peak records: {}", msg),
        }
    }
}

impl std::error::Error for FfaError {}

/// A requested configuration value outside its allowed range.
///
/// These are clamped and reported, never raised as failures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConfigurationOutOfRange {
    SampleSize { requested: usize, effective: usize, n_years: usize },
    SimulationCount { requested: usize, effective: usize, cap: usize },
}

impl fmt::Display for ConfigurationOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationOutOfRange::SampleSize { requested, effective, n_years } => write!(
                f,
                "Sample size {} is not below the {} years of record; using {}",
                requested, n_years, effective
            ),
            ConfigurationOutOfRange::SimulationCount { requested, effective, cap } => write!(
                f,
                "Simulation count {} outside 1..={}; using {}",
                requested, cap, effective
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
