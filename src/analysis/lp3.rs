/// Log-Pearson Type III fitting by the method of moments on log10 peaks.
///
/// The frequency factor uses the Wilson-Hilferty approximation:
///
/// ```text
/// k = (2 / g) * (((z - g/6) * g/6 + 1)^3 - 1)
/// Q = 10^(mean + k * stdev)
/// ```
///
/// where `g`, `mean` and `stdev` are the skew, mean and population standard
/// deviation of log10(Q), and `z` is the standard normal quantile of the
/// non-exceedance probability 1 - 1/Tr.

use statrs::distribution::{ContinuousCDF, Gamma, Normal};

use crate::analysis::ranking::MIN_SAMPLE_SIZE;
use crate::model::{FfaError, LP3FitParameters, PeakRecord, QuantileCurve, RankedSample};

/// Subtracted from 1/Tr when Tr <= 1 so the normal quantile stays finite.
///
/// This is an approximation: every Tr <= 1 maps to non-exceedance
/// probability 0.001 (z ≈ -3.09) instead of the true pole at -inf.
pub const RETURN_PERIOD_EPSILON: f64 = 0.001;

/// Below this |skew| the Pearson III CDF is evaluated as a standard normal.
const NORMAL_SKEW_TRANSITION: f64 = 1.6e-5;

/// f64 decimal resolution; a variance below (resolution * mean)^2 is zero.
const MOMENT_RESOLUTION: f64 = 1e-15;

/// Rounding headroom, in machine epsilons, allowed on a computed skew.
const SKEW_ROUNDING_ULPS: f64 = 64.0;

// ---------------------------------------------------------------------------
// Fitting
// ---------------------------------------------------------------------------

/// Fits LP3 parameters to the peak flows of a ranked sample.
pub fn fit(sample: &RankedSample) -> Result<LP3FitParameters, FfaError> {
    let records: Vec<&PeakRecord> = sample.records().iter().map(|r| &r.record).collect();
    let logs = log10_peaks(&records)?;
    fit_log_values(&logs)
}

/// Fits LP3 parameters to raw peak values.
pub fn fit_values(values: &[f64]) -> Result<LP3FitParameters, FfaError> {
    let mut logs = Vec::with_capacity(values.len());
    for &v in values {
        if !(v.is_finite() && v > 0.0) {
            return Err(FfaError::InvalidPeakValue { year: 0, value: v });
        }
        logs.push(v.log10());
    }
    fit_log_values(&logs)
}

fn log10_peaks(records: &[&PeakRecord]) -> Result<Vec<f64>, FfaError> {
    records
        .iter()
        .map(|r| {
            if r.is_valid() {
                Ok(r.peak_flow.log10())
            } else {
                Err(FfaError::InvalidPeakValue { year: r.year, value: r.peak_flow })
            }
        })
        .collect()
}

fn fit_log_values(logs: &[f64]) -> Result<LP3FitParameters, FfaError> {
    let n = logs.len();
    if n < MIN_SAMPLE_SIZE {
        return Err(FfaError::InsufficientData { n, min: MIN_SAMPLE_SIZE });
    }

    let (mean, m2, m3) = central_moments(logs);
    let log_skew = moment_skew(mean, m2, m3);

    if log_skew == 0.0 || !log_skew.is_finite() {
        return Err(FfaError::DegenerateSkew);
    }

    Ok(LP3FitParameters {
        log_skew,
        log_mean: mean,
        log_stdev: m2.sqrt(),
        sample_size: n,
    })
}

/// Mean and the second and third population central moments.
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let (mut m2, mut m3) = (0.0, 0.0);
    for v in values {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
    }
    (mean, m2 / n, m3 / n)
}

/// Biased (population) sample skewness, m3 / m2^1.5.
///
/// Returns 0.0 for samples with no measurable spread.
pub fn skewness(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let (mean, m2, m3) = central_moments(values);
    moment_skew(mean, m2, m3)
}

/// m3 / m2^1.5, snapped to exactly 0 when it is within rounding of zero.
///
/// Deviations from the mean carry an absolute error of about eps * |mean|,
/// so the skew of a sample whose true skew is zero (log-symmetric samples,
/// every two-point sample) comes out as noise of order
/// eps * |mean| / stdev rather than 0.
fn moment_skew(mean: f64, m2: f64, m3: f64) -> f64 {
    if m2 <= (MOMENT_RESOLUTION * mean).powi(2) {
        return 0.0;
    }
    let stdev = m2.sqrt();
    let skew = m3 / (m2 * stdev);
    let resolution = SKEW_ROUNDING_ULPS * f64::EPSILON * (1.0 + mean.abs() / stdev);
    if skew.abs() <= resolution { 0.0 } else { skew }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn standard_normal() -> Result<Normal, FfaError> {
    Normal::new(0.0, 1.0).map_err(|e| FfaError::Numerical(e.to_string()))
}

/// Non-exceedance probability for a return period, with the Tr <= 1 nudge.
pub fn non_exceedance_probability(return_period: f64) -> f64 {
    if return_period <= 1.0 {
        // 1 - (1/1 - ε)
        RETURN_PERIOD_EPSILON
    } else {
        1.0 - 1.0 / return_period
    }
}

/// z = Φ⁻¹(1 − 1/Tr).
pub fn standard_normal_quantile(return_period: f64) -> Result<f64, FfaError> {
    if !(return_period.is_finite() && return_period > 0.0) {
        return Err(FfaError::InvalidReturnPeriodGrid(format!(
            "return period {} is not a positive finite number",
            return_period
        )));
    }
    Ok(standard_normal()?.inverse_cdf(non_exceedance_probability(return_period)))
}

/// Wilson-Hilferty frequency factor k for normal quantile `z` and skew `g`.
pub fn frequency_factor(z: f64, skew: f64) -> f64 {
    let g6 = skew / 6.0;
    2.0 / skew * (((z - g6) * g6 + 1.0).powi(3) - 1.0)
}

/// Flow quantile for a single return period.
pub fn quantile(params: &LP3FitParameters, return_period: f64) -> Result<f64, FfaError> {
    let z = standard_normal_quantile(return_period)?;
    Ok(flow_from_z(params, z))
}

fn flow_from_z(params: &LP3FitParameters, z: f64) -> f64 {
    let k = frequency_factor(z, params.log_skew);
    10f64.powf(params.log_mean + k * params.log_stdev)
}

/// Evaluates the fitted model at every requested return period.
///
/// The same return periods are used for the model curve and any empirical
/// overlay, so the two line up point for point.
pub fn project(params: &LP3FitParameters, return_periods: &[f64]) -> Result<QuantileCurve, FfaError> {
    if params.log_skew == 0.0 {
        return Err(FfaError::DegenerateSkew);
    }
    let normal = standard_normal()?;

    let mut flows = Vec::with_capacity(return_periods.len());
    for &tr in return_periods {
        if !(tr.is_finite() && tr > 0.0) {
            return Err(FfaError::InvalidReturnPeriodGrid(format!(
                "return period {} is not a positive finite number",
                tr
            )));
        }
        let z = normal.inverse_cdf(non_exceedance_probability(tr));
        flows.push(flow_from_z(params, z));
    }

    Ok(QuantileCurve {
        return_periods: return_periods.to_vec(),
        flows,
    })
}

// ---------------------------------------------------------------------------
// Pearson Type III distribution
// ---------------------------------------------------------------------------

/// CDF of a standardized Pearson Type III distribution with skew `skew`.
///
/// Shape alpha = 4/g², and the variate is shifted so the distribution has
/// mean 0 and unit variance. Negative skew mirrors the gamma tail.
pub fn pearson3_cdf(x: f64, skew: f64) -> Result<f64, FfaError> {
    if skew.abs() < NORMAL_SKEW_TRANSITION {
        return Ok(standard_normal()?.cdf(x));
    }

    let alpha = 4.0 / (skew * skew);
    let t = 2.0 / skew * x + alpha;
    let gamma = Gamma::new(alpha, 1.0).map_err(|e| FfaError::Numerical(e.to_string()))?;
    let lower = if t <= 0.0 { 0.0 } else { gamma.cdf(t) };

    Ok(if skew > 0.0 { lower } else { 1.0 - lower })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
