/// Q-Q and P-P diagnostics for the full record against its LP3 fit.
///
/// Theoretical CDF values are matched to empirical plotting positions by
/// order statistic: both sequences are sorted ascending and paired by
/// position. Nothing depends on the order records arrive in.

use crate::analysis::lp3;
use crate::model::{FfaError, LP3FitParameters, RankedSample, RecordDiagnostics};

/// Per-record diagnostics, in rank order.
pub fn diagnostics(
    sample: &RankedSample,
    params: &LP3FitParameters,
) -> Result<Vec<RecordDiagnostics>, FfaError> {
    let records = sample.records();
    let return_periods: Vec<f64> = records.iter().map(|r| r.return_period).collect();
    let fitted = lp3::project(params, &return_periods)?;

    let mut theoretical_cdfs = return_periods
        .iter()
        .map(|&tr| lp3::pearson3_cdf(lp3::standard_normal_quantile(tr)?, params.log_skew))
        .collect::<Result<Vec<f64>, FfaError>>()?;
    theoretical_cdfs.sort_by(f64::total_cmp);

    let mut empirical: Vec<(usize, f64)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (i, sample.empirical_cdf(r.rank)))
        .collect();
    empirical.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut aligned = vec![0.0; records.len()];
    for (&(idx, _), &cdf) in empirical.iter().zip(&theoretical_cdfs) {
        aligned[idx] = cdf;
    }

    Ok(records
        .iter()
        .enumerate()
        .map(|(i, r)| RecordDiagnostics {
            year: r.record.year,
            peak_flow: r.record.peak_flow,
            rank: r.rank,
            return_period: r.return_period,
            theoretical_quantile: fitted.flows[i],
            empirical_cdf: sample.empirical_cdf(r.rank),
            theoretical_cdf: aligned[i],
        })
        .collect())
}

/// (theoretical quantile, observed peak) points, smallest first.
pub fn qq_pairs(diagnostics: &[RecordDiagnostics]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = diagnostics
        .iter()
        .map(|d| (d.theoretical_quantile, d.peak_flow))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs
}

/// (empirical CDF, theoretical CDF) points, smallest empirical first.
pub fn pp_pairs(diagnostics: &[RecordDiagnostics]) -> Vec<(f64, f64)> {
    let mut pairs: Vec<(f64, f64)> = diagnostics
        .iter()
        .map(|d| (d.empirical_cdf, d.theoretical_cdf))
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs
}
