/// One flood-frequency analysis invocation, end to end.
///
/// Takes a station's annual peaks and an immutable `AnalysisConfig`, and
/// returns the three data products a rendering layer needs: the ranked
/// record with per-record diagnostics, the full-record LP3 curve, and the
/// simulation uncertainty bands. Configuration changes mean a new call.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::simulation::{CancellationToken, SimulationRunner};
use crate::analysis::{diagnostics, lp3, ranking, uncertainty};
use crate::config::AnalysisConfig;
use crate::ingest::peak_flow::{annual_maxima, valid_peaks};
use crate::model::{
    ConfigurationOutOfRange, FfaError, LP3FitParameters, PeakRecord, QuantileCurve,
    RecordDiagnostics, UncertaintyBand,
};

/// Everything produced for one station and configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub station_id: String,
    pub generated_at: DateTime<Utc>,
    /// Valid annual peaks used for the full-record fit.
    pub n_years: usize,
    pub sample_size: usize,
    pub n_simulations: usize,
    pub fit: LP3FitParameters,
    /// Ranked record with Q-Q / P-P coordinates, largest peak first.
    pub records: Vec<RecordDiagnostics>,
    pub lp3_curve: QuantileCurve,
    pub bands: Vec<UncertaintyBand>,
    pub qq_pairs: Vec<(f64, f64)>,
    pub pp_pairs: Vec<(f64, f64)>,
    pub warnings: Vec<ConfigurationOutOfRange>,
    /// Peaks dropped because they could not be log-transformed.
    pub discarded_peaks: usize,
}

impl AnalysisReport {
    /// One-paragraph description of the simulation for display.
    pub fn summary(&self) -> String {
        format!(
            "Mean of {} simulations of a sample size {} out of a total {} years of record. \
             Bands indicate 1 and 2 standard deviations from the mean, respectively.",
            self.n_simulations, self.sample_size, self.n_years
        )
    }

    /// One row per requested return period, pairing the full-record LP3
    /// flow with the simulation band at the same grid point.
    ///
    /// The row's return period is the nearest grid value, and the LP3 flow
    /// is evaluated there too.
    pub fn summary_rows(&self, return_periods: &[f64]) -> Result<Vec<SummaryRow>, FfaError> {
        return_periods
            .iter()
            .map(|&tr| {
                let band = self.band_near(tr).copied();
                let return_period = band.map_or(tr, |b| b.return_period);
                Ok(SummaryRow {
                    return_period,
                    lp3_flow: lp3::quantile(&self.fit, return_period)?,
                    band,
                })
            })
            .collect()
    }

    /// Band at the grid point closest to `return_period`.
    pub fn band_near(&self, return_period: f64) -> Option<&UncertaintyBand> {
        self.bands.iter().min_by(|a, b| {
            (a.return_period - return_period)
                .abs()
                .total_cmp(&(b.return_period - return_period).abs())
        })
    }
}

/// A line of the return-period summary table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryRow {
    pub return_period: f64,
    pub lp3_flow: f64,
    pub band: Option<UncertaintyBand>,
}

/// Runs the full analysis for `station_id` over `records`.
pub fn run_analysis(
    station_id: &str,
    records: &[PeakRecord],
    config: &AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<AnalysisReport, FfaError> {
    let annual = annual_maxima(records);
    let valid = valid_peaks(&annual);
    let discarded_peaks = annual.len() - valid.len();

    let full = ranking::rank(&valid)?;
    let fit = lp3::fit(&full)?;

    let grid = config.grid.build()?;
    let lp3_curve = lp3::project(&fit, grid.values())?;

    let mut runner = SimulationRunner::new(config.workers).with_max_simulations(config.max_simulations);
    if let Some(seed) = config.seed {
        runner = runner.with_seed(seed);
    }
    let ensemble = runner.simulate(&full, config.sample_size, config.n_simulations, &grid, cancel)?;
    let bands = uncertainty::aggregate(&ensemble)?;

    let record_diagnostics = diagnostics::diagnostics(&full, &fit)?;
    let qq_pairs = diagnostics::qq_pairs(&record_diagnostics);
    let pp_pairs = diagnostics::pp_pairs(&record_diagnostics);

    Ok(AnalysisReport {
        station_id: station_id.to_string(),
        generated_at: Utc::now(),
        n_years: full.len(),
        sample_size: ensemble.sample_size,
        n_simulations: ensemble.len(),
        fit,
        records: record_diagnostics,
        lp3_curve,
        bands,
        qq_pairs,
        pp_pairs,
        warnings: ensemble.warnings,
        discarded_peaks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;

    fn record(n: i32) -> Vec<PeakRecord> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                PeakRecord::new("05568500", 1960 + i, 4, 15, 9000.0 + 1800.0 * x + 90.0 * x * x)
            })
            .collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            sample_size: 10,
            n_simulations: 5,
            workers: 2,
            seed: Some(17),
            grid: GridConfig { start: 1.0, end: 200.0, points: 40 },
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn test_report_products() {
        let report = run_analysis("05568500", &record(40), &config(), &CancellationToken::new()).unwrap();

        assert_eq!(report.n_years, 40);
        assert_eq!(report.records.len(), 40);
        assert_eq!(report.lp3_curve.len(), 40);
        assert_eq!(report.bands.len(), 40);
        assert_eq!(report.n_simulations, 5);
        assert_eq!(report.sample_size, 10);
        assert!(report.warnings.is_empty());
        assert_eq!(report.discarded_peaks, 0);
        assert!(report.summary().contains("Mean of 5 simulations of a sample size 10"));
    }

    #[test]
    fn test_invalid_peaks_dropped_before_ranking() {
        let mut records = record(12);
        records.push(PeakRecord::new("05568500", 1990, 3, 1, 0.0));
        let report = run_analysis("05568500", &records, &config(), &CancellationToken::new()).unwrap();
        assert_eq!(report.discarded_peaks, 1);
        assert_eq!(report.n_years, 12);
    }

    #[test]
    fn test_single_year_is_insufficient() {
        let result = run_analysis("05568500", &record(1), &config(), &CancellationToken::new());
        assert_eq!(result.unwrap_err(), FfaError::InsufficientData { n: 1, min: 2 });
    }

    #[test]
    fn test_oversized_sample_is_clamped() {
        let mut cfg = config();
        cfg.sample_size = 25;
        let report = run_analysis("05568500", &record(20), &cfg, &CancellationToken::new()).unwrap();
        assert_eq!(report.sample_size, 19);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_band_near() {
        let report = run_analysis("05568500", &record(30), &config(), &CancellationToken::new()).unwrap();
        let band = report.band_near(100.0).unwrap();
        assert!((band.return_period - 100.0).abs() < 15.0);
        assert!(band.lower_2_sigma <= band.mean && band.mean <= band.upper_2_sigma);
    }

    #[test]
    fn test_summary_rows_use_one_return_period() {
        let report = run_analysis("05568500", &record(30), &config(), &CancellationToken::new()).unwrap();
        let rows = report.summary_rows(&[2.0, 100.0]).unwrap();

        assert_eq!(rows.len(), 2);
        for row in &rows {
            let band = row.band.unwrap();
            assert_eq!(row.return_period, band.return_period);
            assert_eq!(row.lp3_flow, lp3::quantile(&report.fit, band.return_period).unwrap());
        }
        // 40-point grid from 1 to 200 has no point at exactly 2 years
        assert!(rows[0].return_period != 2.0);
    }
}
