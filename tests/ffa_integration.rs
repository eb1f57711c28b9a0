/// Integration tests for the flood-frequency pipeline
///
/// These tests verify:
/// 1. RDB text → ranked record with Weibull return periods
/// 2. Degenerate records are rejected before any curve is produced
/// 3. Simulation ensemble shape over the default 500-point grid
/// 4. Full pipeline: ffa.toml → station store → report, including the
///    fallback to the default station
///
/// Uses the sample peak files under data/; no network or database needed.
///
/// Run with: cargo test --test ffa_integration

use ffa_explorer::analysis::simulation::{CancellationToken, SimulationRunner};
use ffa_explorer::analysis::{lp3, ranking, uncertainty};
use ffa_explorer::config::{load_config_from, AnalysisConfig, GridConfig};
use ffa_explorer::explorer::Explorer;
use ffa_explorer::ingest::peak_flow::parse_rdb;
use ffa_explorer::model::{ConfigurationOutOfRange, FfaError, PeakRecord, ReturnPeriodGrid};
use ffa_explorer::store::{InMemoryPeakStore, PeakRecordSource};

use std::fs;

const TWO_YEAR_RDB: &str = "#\n\
# Sites in this file include:\n\
#  USGS 05570000 SPOON RIVER AT SEVILLE, IL\n\
#\n\
agency_cd\tsite_no\tpeak_dt\tpeak_tm\tpeak_va\tpeak_cd\tgage_ht\n\
5s\t15s\t10d\t6s\t8s\t33s\t8s\n\
USGS\t05570000\t2000-04-02\t\t100\t\t\n\
USGS\t05570000\t2001-05-14\t\t50\t\t\n";

fn kingston_mines() -> Vec<PeakRecord> {
    let text = fs::read_to_string("data/05568500.rdb").expect("sample data/05568500.rdb");
    parse_rdb(&text).expect("sample file parses")
}

fn small_grid() -> GridConfig {
    GridConfig { start: 1.0, end: 500.0, points: 60 }
}

// ---------------------------------------------------------------------------
// Ranking and fitting
// ---------------------------------------------------------------------------

#[test]
fn test_minimal_valid_record() {
    let records = parse_rdb(TWO_YEAR_RDB).unwrap();
    assert_eq!(records.len(), 2);

    let ranked = ranking::rank(&records).unwrap();
    let rows = ranked.records();
    assert_eq!((rows[0].record.peak_flow, rows[0].rank), (100.0, 1));
    assert_eq!((rows[1].record.peak_flow, rows[1].rank), (50.0, 2));
    assert!((rows[0].return_period - 3.0).abs() < 1e-12);
    assert!((rows[1].return_period - 1.5).abs() < 1e-12);
    assert_eq!(rows[0].record.year, 2000);
}

#[test]
fn test_single_year_rejected() {
    let records = vec![PeakRecord::new("05570000", 2000, 4, 2, 100.0)];
    assert_eq!(
        ranking::rank(&records).unwrap_err(),
        FfaError::InsufficientData { n: 1, min: 2 }
    );
}

#[test]
fn test_identical_peaks_are_degenerate() {
    let records: Vec<PeakRecord> = (0..12)
        .map(|i| PeakRecord::new("05570000", 1990 + i, 4, 1, 4200.0))
        .collect();
    let ranked = ranking::rank(&records).unwrap();
    assert_eq!(lp3::fit(&ranked).unwrap_err(), FfaError::DegenerateSkew);
}

#[test]
fn test_return_period_one_is_finite() {
    let z = lp3::standard_normal_quantile(1.0).unwrap();
    assert!(z.is_finite());
    assert!(z < -3.0 && z > -3.2);

    let ranked = ranking::rank(&kingston_mines()).unwrap();
    let fit = lp3::fit(&ranked).unwrap();
    let q = lp3::quantile(&fit, 1.0).unwrap();
    assert!(q.is_finite() && q > 0.0);
}

#[test]
fn test_full_record_curve_increases_with_return_period() {
    let ranked = ranking::rank(&kingston_mines()).unwrap();
    let fit = lp3::fit(&ranked).unwrap();
    assert_eq!(fit.sample_size, 40);
    assert!(fit.log_skew != 0.0);

    let grid = small_grid().build().unwrap();
    let curve = lp3::project(&fit, grid.values()).unwrap();
    assert_eq!(curve.return_periods, grid.values());
    assert!(curve.flows.windows(2).all(|w| w[1] > w[0]));
}

// ---------------------------------------------------------------------------
// Simulation and uncertainty
// ---------------------------------------------------------------------------

#[test]
fn test_ensemble_shape_on_default_grid() {
    let ranked = ranking::rank(&kingston_mines()).unwrap();
    let grid = ReturnPeriodGrid::default();
    let runner = SimulationRunner::new(4).with_seed(2024);

    let ensemble = runner
        .simulate(&ranked, 10, 5, &grid, &CancellationToken::new())
        .unwrap();

    assert_eq!(ensemble.len(), 5);
    assert_eq!(ensemble.sample_size, 10);
    assert!(ensemble.warnings.is_empty());
    for curve in &ensemble.curves {
        assert_eq!(curve.len(), 500);
        assert_eq!(curve.return_periods, grid.values());
    }

    let bands = uncertainty::aggregate(&ensemble).unwrap();
    assert_eq!(bands.len(), 500);
    for band in &bands {
        assert!(band.stdev >= 0.0);
        assert!(band.lower_2_sigma <= band.lower_1_sigma);
        assert!(band.lower_1_sigma <= band.mean);
        assert!(band.mean <= band.upper_1_sigma);
        assert!(band.upper_1_sigma <= band.upper_2_sigma);
    }
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let ranked = ranking::rank(&kingston_mines()).unwrap();
    let grid = small_grid().build().unwrap();
    let cancel = CancellationToken::new();

    let a = SimulationRunner::new(3).with_seed(77).simulate(&ranked, 12, 9, &grid, &cancel).unwrap();
    let b = SimulationRunner::new(3).with_seed(77).simulate(&ranked, 12, 9, &grid, &cancel).unwrap();
    assert_eq!(a.curves, b.curves);
}

#[test]
fn test_oversized_sample_is_clamped() {
    let ranked = ranking::rank(&kingston_mines()).unwrap();
    let grid = small_grid().build().unwrap();

    let ensemble = SimulationRunner::new(2)
        .with_seed(5)
        .simulate(&ranked, 40, 3, &grid, &CancellationToken::new())
        .unwrap();

    assert_eq!(ensemble.sample_size, 39);
    assert_eq!(
        ensemble.warnings,
        vec![ConfigurationOutOfRange::SampleSize { requested: 40, effective: 39, n_years: 40 }]
    );
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn test_repository_config_end_to_end() {
    let config = load_config_from("ffa.toml").unwrap();
    let explorer = Explorer::from_config(&config).unwrap();

    let analysis = AnalysisConfig {
        seed: Some(11),
        grid: small_grid(),
        ..config.analysis.clone()
    };
    let outcome = explorer
        .analyze_with_fallback(&config.default_station, &analysis)
        .unwrap();
    let report = outcome.report;

    assert!(outcome.fallback.is_none());
    assert_eq!(report.station_id, config.default_station);
    assert_eq!(report.n_years, 40);
    assert_eq!(report.records.len(), 40);
    assert_eq!(report.bands.len(), 60);
    assert_eq!(report.lp3_curve.len(), 60);
    assert_eq!(report.qq_pairs.len(), 40);
    assert_eq!(report.n_simulations, analysis.n_simulations);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["station_id"], "05568500");
    assert_eq!(json["bands"].as_array().map(|b| b.len()), Some(60));
}

#[test]
fn test_second_station_uses_annual_maxima() {
    let config = load_config_from("ffa.toml").unwrap();
    let store = InMemoryPeakStore::from_config(&config).unwrap();
    let raw = store.annual_peaks("05570000").unwrap();

    let explorer = Explorer::new(store, &config.default_station);
    let analysis = AnalysisConfig { seed: Some(3), grid: small_grid(), workers: 2, ..AnalysisConfig::default() };
    let report = explorer.analyze("05570000", &analysis).unwrap();

    // one row per water year reaches the fit
    let mut years: Vec<i32> = raw.iter().map(|r| r.year).collect();
    years.sort_unstable();
    years.dedup();
    assert_eq!(report.n_years + report.discarded_peaks, years.len());
    assert!(report.n_years < raw.len());
}

#[test]
fn test_short_station_falls_back_to_default() {
    let mut store = InMemoryPeakStore::new();
    store.insert(kingston_mines());
    store.insert(vec![PeakRecord::new("05570000", 2001, 5, 14, 50.0)]);

    let explorer = Explorer::new(store, "05568500");
    let analysis = AnalysisConfig { seed: Some(9), grid: small_grid(), workers: 2, ..AnalysisConfig::default() };
    let outcome = explorer.analyze_with_fallback("05570000", &analysis).unwrap();

    assert_eq!(outcome.report.station_id, "05568500");
    let notice = outcome.fallback.expect("fallback notice");
    assert_eq!(notice.requested_station, "05570000");
    assert_eq!(notice.reason, FfaError::InsufficientData { n: 1, min: 2 });
}
