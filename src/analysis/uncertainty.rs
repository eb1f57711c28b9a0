/// Reduces a simulation ensemble to mean and ±1σ / ±2σ bands per grid point.
///
/// The standard deviation is the population form (divide by the number of
/// runs), so a single-run ensemble collapses every band onto its mean.

use crate::model::{FfaError, SimulationEnsemble, UncertaintyBand};

/// Mean, stdev and sigma bounds at every return period of the ensemble grid.
pub fn aggregate(ensemble: &SimulationEnsemble) -> Result<Vec<UncertaintyBand>, FfaError> {
    if ensemble.is_empty() {
        return Err(FfaError::InsufficientData { n: 0, min: 1 });
    }

    let grid = ensemble.grid.values();
    if let Some(curve) = ensemble.curves.iter().find(|c| c.len() != grid.len()) {
        return Err(FfaError::InvalidReturnPeriodGrid(format!(
            "curve has {} points but the grid has {}",
            curve.len(),
            grid.len()
        )));
    }

    let runs = ensemble.len() as f64;
    let bands = grid
        .iter()
        .enumerate()
        .map(|(i, &return_period)| {
            let mean = ensemble.curves.iter().map(|c| c.flows[i]).sum::<f64>() / runs;
            let variance = ensemble
                .curves
                .iter()
                .map(|c| (c.flows[i] - mean).powi(2))
                .sum::<f64>()
                / runs;
            band(return_period, mean, variance.sqrt())
        })
        .collect();

    Ok(bands)
}

fn band(return_period: f64, mean: f64, stdev: f64) -> UncertaintyBand {
    UncertaintyBand {
        return_period,
        mean,
        stdev,
        lower_1_sigma: mean - stdev,
        upper_1_sigma: mean + stdev,
        lower_2_sigma: mean - 2.0 * stdev,
        upper_2_sigma: mean + 2.0 * stdev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuantileCurve, ReturnPeriodGrid};

    fn ensemble(curves: Vec<Vec<f64>>) -> SimulationEnsemble {
        let grid = ReturnPeriodGrid::new(vec![2.0, 10.0, 100.0]).unwrap();
        SimulationEnsemble {
            curves: curves
                .into_iter()
                .map(|flows| QuantileCurve {
                    return_periods: grid.values().to_vec(),
                    flows,
                })
                .collect(),
            grid,
            sample_size: 10,
            warnings: vec![],
        }
    }

    #[test]
    fn test_single_curve_has_zero_spread() {
        let bands = aggregate(&ensemble(vec![vec![410.0, 780.0, 1320.0]])).unwrap();
        assert_eq!(bands.len(), 3);
        for (b, expected) in bands.iter().zip([410.0, 780.0, 1320.0]) {
            assert_eq!(b.mean, expected);
            assert_eq!(b.stdev, 0.0);
            assert_eq!(b.lower_1_sigma, expected);
            assert_eq!(b.upper_1_sigma, expected);
            assert_eq!(b.lower_2_sigma, expected);
            assert_eq!(b.upper_2_sigma, expected);
        }
    }

    #[test]
    fn test_population_stdev_and_bands() {
        let bands = aggregate(&ensemble(vec![
            vec![100.0, 200.0, 300.0],
            vec![300.0, 200.0, 500.0],
        ]))
        .unwrap();

        assert_eq!(bands[0].return_period, 2.0);
        assert_eq!(bands[0].mean, 200.0);
        assert_eq!(bands[0].stdev, 100.0);
        assert_eq!(bands[0].lower_1_sigma, 100.0);
        assert_eq!(bands[0].upper_2_sigma, 400.0);

        assert_eq!(bands[1].stdev, 0.0);
        assert_eq!(bands[2].mean, 400.0);
        assert_eq!(bands[2].lower_2_sigma, 200.0);
    }

    #[test]
    fn test_order_of_runs_does_not_matter() {
        let a = aggregate(&ensemble(vec![
            vec![120.0, 460.0, 900.0],
            vec![150.0, 410.0, 1010.0],
            vec![90.0, 505.0, 870.0],
        ]))
        .unwrap();
        let b = aggregate(&ensemble(vec![
            vec![90.0, 505.0, 870.0],
            vec![120.0, 460.0, 900.0],
            vec![150.0, 410.0, 1010.0],
        ]))
        .unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x.mean - y.mean).abs() < 1e-9);
            assert!((x.stdev - y.stdev).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_ensemble_rejected() {
        assert!(aggregate(&ensemble(vec![])).is_err());
    }

    #[test]
    fn test_mismatched_curve_rejected() {
        assert!(aggregate(&ensemble(vec![vec![1.0, 2.0]])).is_err());
    }
}
