/// Descending rank and empirical return period (Weibull plotting position).
///
/// Ties keep their input order: the first-encountered of two equal peaks
/// gets the smaller rank. Ranks are never averaged.

use crate::model::{FfaError, PeakRecord, RankedRecord, RankedSample};

/// Minimum sample size; a single point has no usable plotting position.
pub const MIN_SAMPLE_SIZE: usize = 2;

/// Ranks `sample` by peak flow, largest first, and assigns
/// return period (n + 1) / rank.
pub fn rank(sample: &[PeakRecord]) -> Result<RankedSample, FfaError> {
    rank_by(sample, |r| r.peak_flow)
}

/// Ranks by an arbitrary numeric field of the record.
pub fn rank_by<F>(sample: &[PeakRecord], field: F) -> Result<RankedSample, FfaError>
where
    F: Fn(&PeakRecord) -> f64,
{
    let n = sample.len();
    if n < MIN_SAMPLE_SIZE {
        return Err(FfaError::InsufficientData { n, min: MIN_SAMPLE_SIZE });
    }

    let mut order: Vec<usize> = (0..n).collect();
    // sort_by is stable, so equal values stay in input order
    order.sort_by(|&a, &b| field(&sample[b]).total_cmp(&field(&sample[a])));

    let records = order
        .into_iter()
        .enumerate()
        .map(|(i, idx)| {
            let rank = i + 1;
            RankedRecord {
                record: sample[idx].clone(),
                rank,
                return_period: (n + 1) as f64 / rank as f64,
            }
        })
        .collect();

    Ok(RankedSample::from_ranked(records))
}
