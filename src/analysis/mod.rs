/// Flood-frequency analysis of annual peak records.
///
/// Submodules:
/// - `ranking`     — descending rank order and Weibull return periods.
/// - `lp3`         — method-of-moments Log-Pearson Type III fit and quantiles.
/// - `simulation`  — repeated sub-sample fits on a worker pool.
/// - `uncertainty` — per-return-period mean and ±1σ/±2σ bands.
/// - `diagnostics` — Q-Q / P-P coordinates for every ranked record.
/// - `report`      — one invocation end to end.

pub mod diagnostics;
pub mod lp3;
pub mod ranking;
pub mod report;
pub mod simulation;
pub mod uncertainty;
