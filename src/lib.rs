/// ffa_explorer: Log-Pearson Type III flood-frequency analysis of USGS
/// annual peak streamflow records.
///
/// # Module structure
///
/// ```text
/// ffa_explorer
/// ├── model       — shared data types (PeakRecord, LP3FitParameters, FfaError, …)
/// ├── config      — analysis settings and station list loader (ffa.toml)
/// ├── store       — PeakRecordSource trait + in-memory station store
/// ├── explorer    — station selection with bounded fallback to the default
/// ├── ingest
/// │   ├── peak_flow — USGS peak-streamflow RDB parsing, annual maxima
/// │   └── fixtures (test only) — representative RDB payloads
/// └── analysis
///     ├── ranking      — rank order and empirical return periods
///     ├── lp3          — LP3 fit, frequency factors, Pearson III CDF
///     ├── simulation   — sub-sample ensemble on a thread pool
///     ├── uncertainty  — ensemble mean and sigma bands
///     ├── diagnostics  — Q-Q / P-P projection
///     └── report       — full analysis for one station
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod explorer;
pub mod ingest;
pub mod model;
pub mod store;
