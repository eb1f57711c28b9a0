/// Caller-side driver for flood-frequency analyses.
///
/// Owns the peak record source and the default station, and applies the
/// recovery policy the core leaves to its caller: when the requested
/// station cannot be analyzed for lack of data, reset to the default
/// station and try again, a bounded number of times.

use crate::analysis::report::{run_analysis, AnalysisReport};
use crate::analysis::simulation::CancellationToken;
use crate::config::{AnalysisConfig, ExplorerConfig, StationConfig};
use crate::model::FfaError;
use crate::store::{InMemoryPeakStore, PeakRecordSource};

/// How many times a failed station selection is retried with the default.
pub const MAX_FALLBACK_RETRIES: usize = 1;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Why the explorer switched away from the requested station.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackNotice {
    pub requested_station: String,
    pub used_station: String,
    pub reason: FfaError,
}

impl FallbackNotice {
    /// Message for the presentation layer.
    pub fn message(&self) -> String {
        format!(
            "{} Showing default station {} instead of {}.",
            self.reason, self.used_station, self.requested_station
        )
    }
}

#[derive(Debug, Clone)]
pub struct ExplorerOutcome {
    pub report: AnalysisReport,
    pub fallback: Option<FallbackNotice>,
}

/// Errors worth retrying against the default station.
fn is_recoverable(error: &FfaError) -> bool {
    matches!(
        error,
        FfaError::InsufficientData { .. } | FfaError::StationNotFound(_)
    )
}

// ---------------------------------------------------------------------------
// Explorer
// ---------------------------------------------------------------------------

pub struct Explorer<S: PeakRecordSource> {
    source: S,
    default_station: String,
    stations: Vec<StationConfig>,
    cancel: CancellationToken,
}

impl Explorer<InMemoryPeakStore> {
    /// Loads every configured station's peak file into memory.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, FfaError> {
        let store = InMemoryPeakStore::from_config(config)?;
        Ok(Self::new(store, &config.default_station).with_stations(config.stations.clone()))
    }
}

impl<S: PeakRecordSource> Explorer<S> {
    pub fn new(source: S, default_station: &str) -> Self {
        Self {
            source,
            default_station: default_station.to_string(),
            stations: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_stations(mut self, stations: Vec<StationConfig>) -> Self {
        self.stations = stations;
        self
    }

    /// Shares `token` with the simulation so another thread can abort it.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn default_station(&self) -> &str {
        &self.default_station
    }

    /// Display name for a site code, falling back to the code itself.
    pub fn station_name<'a>(&'a self, site_code: &'a str) -> &'a str {
        self.stations
            .iter()
            .find(|s| s.site_code == site_code)
            .map(|s| s.name.as_str())
            .unwrap_or(site_code)
    }

    /// One analysis of one station, no fallback.
    pub fn analyze(&self, station: &str, config: &AnalysisConfig) -> Result<AnalysisReport, FfaError> {
        let records = self.source.annual_peaks(station)?;
        run_analysis(station, &records, config, &self.cancel)
    }

    /// Analyzes `station`, switching to the default station when the
    /// requested one has too little data or does not exist.
    ///
    /// Retries at most `MAX_FALLBACK_RETRIES` times; if the default station
    /// fails too, that error is returned.
    pub fn analyze_with_fallback(
        &self,
        station: &str,
        config: &AnalysisConfig,
    ) -> Result<ExplorerOutcome, FfaError> {
        let mut current = station.to_string();
        let mut fallback = None;
        let mut retries = 0;

        loop {
            match self.analyze(&current, config) {
                Ok(report) => return Ok(ExplorerOutcome { report, fallback }),
                Err(e) => {
                    if !is_recoverable(&e)
                        || retries >= MAX_FALLBACK_RETRIES
                        || current == self.default_station
                    {
                        return Err(e);
                    }
                    retries += 1;
                    fallback = Some(FallbackNotice {
                        requested_station: station.to_string(),
                        used_station: self.default_station.clone(),
                        reason: e,
                    });
                    current = self.default_station.clone();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
