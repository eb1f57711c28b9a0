/// Peak record access for the analysis layer.
///
/// The analysis only needs "give me the annual peaks for station X". The
/// `PeakRecordSource` trait is that seam; `InMemoryPeakStore` is the
/// implementation used by the CLI, filled from the RDB files listed in
/// ffa.toml.

use std::collections::HashMap;
use std::fs;

use crate::config::ExplorerConfig;
use crate::ingest::peak_flow::parse_rdb;
use crate::model::{FfaError, PeakRecord};

/// Anything that can hand over a station's annual peak records.
pub trait PeakRecordSource {
    /// Records for `station_id`, ordered by year.
    fn annual_peaks(&self, station_id: &str) -> Result<Vec<PeakRecord>, FfaError>;
}

/// Peak records held in memory, keyed by station.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPeakStore {
    by_station: HashMap<String, Vec<PeakRecord>>,
}

impl InMemoryPeakStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds records, grouping them by their station id.
    pub fn insert(&mut self, records: Vec<PeakRecord>) {
        for record in records {
            self.by_station
                .entry(record.station_id.clone())
                .or_default()
                .push(record);
        }
        for records in self.by_station.values_mut() {
            records.sort_by_key(|r| (r.year, r.month, r.day));
        }
    }

    /// Parses RDB text and adds every row.
    pub fn insert_rdb(&mut self, rdb_text: &str) -> Result<usize, FfaError> {
        let records = parse_rdb(rdb_text)?;
        let count = records.len();
        self.insert(records);
        Ok(count)
    }

    /// Builds a store from every `[[station]]` peak file in the config.
    pub fn from_config(config: &ExplorerConfig) -> Result<Self, FfaError> {
        let mut store = Self::new();
        for station in &config.stations {
            let text = fs::read_to_string(&station.peak_file).map_err(|e| {
                FfaError::Source(format!("{} ({}): {}", station.peak_file, station.site_code, e))
            })?;
            store.insert_rdb(&text)?;
        }
        Ok(store)
    }

    pub fn station_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.by_station.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl PeakRecordSource for InMemoryPeakStore {
    fn annual_peaks(&self, station_id: &str) -> Result<Vec<PeakRecord>, FfaError> {
        self.by_station
            .get(station_id)
            .cloned()
            .ok_or_else(|| FfaError::StationNotFound(station_id.to_string()))
    }
}
