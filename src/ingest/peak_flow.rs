/// USGS Peak Streamflow Database Parser
///
/// Parses annual peak streamflow data from USGS NWIS Peak Streamflow database.
/// Format: Tab-delimited RDB (Research Data BYte-stream)
/// Source: https://nwis.waterdata.usgs.gov/{state}/nwis/peak?site_no={site}&agency_cd=USGS&format=rdb
///
/// Each row is the highest instantaneous discharge recorded during a water
/// year. The file is assumed to be already downloaded; fetching it is not
/// this module's job.

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::model::{FfaError, PeakRecord};

/// Parse USGS Peak Streamflow RDB format into annual peak records.
///
/// RDB format structure:
/// - Lines starting with '#' are comments (metadata header)
/// - First non-comment line: tab-delimited column names
/// - Second non-comment line: tab-delimited format descriptors (e.g., "5s", "10d")
/// - Remaining lines: tab-delimited data rows
///
/// Key fields:
/// - site_no: 8-digit station code
/// - peak_dt: Date (YYYY-MM-DD); month/day may be "00" for historic peaks
/// - peak_va: Peak discharge (cfs) - rows without it are skipped
/// - peak_cd: Qualification codes (comma-separated) - kept as the record flag
pub fn parse_rdb(rdb_text: &str) -> Result<Vec<PeakRecord>, FfaError> {
    // Skip comment lines (start with #)
    let mut data_lines = rdb_text
        .lines()
        .filter(|line| !line.trim().starts_with('#') && !line.trim().is_empty());

    // First non-comment line: column headers
    let header_line = data_lines
        .next()
        .ok_or_else(|| FfaError::Source("No header line found in RDB data".to_string()))?;
    let col_map: HashMap<&str, usize> = header_line
        .split('\t')
        .enumerate()
        .map(|(idx, header)| (header.trim(), idx))
        .collect();

    let site_idx = *col_map
        .get("site_no")
        .ok_or_else(|| FfaError::Source("Missing site_no column".to_string()))?;
    let date_idx = *col_map
        .get("peak_dt")
        .ok_or_else(|| FfaError::Source("Missing peak_dt column".to_string()))?;
    let value_idx = *col_map
        .get("peak_va")
        .ok_or_else(|| FfaError::Source("Missing peak_va column".to_string()))?;
    let code_idx = col_map.get("peak_cd").copied();

    // Second non-comment line: format descriptors (skip)
    data_lines
        .next()
        .ok_or_else(|| FfaError::Source("No format line found in RDB data".to_string()))?;

    let mut records = Vec::new();
    for line in data_lines {
        let fields: Vec<&str> = line.split('\t').collect();

        let site_code = fields
            .get(site_idx)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FfaError::Source(format!("Missing site_no value in row '{}'", line)))?;

        let peak_dt = fields
            .get(date_idx)
            .map(|s| s.trim())
            .ok_or_else(|| FfaError::Source(format!("Missing peak_dt value in row '{}'", line)))?;
        let (year, month, day) = parse_peak_date(peak_dt)?;

        // Stage-only years have no discharge; nothing to fit
        let peak_flow = match fields
            .get(value_idx)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            Some(s) => s
                .parse::<f64>()
                .map_err(|e| FfaError::Source(format!("Invalid peak_va '{}': {}", s, e)))?,
            None => continue,
        };

        let flag = code_idx
            .and_then(|idx| fields.get(idx))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        records.push(PeakRecord {
            station_id: site_code.to_string(),
            year,
            month,
            day,
            peak_flow,
            flag,
        });
    }

    Ok(records)
}

/// Splits a peak date into (year, month, day).
///
/// Full dates are checked with chrono. Historic peaks often only know the
/// year (`1844-00-00`) or month (`1904-03-00`); unknown parts come back as 0.
fn parse_peak_date(peak_dt: &str) -> Result<(i32, u32, u32), FfaError> {
    if let Ok(date) = NaiveDate::parse_from_str(peak_dt, "%Y-%m-%d") {
        return Ok((date.year(), date.month(), date.day()));
    }

    let invalid = || FfaError::Source(format!("Invalid peak_dt '{}'", peak_dt));
    let mut parts = peak_dt.split('-');
    let year: i32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
    let month: u32 = parts.next().map_or(Ok(0), |s| s.parse().map_err(|_| invalid()))?;
    let day: u32 = parts.next().map_or(Ok(0), |s| s.parse().map_err(|_| invalid()))?;

    // a partial date must actually be partial
    if month > 12 || day > 31 || (month != 0 && day != 0) {
        return Err(invalid());
    }
    Ok((year, month, day))
}

/// Keeps one peak per (station, year) - the largest - ordered by station then year.
///
/// Water years occasionally carry two rows (e.g. a revised peak). Equal
/// peaks keep the first row encountered.
pub fn annual_maxima(records: &[PeakRecord]) -> Vec<PeakRecord> {
    let mut by_year: BTreeMap<(String, i32), PeakRecord> = BTreeMap::new();

    for record in records {
        let key = (record.station_id.clone(), record.year);
        match by_year.get(&key) {
            Some(existing) if existing.peak_flow >= record.peak_flow => {}
            _ => {
                by_year.insert(key, record.clone());
            }
        }
    }

    by_year.into_values().collect()
}

/// Drops peaks that cannot be log-transformed (zero, negative, NaN, inf).
pub fn valid_peaks(records: &[PeakRecord]) -> Vec<PeakRecord> {
    records.iter().filter(|r| r.is_valid()).cloned().collect()
}
