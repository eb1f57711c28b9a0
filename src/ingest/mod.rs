/// Readers for annual peak records that have already been downloaded.
///
/// - `peak_flow` — USGS Peak Streamflow RDB files
/// - `fixtures` (test only) — representative RDB payloads

pub mod peak_flow;

#[cfg(test)]
pub(crate) mod fixtures;
