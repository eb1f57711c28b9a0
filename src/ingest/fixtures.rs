/// Test fixtures: USGS peak-streamflow RDB payloads, cfg(test) gated.
///
/// RDB shape:
///   # comment header (site list, field descriptions)
///   column names      (agency_cd, site_no, peak_dt, peak_tm, peak_va, peak_cd, ...)
///   format line       (5s, 15s, 10d, ...)
///   one tab-delimited row per water year
///
/// Empty trailing columns (gage_ht etc.) are left in place, as USGS does.

/// Kingston Mines (05568500), 40 water years 1980-2019 with a handful of
/// qualification codes. Shared with the sample data shipped in `data/`.
#[cfg(test)]
pub(crate) fn fixture_kingston_mines_rdb() -> &'static str {
    include_str!("../../data/05568500.rdb")
}

/// Historic peaks with year-only and month-only dates.
#[cfg(test)]
pub(crate) fn fixture_partial_dates_rdb() -> &'static str {
    "# historic peaks\n\
     agency_cd\tsite_no\tpeak_dt\tpeak_tm\tpeak_va\tpeak_cd\n\
     5s\t15s\t10d\t6s\t8s\t33s\n\
     USGS\t05568500\t1844-00-00\t\t123000\t7\n\
     USGS\t05568500\t1904-03-00\t\t88000\t\n\
     USGS\t05568500\t1922-04-19\t\t71200\t\n"
}

/// Minimal valid record: two years, 100 and 50 cfs.
#[cfg(test)]
pub(crate) fn fixture_two_year_rdb() -> &'static str {
    "agency_cd\tsite_no\tpeak_dt\tpeak_va\n\
     5s\t15s\t10d\t8s\n\
     USGS\t05570000\t2000-04-02\t100\n\
     USGS\t05570000\t2001-05-14\t50\n"
}
