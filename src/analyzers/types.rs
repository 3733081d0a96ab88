//! Data types used by the aggregation pipeline.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::reading::RawReading;

/// A reading with a fully qualified timestamp, ready for replay.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub site_id: String,
    pub timestamp: NaiveDateTime,
    pub occupancy: u64,
    pub attributes: RawReading,
}

/// Per-site state at the end of one day's replay.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySite {
    pub site_id: String,
    /// Occupancy of the last applied event.
    pub current: u64,
    pub peak: u64,
    /// Attributes of the last applied event.
    pub latest: RawReading,
}

/// Result of replaying one calendar day across the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReplay {
    pub day: NaiveDate,
    /// City-wide total at each grid point.
    pub trend: Vec<u64>,
    /// Sites in the order their first event was applied.
    pub sites: Vec<DaySite>,
}

impl DayReplay {
    pub fn peak(&self, site_id: &str) -> Option<u64> {
        self.sites
            .iter()
            .find(|s| s.site_id == site_id)
            .map(|s| s.peak)
    }
}

/// One day's total-occupancy line.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendLine {
    pub label: String,
    pub values: Vec<u64>,
}

// Shaped as a chart series for the front-end.
impl Serialize for TrendLine {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TrendLine", 4)?;
        s.serialize_field("name", &self.label)?;
        s.serialize_field("type", "line")?;
        s.serialize_field("smooth", &true)?;
        s.serialize_field("data", &self.values)?;
        s.end()
    }
}

/// Statistics for a single site across the whole window.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSiteStats {
    pub name: String,
    /// Sum of each day's peak.
    pub cumulative_peak_sum: u64,
    /// Largest single-day peak.
    pub max_peak: u64,
    pub latest: RawReading,
}

/// Everything the aggregator accumulated over the window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub trend_series: Vec<TrendLine>,
    /// Sites in first-seen order.
    pub sites: Vec<AggregateSiteStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSite {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "SUM_PEAK")]
    pub cumulative_peak_sum: u64,
    #[serde(rename = "MAX_PEAK")]
    pub max_peak: u64,
    #[serde(rename = "DISTRICT")]
    pub district: String,
    #[serde(rename = "LATEST")]
    pub latest: RawReading,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingEntry {
    pub name: String,
    pub value: u64,
}

/// City-wide overview, written as `overview.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub generated_at: DateTime<FixedOffset>,
    pub time_buckets: Vec<String>,
    pub trend_series: Vec<TrendLine>,
    #[serde(rename = "top_10")]
    pub top_sites: Vec<RankedSite>,
    #[serde(rename = "treemap_data")]
    pub sizing: Vec<SizingEntry>,
    #[serde(rename = "all_spots")]
    pub all_sites: Vec<RawReading>,
}

/// Deduplicated history of one site, written as `spots/<name>.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteDetail {
    pub name: String,
    pub data: Vec<RawReading>,
}
