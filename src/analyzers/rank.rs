use chrono::{DateTime, FixedOffset};

use crate::analyzers::grid::TimeGrid;
use crate::analyzers::types::{
    AggregateSiteStats, Overview, RankedSite, SizingEntry, WindowSummary,
};
use crate::reading::RawReading;

/// District shown for sites whose latest reading carries none.
pub const UNKNOWN_DISTRICT: &str = "其他";

pub const FIELD_SUM_PEAK: &str = "SUM_PEAK";
pub const FIELD_MAX_PEAK: &str = "MAX_PEAK";

/// The `n` sites with the highest cumulative peak sum.
///
/// Sites with equal sums keep their first-seen order.
pub fn top_sites(sites: &[AggregateSiteStats], n: usize) -> Vec<RankedSite> {
    let mut ranked: Vec<&AggregateSiteStats> = sites.iter().collect();
    ranked.sort_by(|a, b| b.cumulative_peak_sum.cmp(&a.cumulative_peak_sum));

    ranked
        .into_iter()
        .take(n)
        .map(|s| RankedSite {
            name: s.name.clone(),
            cumulative_peak_sum: s.cumulative_peak_sum,
            max_peak: s.max_peak,
            district: s.latest.district().unwrap_or(UNKNOWN_DISTRICT).to_string(),
            latest: s.latest.clone(),
        })
        .collect()
}

/// Every site sized by its largest single-day peak, zeros included.
pub fn sizing_dataset(sites: &[AggregateSiteStats]) -> Vec<SizingEntry> {
    sites
        .iter()
        .map(|s| SizingEntry {
            name: s.name.clone(),
            value: s.max_peak,
        })
        .collect()
}

/// Latest attributes of every site with `SUM_PEAK` and `MAX_PEAK` added,
/// busiest right now first.
pub fn full_listing(sites: &[AggregateSiteStats]) -> Vec<RawReading> {
    let mut listing: Vec<RawReading> = sites
        .iter()
        .map(|s| {
            s.latest
                .clone()
                .with_field(FIELD_SUM_PEAK, s.cumulative_peak_sum)
                .with_field(FIELD_MAX_PEAK, s.max_peak)
        })
        .collect();

    listing.sort_by(|a, b| b.occupancy().cmp(&a.occupancy()));
    listing
}

pub fn build_overview(
    summary: WindowSummary,
    grid: &TimeGrid,
    top_n: usize,
    generated_at: DateTime<FixedOffset>,
) -> Overview {
    Overview {
        generated_at,
        time_buckets: grid.labels(),
        top_sites: top_sites(&summary.sites, top_n),
        sizing: sizing_dataset(&summary.sites),
        all_sites: full_listing(&summary.sites),
        trend_series: summary.trend_series,
    }
}
