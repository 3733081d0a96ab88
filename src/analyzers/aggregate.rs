use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::analyzers::grid::TimeGrid;
use crate::analyzers::normalize::normalize_day;
use crate::analyzers::replay::replay_day;
use crate::analyzers::types::{AggregateSiteStats, DayReplay, TrendLine, WindowSummary};
use crate::error::OverviewError;
use crate::reading::RawReading;

/// Accumulates per-day replays into window-wide site statistics.
///
/// Days must be added oldest first. Each day is replayed into local values
/// and only then merged, so a rejected day leaves the aggregate untouched.
pub struct WindowAggregator<'g> {
    grid: &'g TimeGrid,
    last_day: Option<NaiveDate>,
    trend_series: Vec<TrendLine>,
    sites: Vec<AggregateSiteStats>,
    index: HashMap<String, usize>,
}

impl<'g> WindowAggregator<'g> {
    pub fn new(grid: &'g TimeGrid) -> Self {
        Self {
            grid,
            last_day: None,
            trend_series: Vec::new(),
            sites: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Normalizes, replays and merges one calendar day.
    pub fn add_day(
        &mut self,
        day: NaiveDate,
        readings: &[RawReading],
    ) -> Result<(), OverviewError> {
        if let Some(previous) = self.last_day {
            if day <= previous {
                return Err(OverviewError::DayOutOfOrder { day, previous });
            }
        }

        let events = normalize_day(readings, day);
        debug!(
            day = %day,
            readings = readings.len(),
            events = events.len(),
            "Replaying day"
        );

        let replay = replay_day(events, day, self.grid);
        self.merge(replay);
        Ok(())
    }

    fn merge(&mut self, replay: DayReplay) {
        self.trend_series.push(TrendLine {
            label: replay.day.format("%m-%d").to_string(),
            values: replay.trend,
        });

        for site in replay.sites {
            match self.index.get(&site.site_id) {
                Some(&i) => {
                    let stats = &mut self.sites[i];
                    stats.cumulative_peak_sum =
                        stats.cumulative_peak_sum.saturating_add(site.peak);
                    stats.max_peak = stats.max_peak.max(site.peak);
                    stats.latest = site.latest;
                }
                None => {
                    self.index.insert(site.site_id.clone(), self.sites.len());
                    self.sites.push(AggregateSiteStats {
                        name: site.site_id,
                        cumulative_peak_sum: site.peak,
                        max_peak: site.peak,
                        latest: site.latest,
                    });
                }
            }
        }

        self.last_day = Some(replay.day);
    }

    pub fn finish(self) -> WindowSummary {
        WindowSummary {
            trend_series: self.trend_series,
            sites: self.sites,
        }
    }
}

/// Aggregates an ordered map of days, oldest to newest.
pub fn aggregate_window(
    days: &BTreeMap<NaiveDate, Vec<RawReading>>,
    grid: &TimeGrid,
) -> Result<WindowSummary, OverviewError> {
    let mut aggregator = WindowAggregator::new(grid);
    for (day, readings) in days {
        aggregator.add_day(*day, readings)?;
    }
    Ok(aggregator.finish())
}
